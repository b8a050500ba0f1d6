//! Hex color normalization.

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::LazyLock;

/// Exactly six hex digits after a leading `#`.
static HEX_COLOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

/// Normalize a hex color to lowercase `#rrggbb`.
///
/// Surrounding whitespace is stripped and a missing `#` is added. Empty,
/// whitespace-only and malformed input is rejected.
pub fn normalize_hex(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("invalid hex color: empty string"));
    }

    let candidate = if trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("#{}", trimmed)
    };

    if !HEX_COLOR_REGEX.is_match(&candidate) {
        return Err(Error::validation(format!("invalid hex color: {:?}", input)));
    }

    Ok(candidate.to_lowercase())
}

/// An RGB color stored as normalized `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Color {
    #[serde(deserialize_with = "deserialize_hex")]
    pub hex: String,
}

impl Color {
    /// Create a color from any accepted hex spelling.
    pub fn new(hex: &str) -> Result<Self> {
        Ok(Self {
            hex: normalize_hex(hex)?,
        })
    }

    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        Self {
            hex: format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]),
        }
    }

    /// The red, green and blue components.
    pub fn rgb(&self) -> [u8; 3] {
        let channel = |start: usize| {
            self.hex
                .get(start..start + 2)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .unwrap_or(0)
        };
        [channel(1), channel(3), channel(5)]
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let normalized = normalize_hex(&self.hex)?;
        if normalized != self.hex {
            return Err(Error::validation(format!(
                "hex color {:?} is not normalized",
                self.hex
            )));
        }
        Ok(())
    }
}

fn deserialize_hex<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    normalize_hex(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hex() {
        assert!(normalize_hex("").is_err());
        assert!(normalize_hex("   ").is_err());
        assert!(normalize_hex("xyz").is_err());
        assert!(normalize_hex("#12345").is_err());
        assert!(normalize_hex("#1234567").is_err());
        assert_eq!(normalize_hex("abc123").unwrap(), "#abc123");
        assert_eq!(normalize_hex("#ABC123").unwrap(), "#abc123");
        assert_eq!(normalize_hex("  #00ff7F ").unwrap(), "#00ff7f");
    }

    #[test]
    fn test_color_rgb() {
        let color = Color::from_rgb([255, 128, 0]);
        assert_eq!(color.hex, "#ff8000");
        assert_eq!(color.rgb(), [255, 128, 0]);
        assert_eq!(Color::new("0A0B0C").unwrap().rgb(), [10, 11, 12]);
    }

    #[test]
    fn test_color_json_is_normalized() {
        let color: Color = serde_json::from_str(r#"{"hex": "FFAA00"}"#).unwrap();
        assert_eq!(color.hex, "#ffaa00");

        assert!(serde_json::from_str::<Color>(r#"{"hex": ""}"#).is_err());
        assert!(serde_json::from_str::<Color>(r##"{"hex": "#ffaa00", "alpha": 1}"##).is_err());
    }
}
