//! Shapes on a slide, as a tagged union over the supported kinds.

use crate::chart::ChartModel;
use crate::engine::{EngineShape, EngineSlide, Geometry};
use crate::enums::ShapeKind;
use crate::json::{check_finite, check_non_negative, check_range, JsonModel};
use crate::report::ApplyReport;
use crate::table::TableModel;
use crate::text::TextFrameModel;
use crate::units::{emu_to_pt, pt_to_emu};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Name, position, size and rotation shared by every concrete shape.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Placement {
    pub name: Option<String>,
    pub left_pt: f64,
    pub top_pt: f64,
    pub width_pt: f64,
    pub height_pt: f64,
    pub rotation: Option<f64>,
}

impl Placement {
    /// Read the placement of a live shape. Unreadable geometry becomes zero.
    pub fn read(shape: &dyn EngineShape) -> Self {
        let geometry = shape.geometry().unwrap_or_default();
        let rotation = shape
            .rotation()
            .ok()
            .filter(|degrees| (-360.0..=360.0).contains(degrees))
            .unwrap_or(0.0);

        Self {
            name: shape.name(),
            left_pt: emu_to_pt(geometry.left),
            top_pt: emu_to_pt(geometry.top),
            width_pt: emu_to_pt(geometry.width.max(0)),
            height_pt: emu_to_pt(geometry.height.max(0)),
            rotation: Some(rotation),
        }
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            left: pt_to_emu(self.left_pt),
            top: pt_to_emu(self.top_pt),
            width: pt_to_emu(self.width_pt),
            height: pt_to_emu(self.height_pt),
        }
    }
}

/// Set the name and rotation of a freshly created shape.
pub(crate) fn finish_shape(
    shape: &mut dyn EngineShape,
    placement: &Placement,
    report: &mut ApplyReport,
) {
    if let Some(name) = placement.name.as_deref().filter(|n| !n.is_empty()) {
        report.record("name", shape.set_name(name));
    }
    if let Some(degrees) = placement.rotation.filter(|d| *d != 0.0) {
        report.record("rotation", shape.set_rotation(degrees));
    }
}

pub(crate) fn validate_placement(
    left_pt: f64,
    top_pt: f64,
    width_pt: f64,
    height_pt: f64,
    rotation: Option<f64>,
) -> Result<()> {
    check_finite("left_pt", left_pt)?;
    check_finite("top_pt", top_pt)?;
    check_non_negative("width_pt", width_pt)?;
    check_non_negative("height_pt", height_pt)?;
    if let Some(degrees) = rotation {
        check_range("rotation", degrees, -360.0, 360.0)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextBoxModel {
    pub name: Option<String>,
    pub left_pt: f64,
    pub top_pt: f64,
    pub width_pt: f64,
    pub height_pt: f64,
    pub rotation: Option<f64>,
    #[serde(default)]
    pub text_frame: TextFrameModel,
}

impl TextBoxModel {
    pub(crate) fn placement(&self) -> Placement {
        Placement {
            name: self.name.clone(),
            left_pt: self.left_pt,
            top_pt: self.top_pt,
            width_pt: self.width_pt,
            height_pt: self.height_pt,
            rotation: self.rotation,
        }
    }

    pub fn apply_to_slide(&self, slide: &mut dyn EngineSlide) -> Result<ApplyReport> {
        let mut report = ApplyReport::new();
        let placement = self.placement();
        let shape = slide.add_text_box(placement.geometry())?;

        finish_shape(shape, &placement, &mut report);
        if let Some(frame) = shape.text_frame_mut() {
            report.absorb("text_frame", self.text_frame.apply_to(frame));
        }
        Ok(report)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PictureModel {
    pub name: Option<String>,
    pub left_pt: f64,
    pub top_pt: f64,
    pub width_pt: f64,
    pub height_pt: f64,
    pub rotation: Option<f64>,
    /// Image file to embed. Unknown for pictures read from a document.
    pub image_path: Option<String>,
}

impl PictureModel {
    pub(crate) fn placement(&self) -> Placement {
        Placement {
            name: self.name.clone(),
            left_pt: self.left_pt,
            top_pt: self.top_pt,
            width_pt: self.width_pt,
            height_pt: self.height_pt,
            rotation: self.rotation,
        }
    }

    /// Embed the picture. Without an image path there is nothing to embed.
    pub fn apply_to_slide(&self, slide: &mut dyn EngineSlide) -> Result<ApplyReport> {
        let mut report = ApplyReport::new();
        let Some(path) = self.image_path.as_deref().filter(|p| !p.is_empty()) else {
            log::debug!("Skipping picture {:?} without image path", self.name);
            return Ok(report);
        };

        let placement = self.placement();
        let shape = slide.add_picture(path, placement.geometry())?;
        finish_shape(shape, &placement, &mut report);
        Ok(report)
    }
}

/// A shape the model does not describe beyond its placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnknownShapeModel {
    pub name: Option<String>,
    pub left_pt: f64,
    pub top_pt: f64,
    pub width_pt: f64,
    pub height_pt: f64,
    pub rotation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeModel {
    TextBox(TextBoxModel),
    Picture(PictureModel),
    Table(TableModel),
    Chart(ChartModel),
    Unknown(UnknownShapeModel),
}

impl ShapeModel {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::TextBox(_) => ShapeKind::TextBox,
            Self::Picture(_) => ShapeKind::Picture,
            Self::Table(_) => ShapeKind::Table,
            Self::Chart(_) => ShapeKind::Chart,
            Self::Unknown(_) => ShapeKind::Unknown,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::TextBox(m) => m.name.as_deref(),
            Self::Picture(m) => m.name.as_deref(),
            Self::Table(m) => m.name.as_deref(),
            Self::Chart(m) => m.name.as_deref(),
            Self::Unknown(m) => m.name.as_deref(),
        }
    }

    pub fn as_chart(&self) -> Option<&ChartModel> {
        match self {
            Self::Chart(chart) => Some(chart),
            _ => None,
        }
    }

    /// Snapshot a live shape.
    ///
    /// Kinds are tried in order: text frame, chart, table, picture. Anything
    /// else is kept as [`ShapeModel::Unknown`] with its placement.
    pub fn from_engine(shape: &dyn EngineShape) -> Self {
        if let Some(frame) = shape.text_frame() {
            let placement = Placement::read(shape);
            return Self::TextBox(TextBoxModel {
                name: placement.name,
                left_pt: placement.left_pt,
                top_pt: placement.top_pt,
                width_pt: placement.width_pt,
                height_pt: placement.height_pt,
                rotation: placement.rotation,
                text_frame: TextFrameModel::from_engine(frame),
            });
        }
        if let Some(chart) = shape.chart() {
            return Self::Chart(ChartModel::from_engine(shape, chart));
        }
        if let Some(table) = shape.table() {
            return Self::Table(TableModel::from_engine(shape, table));
        }

        let placement = Placement::read(shape);
        if shape.is_picture() {
            return Self::Picture(PictureModel {
                name: placement.name,
                left_pt: placement.left_pt,
                top_pt: placement.top_pt,
                width_pt: placement.width_pt,
                height_pt: placement.height_pt,
                rotation: placement.rotation,
                image_path: None,
            });
        }
        Self::Unknown(UnknownShapeModel {
            name: placement.name,
            left_pt: placement.left_pt,
            top_pt: placement.top_pt,
            width_pt: placement.width_pt,
            height_pt: placement.height_pt,
            rotation: placement.rotation,
        })
    }

    /// Create this shape on `slide`.
    ///
    /// Fails only when the engine refuses to create the shape itself; every
    /// property written afterwards is best-effort and lands in the report.
    pub fn apply_to_slide(&self, slide: &mut dyn EngineSlide) -> Result<ApplyReport> {
        match self {
            Self::TextBox(model) => model.apply_to_slide(slide),
            Self::Picture(model) => model.apply_to_slide(slide),
            Self::Table(model) => model.apply_to_slide(slide),
            Self::Chart(model) => Ok(model.apply_to_slide(slide)),
            Self::Unknown(model) => {
                log::debug!("Skipping unknown shape {:?}", model.name);
                Ok(ApplyReport::new())
            }
        }
    }
}

impl JsonModel for ShapeModel {
    fn validate(&self) -> Result<()> {
        match self {
            Self::TextBox(m) => {
                validate_placement(m.left_pt, m.top_pt, m.width_pt, m.height_pt, m.rotation)?;
                m.text_frame.validate()
            }
            Self::Picture(m) => {
                validate_placement(m.left_pt, m.top_pt, m.width_pt, m.height_pt, m.rotation)
            }
            Self::Table(m) => m.validate(),
            Self::Chart(m) => m.validate(),
            Self::Unknown(m) => {
                validate_placement(m.left_pt, m.top_pt, m.width_pt, m.height_pt, m.rotation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{MemoryShape, MemorySlide, ShapeContent};

    fn text_box(json: &str) -> ShapeModel {
        ShapeModel::from_json(json).unwrap()
    }

    #[test]
    fn test_tagged_json() {
        let shape = text_box(
            r#"{"type": "text_box", "name": "Title", "left_pt": 10, "top_pt": 20,
                "width_pt": 300, "height_pt": 40}"#,
        );
        assert_eq!(shape.kind(), ShapeKind::TextBox);
        assert_eq!(shape.name(), Some("Title"));

        let json = shape.to_json().unwrap();
        assert!(json.starts_with(r#"{"type":"text_box""#));
        assert_eq!(ShapeModel::from_json(&json).unwrap(), shape);
    }

    #[test]
    fn test_rejects_unknown_tag_and_fields() {
        let base = r#""left_pt": 0, "top_pt": 0, "width_pt": 1, "height_pt": 1"#;
        assert!(ShapeModel::from_json(&format!(r#"{{"type": "video", {}}}"#, base)).is_err());
        assert!(ShapeModel::from_json(&format!(r#"{{{}}}"#, base)).is_err());
        assert!(
            ShapeModel::from_json(&format!(r#"{{"type": "picture", "alt": "x", {}}}"#, base))
                .is_err()
        );
        assert!(ShapeModel::from_json(&format!(r#"{{"type": "unknown", {}}}"#, base)).is_ok());
    }

    #[test]
    fn test_rejects_bad_geometry() {
        assert!(ShapeModel::from_json(
            r#"{"type": "unknown", "left_pt": 0, "top_pt": 0, "width_pt": -1, "height_pt": 1}"#
        )
        .is_err());
        assert!(ShapeModel::from_json(
            r#"{"type": "unknown", "left_pt": 0, "top_pt": 0, "width_pt": 1, "height_pt": 1,
                "rotation": 400}"#
        )
        .is_err());
        assert!(ShapeModel::from_json(r#"{"type": "unknown", "left_pt": 0}"#).is_err());
    }

    #[test]
    fn test_text_box_build_and_extract() {
        let shape = text_box(
            r#"{"type": "text_box", "name": "Body", "left_pt": 36, "top_pt": 72,
                "width_pt": 400, "height_pt": 100, "rotation": 15,
                "text_frame": {"paragraphs": [{"runs": [{"text": "Hello"}]}]}}"#,
        );
        let mut slide = MemorySlide::default();
        let report = shape.apply_to_slide(&mut slide).unwrap();
        assert!(report.is_clean(), "{:?}", report.failures);

        let ShapeModel::TextBox(extracted) = ShapeModel::from_engine(&slide.shapes[0]) else {
            panic!("expected a text box");
        };
        assert_eq!(extracted.name.as_deref(), Some("Body"));
        assert_eq!(extracted.left_pt, 36.0);
        assert_eq!(extracted.width_pt, 400.0);
        assert_eq!(extracted.rotation, Some(15.0));
        assert_eq!(extracted.text_frame.text(), "Hello");
    }

    #[test]
    fn test_picture_without_path_is_skipped() {
        let picture = text_box(
            r#"{"type": "picture", "left_pt": 0, "top_pt": 0, "width_pt": 50, "height_pt": 50}"#,
        );
        let mut slide = MemorySlide::default();
        picture.apply_to_slide(&mut slide).unwrap();
        assert!(slide.shapes.is_empty());

        let picture = text_box(
            r#"{"type": "picture", "name": "Logo", "left_pt": 0, "top_pt": 0,
                "width_pt": 50, "height_pt": 50, "image_path": "logo.png"}"#,
        );
        picture.apply_to_slide(&mut slide).unwrap();
        assert!(matches!(
            &slide.shapes[0].content,
            ShapeContent::Picture { image_path } if image_path == "logo.png"
        ));

        let extracted = ShapeModel::from_engine(&slide.shapes[0]);
        assert_eq!(extracted.kind(), ShapeKind::Picture);
        assert_eq!(extracted.name(), Some("Logo"));
    }

    #[test]
    fn test_unrecognized_shape_is_unknown() {
        let shape = MemoryShape::new(
            Some("Connector 4".into()),
            Geometry {
                left: 0,
                top: 0,
                width: 12_700,
                height: 25_400,
            },
            ShapeContent::Other,
        );
        let model = ShapeModel::from_engine(&shape);
        assert_eq!(model.kind(), ShapeKind::Unknown);
        assert_eq!(model.name(), Some("Connector 4"));

        let mut slide = MemorySlide::default();
        assert!(model.apply_to_slide(&mut slide).unwrap().applied.is_empty());
        assert!(slide.shapes.is_empty());
    }
}
