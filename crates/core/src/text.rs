//! Text frames, paragraphs, runs and fonts.

use crate::color::Color;
use crate::engine::{
    EngineError, EngineFont, EngineParagraph, EngineRun, EngineTextFrame, LineSpacing,
    MarginSide,
};
use crate::enums::{
    from_alignment, from_auto_size, from_underline, from_vertical_anchor, to_alignment,
    to_auto_size, to_underline, to_vertical_anchor, AutoSize, ParagraphAlignment, Underline,
    VerticalAnchor,
};
use crate::json::{check_non_negative, check_optional_range, within, JsonModel};
use crate::report::ApplyReport;
use crate::units::{emu_to_pt, pt_to_emu};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default inset of a text frame, 0.1 inch.
pub const DEFAULT_MARGIN_PT: f64 = 7.2;

pub const MAX_LEVEL: u8 = 8;

fn default_margin() -> f64 {
    DEFAULT_MARGIN_PT
}

/// Character formatting. `None` fields inherit from the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontModel {
    pub name: Option<String>,
    pub size_pt: Option<f64>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<Underline>,
    pub color: Option<Color>,
}

impl FontModel {
    /// True when every property is inherited.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn from_engine(font: &dyn EngineFont) -> Self {
        Self {
            name: font.name().ok().flatten(),
            size_pt: font
                .size()
                .ok()
                .flatten()
                .and_then(|size| within(emu_to_pt(size), 1.0, 512.0)),
            bold: font.bold().ok().flatten(),
            italic: font.italic().ok().flatten(),
            underline: to_underline(font.underline().ok().flatten()),
            color: font.color_rgb().ok().flatten().map(Color::from_rgb),
        }
    }

    pub fn apply_to(&self, font: &mut dyn EngineFont) -> ApplyReport {
        let mut report = ApplyReport::new();

        if let Some(name) = &self.name {
            report.record("name", font.set_name(name));
        }
        if let Some(size) = self.size_pt {
            report.record("size_pt", font.set_size(pt_to_emu(size)));
        }
        if let Some(bold) = self.bold {
            report.record("bold", font.set_bold(bold));
        }
        if let Some(italic) = self.italic {
            report.record("italic", font.set_italic(italic));
        }
        if self.underline.is_some() {
            report.record("underline", font.set_underline(from_underline(self.underline)));
        }
        if let Some(color) = &self.color {
            report.record("color", font.set_color_rgb(color.rgb()));
        }

        report
    }
}

impl JsonModel for FontModel {
    fn validate(&self) -> Result<()> {
        check_optional_range("size_pt", self.size_pt, 1.0, 512.0)?;
        if let Some(color) = &self.color {
            color.validate()?;
        }
        Ok(())
    }
}

/// A span of text sharing one font.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunModel {
    #[serde(default)]
    pub text: String,
    pub font: Option<FontModel>,
    /// Click-through URL.
    pub hyperlink: Option<String>,
}

impl RunModel {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn from_engine(run: &dyn EngineRun) -> Self {
        let font = FontModel::from_engine(run.font());
        Self {
            text: run.text(),
            font: (!font.is_empty()).then_some(font),
            hyperlink: run.hyperlink().ok().flatten(),
        }
    }

    pub fn apply_to(&self, run: &mut dyn EngineRun) -> ApplyReport {
        let mut report = ApplyReport::new();
        report.record("text", run.set_text(&self.text));
        if let Some(font) = &self.font {
            report.absorb("font", font.apply_to(run.font_mut()));
        }
        if let Some(address) = self.hyperlink.as_deref().filter(|a| !a.is_empty()) {
            report.record("hyperlink", run.set_hyperlink(address));
        }
        report
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParagraphModel {
    #[serde(default)]
    pub runs: Vec<RunModel>,
    pub alignment: Option<ParagraphAlignment>,
    /// Outline level, 0 to 8.
    #[serde(default)]
    pub level: u8,
    /// Multiple of single line spacing, 0.5 to 10.
    pub line_spacing: Option<f64>,
    pub space_before_pt: Option<f64>,
    pub space_after_pt: Option<f64>,
}

impl ParagraphModel {
    /// A paragraph holding one unformatted run.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            runs: vec![RunModel::new(text)],
            ..Self::default()
        }
    }

    /// Concatenated text of every run.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn from_engine(paragraph: &dyn EngineParagraph) -> Self {
        let runs = (0..paragraph.run_count())
            .filter_map(|i| paragraph.run(i))
            .map(RunModel::from_engine)
            .collect();

        let line_spacing = match paragraph.line_spacing() {
            Ok(Some(LineSpacing::Lines(lines))) => within(lines, 0.5, 10.0),
            _ => None,
        };
        let spacing = |value: Option<i64>| value.and_then(|emu| within(emu_to_pt(emu), 0.0, 240.0));

        Self {
            runs,
            alignment: to_alignment(paragraph.alignment().ok().flatten()),
            level: paragraph
                .level()
                .ok()
                .filter(|level| *level <= MAX_LEVEL)
                .unwrap_or(0),
            line_spacing,
            space_before_pt: spacing(paragraph.space_before().ok().flatten()),
            space_after_pt: spacing(paragraph.space_after().ok().flatten()),
        }
    }

    /// Rebuild the runs of `paragraph` and set its properties.
    pub fn apply_to(&self, paragraph: &mut dyn EngineParagraph) -> ApplyReport {
        let mut report = ApplyReport::new();
        report.record("clear", paragraph.clear());

        for (i, run) in self.runs.iter().enumerate() {
            let field = format!("runs[{}]", i);
            match paragraph.add_run() {
                Ok(target) => report.absorb(&field, run.apply_to(target)),
                Err(e) => report.fail(&field, &e),
            }
        }

        report.record(
            "alignment",
            paragraph.set_alignment(from_alignment(self.alignment)),
        );
        report.record("level", paragraph.set_level(self.level));
        if let Some(lines) = self.line_spacing {
            report.record(
                "line_spacing",
                paragraph.set_line_spacing(LineSpacing::Lines(lines)),
            );
        }
        if let Some(pt) = self.space_before_pt {
            report.record("space_before_pt", paragraph.set_space_before(pt_to_emu(pt)));
        }
        if let Some(pt) = self.space_after_pt {
            report.record("space_after_pt", paragraph.set_space_after(pt_to_emu(pt)));
        }

        report
    }
}

impl JsonModel for ParagraphModel {
    fn validate(&self) -> Result<()> {
        if self.level > MAX_LEVEL {
            return Err(Error::validation(format!(
                "level must be between 0 and {}, got {}",
                MAX_LEVEL, self.level
            )));
        }
        check_optional_range("line_spacing", self.line_spacing, 0.5, 10.0)?;
        check_optional_range("space_before_pt", self.space_before_pt, 0.0, 240.0)?;
        check_optional_range("space_after_pt", self.space_after_pt, 0.0, 240.0)?;
        for font in self.runs.iter().filter_map(|r| r.font.as_ref()) {
            font.validate()?;
        }
        Ok(())
    }
}

/// The text body of a shape or table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextFrameModel {
    #[serde(default)]
    pub paragraphs: Vec<ParagraphModel>,
    pub auto_size: Option<AutoSize>,
    pub vertical_anchor: Option<VerticalAnchor>,
    #[serde(default = "default_margin")]
    pub margin_left_pt: f64,
    #[serde(default = "default_margin")]
    pub margin_right_pt: f64,
    #[serde(default = "default_margin")]
    pub margin_top_pt: f64,
    #[serde(default = "default_margin")]
    pub margin_bottom_pt: f64,
    pub word_wrap: Option<bool>,
}

impl Default for TextFrameModel {
    fn default() -> Self {
        Self {
            paragraphs: Vec::new(),
            auto_size: None,
            vertical_anchor: None,
            margin_left_pt: DEFAULT_MARGIN_PT,
            margin_right_pt: DEFAULT_MARGIN_PT,
            margin_top_pt: DEFAULT_MARGIN_PT,
            margin_bottom_pt: DEFAULT_MARGIN_PT,
            word_wrap: None,
        }
    }
}

impl TextFrameModel {
    /// One unformatted paragraph per line of `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            paragraphs: text.split('\n').map(ParagraphModel::from_text).collect(),
            ..Self::default()
        }
    }

    /// Paragraph texts joined with newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(ParagraphModel::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn from_engine(frame: &dyn EngineTextFrame) -> Self {
        let paragraphs = (0..frame.paragraph_count())
            .filter_map(|i| frame.paragraph(i))
            .map(ParagraphModel::from_engine)
            .collect();

        let margin = |side: MarginSide| {
            frame
                .margin(side)
                .ok()
                .flatten()
                .map(emu_to_pt)
                .filter(|pt| *pt >= 0.0)
                .unwrap_or(DEFAULT_MARGIN_PT)
        };

        Self {
            paragraphs,
            auto_size: to_auto_size(frame.auto_size().ok().flatten()),
            vertical_anchor: to_vertical_anchor(frame.vertical_anchor().ok().flatten()),
            margin_left_pt: margin(MarginSide::Left),
            margin_right_pt: margin(MarginSide::Right),
            margin_top_pt: margin(MarginSide::Top),
            margin_bottom_pt: margin(MarginSide::Bottom),
            word_wrap: frame.word_wrap().ok().flatten(),
        }
    }

    /// Write paragraphs and frame properties into `frame`.
    ///
    /// The frame's first paragraph is reused and cleared; every following
    /// paragraph is appended.
    pub fn apply_to(&self, frame: &mut dyn EngineTextFrame) -> ApplyReport {
        let mut report = ApplyReport::new();

        for (i, paragraph) in self.paragraphs.iter().enumerate() {
            let field = format!("paragraphs[{}]", i);
            let target = if i == 0 && frame.paragraph_count() > 0 {
                frame
                    .paragraph_mut(0)
                    .ok_or_else(|| EngineError::Failed("first paragraph vanished".into()))
            } else {
                frame.add_paragraph()
            };
            match target {
                Ok(target) => report.absorb(&field, paragraph.apply_to(target)),
                Err(e) => report.fail(&field, &e),
            }
        }
        if self.paragraphs.is_empty() {
            if let Some(first) = frame.paragraph_mut(0) {
                report.record("paragraphs[0].clear", first.clear());
            }
        }

        report.record("auto_size", frame.set_auto_size(from_auto_size(self.auto_size)));
        report.record(
            "vertical_anchor",
            frame.set_vertical_anchor(from_vertical_anchor(self.vertical_anchor)),
        );
        for (field, side, pt) in [
            ("margin_left_pt", MarginSide::Left, self.margin_left_pt),
            ("margin_right_pt", MarginSide::Right, self.margin_right_pt),
            ("margin_top_pt", MarginSide::Top, self.margin_top_pt),
            ("margin_bottom_pt", MarginSide::Bottom, self.margin_bottom_pt),
        ] {
            report.record(field, frame.set_margin(side, pt_to_emu(pt)));
        }
        if let Some(wrap) = self.word_wrap {
            report.record("word_wrap", frame.set_word_wrap(wrap));
        }

        report
    }
}

impl JsonModel for TextFrameModel {
    fn validate(&self) -> Result<()> {
        check_non_negative("margin_left_pt", self.margin_left_pt)?;
        check_non_negative("margin_right_pt", self.margin_right_pt)?;
        check_non_negative("margin_top_pt", self.margin_top_pt)?;
        check_non_negative("margin_bottom_pt", self.margin_bottom_pt)?;
        for paragraph in &self.paragraphs {
            paragraph.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{MemoryFont, MemoryParagraph, MemoryTextFrame};
    use crate::engine::NativeAlignment;

    fn styled_frame() -> TextFrameModel {
        TextFrameModel {
            paragraphs: vec![
                ParagraphModel {
                    runs: vec![
                        RunModel {
                            text: "Quarterly ".into(),
                            font: Some(FontModel {
                                name: Some("Arial".into()),
                                size_pt: Some(28.0),
                                bold: Some(true),
                                color: Some(Color::new("1F4E79").unwrap()),
                                ..FontModel::default()
                            }),
                            hyperlink: None,
                        },
                        RunModel {
                            text: "review".into(),
                            font: None,
                            hyperlink: Some("https://example.com/q3".into()),
                        },
                    ],
                    alignment: Some(ParagraphAlignment::Center),
                    level: 0,
                    line_spacing: Some(1.5),
                    space_before_pt: Some(6.0),
                    space_after_pt: None,
                },
                ParagraphModel {
                    level: 2,
                    ..ParagraphModel::from_text("Details")
                },
            ],
            auto_size: Some(AutoSize::ShapeToFitText),
            vertical_anchor: Some(VerticalAnchor::Middle),
            margin_left_pt: 10.0,
            word_wrap: Some(true),
            ..TextFrameModel::default()
        }
    }

    #[test]
    fn test_frame_survives_engine_round_trip() {
        let model = styled_frame();
        let mut frame = MemoryTextFrame::default();

        let report = model.apply_to(&mut frame);
        assert!(report.is_clean(), "{:?}", report.failures);

        assert_eq!(TextFrameModel::from_engine(&frame), model);
        assert_eq!(model.text(), "Quarterly review\nDetails");
    }

    #[test]
    fn test_first_paragraph_is_reused() {
        let mut frame = MemoryTextFrame::default();
        frame.paragraphs[0].alignment = Some(NativeAlignment::Right);

        TextFrameModel::from_text("one\ntwo").apply_to(&mut frame);
        assert_eq!(frame.paragraphs.len(), 2);
        assert_eq!(frame.paragraphs[0].runs[0].text, "one");
    }

    #[test]
    fn test_empty_frame_clears_first_paragraph() {
        let mut frame = MemoryTextFrame::default();
        TextFrameModel::from_text("stale").apply_to(&mut frame);

        TextFrameModel::default().apply_to(&mut frame);
        assert_eq!(frame.paragraphs.len(), 1);
        assert!(frame.paragraphs[0].runs.is_empty());
    }

    #[test]
    fn test_font_failure_does_not_block_siblings() {
        let mut font = MemoryFont::default();
        font.faults.insert("set_size");

        let model = FontModel {
            size_pt: Some(12.0),
            bold: Some(true),
            ..FontModel::default()
        };
        let report = model.apply_to(&mut font);

        assert!(report.failed("size_pt"));
        assert!(report.was_applied("bold"));
        assert_eq!(font.bold, Some(true));
        assert_eq!(font.size, None);
    }

    #[test]
    fn test_extraction_drops_out_of_range_values() {
        let mut paragraph = MemoryParagraph::default();
        paragraph.level = 12;
        paragraph.line_spacing = Some(LineSpacing::Exact(pt_to_emu(18.0)));
        paragraph.space_after = Some(pt_to_emu(500.0));

        let model = ParagraphModel::from_engine(&paragraph);
        assert_eq!(model.level, 0);
        assert_eq!(model.line_spacing, None);
        assert_eq!(model.space_after_pt, None);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_extraction_ignores_failing_getters() {
        let mut frame = MemoryTextFrame::default();
        frame.faults.insert("margin");
        frame.faults.insert("auto_size");

        let model = TextFrameModel::from_engine(&frame);
        assert_eq!(model.margin_left_pt, DEFAULT_MARGIN_PT);
        assert_eq!(model.auto_size, Some(AutoSize::None));
    }

    #[test]
    fn test_validation() {
        let mut paragraph = ParagraphModel::from_text("x");
        paragraph.level = 9;
        assert!(paragraph.validate().is_err());

        paragraph.level = 8;
        paragraph.line_spacing = Some(0.25);
        assert!(paragraph.validate().is_err());

        let frame = TextFrameModel {
            margin_top_pt: -1.0,
            ..TextFrameModel::default()
        };
        assert!(frame.validate().is_err());

        let font = FontModel {
            size_pt: Some(600.0),
            ..FontModel::default()
        };
        assert!(font.validate().is_err());
    }

    #[test]
    fn test_json_defaults_and_strictness() {
        let frame = TextFrameModel::from_json(r#"{"paragraphs": [{"runs": [{"text": "Hi"}]}]}"#)
            .unwrap();
        assert_eq!(frame.margin_bottom_pt, DEFAULT_MARGIN_PT);
        assert_eq!(frame.paragraphs[0].level, 0);
        assert_eq!(frame.text(), "Hi");

        assert!(TextFrameModel::from_json(r#"{"paragraphs": [], "shadow": true}"#).is_err());
        assert!(ParagraphModel::from_json(r#"{"level": 9}"#).is_err());

        let json = frame.to_json().unwrap();
        assert!(json.contains("\"auto_size\":null"));
        assert_eq!(TextFrameModel::from_json(&json).unwrap(), frame);
    }
}
