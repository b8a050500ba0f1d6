//! Portable enumerations and their mapping to document engine values.
//!
//! Mapping towards the model is lenient: an engine value with no portable
//! counterpart becomes `None` so extraction keeps working on documents that
//! use features the model does not describe. Mapping back is total.

use crate::engine::{NativeAlignment, NativeAnchor, NativeAutoSize, NativeUnderline};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphAlignment {
    Left,
    Center,
    Right,
    Justify,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAnchor {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoSize {
    None,
    TextToFitShape,
    ShapeToFitText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Underline {
    None,
    Single,
}

/// Discriminator values of [`crate::ShapeModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    TextBox,
    Picture,
    Table,
    Chart,
    Unknown,
}

impl ShapeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextBox => "text_box",
            Self::Picture => "picture",
            Self::Table => "table",
            Self::Chart => "chart",
            Self::Unknown => "unknown",
        }
    }
}

pub fn to_alignment(native: Option<NativeAlignment>) -> Option<ParagraphAlignment> {
    match native? {
        NativeAlignment::Left => Some(ParagraphAlignment::Left),
        NativeAlignment::Center => Some(ParagraphAlignment::Center),
        NativeAlignment::Right => Some(ParagraphAlignment::Right),
        NativeAlignment::Justify => Some(ParagraphAlignment::Justify),
        NativeAlignment::Distribute => Some(ParagraphAlignment::Distributed),
        NativeAlignment::JustifyLow | NativeAlignment::ThaiDistribute | NativeAlignment::Mixed => {
            None
        }
    }
}

pub fn from_alignment(alignment: Option<ParagraphAlignment>) -> Option<NativeAlignment> {
    Some(match alignment? {
        ParagraphAlignment::Left => NativeAlignment::Left,
        ParagraphAlignment::Center => NativeAlignment::Center,
        ParagraphAlignment::Right => NativeAlignment::Right,
        ParagraphAlignment::Justify => NativeAlignment::Justify,
        ParagraphAlignment::Distributed => NativeAlignment::Distribute,
    })
}

pub fn to_vertical_anchor(native: Option<NativeAnchor>) -> Option<VerticalAnchor> {
    match native? {
        NativeAnchor::Top => Some(VerticalAnchor::Top),
        NativeAnchor::Middle => Some(VerticalAnchor::Middle),
        NativeAnchor::Bottom => Some(VerticalAnchor::Bottom),
        NativeAnchor::Mixed => None,
    }
}

pub fn from_vertical_anchor(anchor: Option<VerticalAnchor>) -> Option<NativeAnchor> {
    Some(match anchor? {
        VerticalAnchor::Top => NativeAnchor::Top,
        VerticalAnchor::Middle => NativeAnchor::Middle,
        VerticalAnchor::Bottom => NativeAnchor::Bottom,
    })
}

/// An engine with no autosize setting behaves like [`AutoSize::None`].
pub fn to_auto_size(native: Option<NativeAutoSize>) -> Option<AutoSize> {
    match native {
        None | Some(NativeAutoSize::None) => Some(AutoSize::None),
        Some(NativeAutoSize::TextToFitShape) => Some(AutoSize::TextToFitShape),
        Some(NativeAutoSize::ShapeToFitText) => Some(AutoSize::ShapeToFitText),
        Some(NativeAutoSize::Mixed) => None,
    }
}

pub fn from_auto_size(auto_size: Option<AutoSize>) -> Option<NativeAutoSize> {
    Some(match auto_size? {
        AutoSize::None => NativeAutoSize::None,
        AutoSize::TextToFitShape => NativeAutoSize::TextToFitShape,
        AutoSize::ShapeToFitText => NativeAutoSize::ShapeToFitText,
    })
}

pub fn to_underline(native: Option<NativeUnderline>) -> Option<Underline> {
    match native? {
        NativeUnderline::None => Some(Underline::None),
        NativeUnderline::Single => Some(Underline::Single),
        _ => None,
    }
}

pub fn from_underline(underline: Option<Underline>) -> Option<NativeUnderline> {
    Some(match underline? {
        Underline::None => NativeUnderline::None,
        Underline::Single => NativeUnderline::Single,
    })
}
