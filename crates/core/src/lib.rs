//! Presentation object model with a strict JSON mapping.
//!
//! A deck is extracted from, or built into, a live document through the
//! capability traits in [`engine`]. Charts in an existing deck can be patched
//! in place, either by replacing their data while carrying formatting across
//! or by rewriting only their embedded workbook.

pub mod chart;
pub mod color;
pub mod engine;
pub mod enums;
pub mod error;
pub mod json;
pub mod presentation;
pub mod report;
pub mod shape;
pub mod slide;
pub mod table;
pub mod text;
pub mod units;

pub use chart::{
    BubbleChartData, BubblePoint, BubbleSeries, CategoryChartData, CategorySeries,
    ChartFamily, ChartModel, ChartType, ChartUpdateOutcome, FormattingSnapshot, XyChartData,
    XyPoint, XySeries,
};
pub use color::{normalize_hex, Color};
pub use engine::{EngineError, EngineResult};
pub use enums::{AutoSize, ParagraphAlignment, ShapeKind, Underline, VerticalAnchor};
pub use error::{Error, Result};
pub use json::JsonModel;
pub use presentation::{
    pair_charts, ChartPatch, PatchMethod, PatchReport, PresentationModel, UnpairedChart,
};
pub use report::{ApplyReport, FieldFailure};
pub use shape::{PictureModel, ShapeModel, TextBoxModel, UnknownShapeModel};
pub use slide::SlideModel;
pub use table::{CellContent, TableModel};
pub use text::{FontModel, ParagraphModel, RunModel, TextFrameModel};
