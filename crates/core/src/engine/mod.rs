//! Capability interface over a live presentation document.
//!
//! The model never names a concrete document engine. Everything it reads or
//! writes goes through these object-safe traits, reached from an
//! [`EngineDocument`] through `&dyn` / `&mut dyn` child accessors.
//!
//! Getters and setters that a real engine may not support, or may fail on,
//! return [`EngineResult`]. Callers decide per field whether a failure
//! degrades to a default (extraction) or is recorded and skipped (apply).

pub mod memory;

use crate::chart::{BubbleChartData, CategoryChartData, XyChartData};
use crate::units::Emu;
use thiserror::Error;

/// Result type for document engine calls.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Failure reported by the document engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine does not implement this property or operation.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The engine attempted the operation and failed.
    #[error("failed: {0}")]
    Failed(String),
}

/// Position and size of a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub left: Emu,
    pub top: Emu,
    pub width: Emu,
    pub height: Emu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeAlignment {
    Left,
    Center,
    Right,
    Justify,
    JustifyLow,
    Distribute,
    ThaiDistribute,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeAnchor {
    Top,
    Middle,
    Bottom,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeAutoSize {
    None,
    TextToFitShape,
    ShapeToFitText,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeUnderline {
    None,
    Single,
    Double,
    Heavy,
    Dotted,
    Dash,
    Wavy,
    Words,
}

/// Fine-grained chart types as a document engine knows them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeChartType {
    ColumnClustered,
    ColumnStacked,
    ColumnStacked100,
    BarClustered,
    BarStacked,
    BarStacked100,
    Line,
    LineMarkers,
    LineStacked,
    Pie,
    PieExploded,
    Doughnut,
    DoughnutExploded,
    Area,
    AreaStacked,
    Radar,
    XyScatter,
    XyScatterLines,
    XyScatterLinesNoMarkers,
    XyScatterSmooth,
    XyScatterSmoothNoMarkers,
    Bubble,
    BubbleThreeDEffect,
    Surface,
    Stock,
}

/// Paragraph line spacing: a multiple of single spacing, or an exact length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSpacing {
    Lines(f64),
    Exact(Emu),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginSide {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableFlag {
    FirstRow,
    LastRow,
    FirstCol,
    LastCol,
    HorzBanding,
    VertBanding,
}

impl TableFlag {
    pub const ALL: [TableFlag; 6] = [
        TableFlag::FirstRow,
        TableFlag::LastRow,
        TableFlag::FirstCol,
        TableFlag::LastCol,
        TableFlag::HorzBanding,
        TableFlag::VertBanding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstRow => "first_row",
            Self::LastRow => "last_row",
            Self::FirstCol => "first_col",
            Self::LastCol => "last_col",
            Self::HorzBanding => "horz_banding",
            Self::VertBanding => "vert_banding",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    Category,
    Value,
}

impl AxisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category_axis",
            Self::Value => "value_axis",
        }
    }
}

/// Selects the major or minor variant of tick marks, units and gridlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Major,
    Minor,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::Major, Tier::Minor];

    pub fn tick_mark_name(&self) -> &'static str {
        match self {
            Self::Major => "major_tick_mark",
            Self::Minor => "minor_tick_mark",
        }
    }

    pub fn gridlines_name(&self) -> &'static str {
        match self {
            Self::Major => "has_major_gridlines",
            Self::Minor => "has_minor_gridlines",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleBound {
    Minimum,
    Maximum,
    MajorUnit,
    MinorUnit,
}

impl ScaleBound {
    pub const ALL: [ScaleBound; 4] = [
        ScaleBound::Minimum,
        ScaleBound::Maximum,
        ScaleBound::MajorUnit,
        ScaleBound::MinorUnit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimum => "minimum_scale",
            Self::Maximum => "maximum_scale",
            Self::MajorUnit => "major_unit",
            Self::MinorUnit => "minor_unit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMark {
    None,
    Inside,
    Outside,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickLabelPosition {
    None,
    Low,
    High,
    NextToAxis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    Bottom,
    Corner,
    Left,
    Right,
    Top,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataLabelPosition {
    Center,
    InsideEnd,
    InsideBase,
    OutsideEnd,
    Left,
    Right,
    Above,
    Below,
    BestFit,
}

/// The four show/hide switches of a series' data labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLabelFlag {
    ShowValue,
    ShowSeriesName,
    ShowCategoryName,
    ShowPercentage,
}

impl DataLabelFlag {
    pub const ALL: [DataLabelFlag; 4] = [
        DataLabelFlag::ShowValue,
        DataLabelFlag::ShowSeriesName,
        DataLabelFlag::ShowCategoryName,
        DataLabelFlag::ShowPercentage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShowValue => "show_value",
            Self::ShowSeriesName => "show_series_name",
            Self::ShowCategoryName => "show_category_name",
            Self::ShowPercentage => "show_percentage",
        }
    }
}

/// Per-point numeric storage of an XY or bubble series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointDimension {
    X,
    Y,
    BubbleSize,
}

impl PointDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::BubbleSize => "bubble_size",
        }
    }
}

/// Workbook formula references held by a chart series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesFormula {
    /// Category labels stored as text (`c:cat/c:strRef`).
    CategoryText,
    /// Category labels stored as numbers (`c:cat/c:numRef`).
    CategoryNumbers,
    Values,
    X,
    Y,
    BubbleSize,
}

/// Chart data handed to the engine when creating a chart or replacing its data.
#[derive(Debug, Clone, Copy)]
pub enum ChartPayload<'a> {
    Category(&'a CategoryChartData),
    Xy(&'a XyChartData),
    Bubble(&'a BubbleChartData),
}

pub trait EngineDocument {
    fn slide_width(&self) -> EngineResult<Option<Emu>>;
    fn set_slide_width(&mut self, width: Emu) -> EngineResult<()>;
    fn slide_height(&self) -> EngineResult<Option<Emu>>;
    fn set_slide_height(&mut self, height: Emu) -> EngineResult<()>;

    fn layout_count(&self) -> usize;
    fn slide_count(&self) -> usize;
    fn slide(&self, index: usize) -> Option<&dyn EngineSlide>;
    fn slide_mut(&mut self, index: usize) -> Option<&mut dyn EngineSlide>;

    /// Append a slide based on the layout at `layout`.
    fn add_slide(&mut self, layout: usize) -> EngineResult<&mut dyn EngineSlide>;
}

pub trait EngineSlide {
    /// Index of the layout this slide was created from, when known.
    fn layout_index(&self) -> Option<usize>;

    fn shape_count(&self) -> usize;
    fn shape(&self, index: usize) -> Option<&dyn EngineShape>;
    fn shape_mut(&mut self, index: usize) -> Option<&mut dyn EngineShape>;

    fn add_text_box(&mut self, geometry: Geometry) -> EngineResult<&mut dyn EngineShape>;
    fn add_picture(
        &mut self,
        image_path: &str,
        geometry: Geometry,
    ) -> EngineResult<&mut dyn EngineShape>;
    fn add_table(
        &mut self,
        rows: usize,
        cols: usize,
        geometry: Geometry,
    ) -> EngineResult<&mut dyn EngineShape>;
    fn add_chart(
        &mut self,
        chart_type: NativeChartType,
        geometry: Geometry,
        data: ChartPayload<'_>,
    ) -> EngineResult<&mut dyn EngineShape>;
}

pub trait EngineShape {
    fn name(&self) -> Option<String>;
    fn set_name(&mut self, name: &str) -> EngineResult<()>;
    fn geometry(&self) -> EngineResult<Geometry>;
    fn rotation(&self) -> EngineResult<f64>;
    fn set_rotation(&mut self, degrees: f64) -> EngineResult<()>;
    fn is_picture(&self) -> bool;

    fn text_frame(&self) -> Option<&dyn EngineTextFrame>;
    fn text_frame_mut(&mut self) -> Option<&mut dyn EngineTextFrame>;
    fn table(&self) -> Option<&dyn EngineTable>;
    fn table_mut(&mut self) -> Option<&mut dyn EngineTable>;
    fn chart(&self) -> Option<&dyn EngineChart>;
    fn chart_mut(&mut self) -> Option<&mut dyn EngineChart>;
}

pub trait EngineTextFrame {
    fn paragraph_count(&self) -> usize;
    fn paragraph(&self, index: usize) -> Option<&dyn EngineParagraph>;
    fn paragraph_mut(&mut self, index: usize) -> Option<&mut dyn EngineParagraph>;
    fn add_paragraph(&mut self) -> EngineResult<&mut dyn EngineParagraph>;

    /// Replace all content with a single unformatted paragraph per line.
    fn set_text(&mut self, text: &str) -> EngineResult<()>;

    fn auto_size(&self) -> EngineResult<Option<NativeAutoSize>>;
    fn set_auto_size(&mut self, value: Option<NativeAutoSize>) -> EngineResult<()>;
    fn vertical_anchor(&self) -> EngineResult<Option<NativeAnchor>>;
    fn set_vertical_anchor(&mut self, value: Option<NativeAnchor>) -> EngineResult<()>;
    fn margin(&self, side: MarginSide) -> EngineResult<Option<Emu>>;
    fn set_margin(&mut self, side: MarginSide, value: Emu) -> EngineResult<()>;
    fn word_wrap(&self) -> EngineResult<Option<bool>>;
    fn set_word_wrap(&mut self, value: bool) -> EngineResult<()>;
}

pub trait EngineParagraph {
    fn run_count(&self) -> usize;
    fn run(&self, index: usize) -> Option<&dyn EngineRun>;
    fn run_mut(&mut self, index: usize) -> Option<&mut dyn EngineRun>;
    fn add_run(&mut self) -> EngineResult<&mut dyn EngineRun>;

    /// Remove every run, keeping paragraph properties.
    fn clear(&mut self) -> EngineResult<()>;

    fn alignment(&self) -> EngineResult<Option<NativeAlignment>>;
    fn set_alignment(&mut self, value: Option<NativeAlignment>) -> EngineResult<()>;
    fn level(&self) -> EngineResult<u8>;
    fn set_level(&mut self, level: u8) -> EngineResult<()>;
    fn line_spacing(&self) -> EngineResult<Option<LineSpacing>>;
    fn set_line_spacing(&mut self, value: LineSpacing) -> EngineResult<()>;
    fn space_before(&self) -> EngineResult<Option<Emu>>;
    fn set_space_before(&mut self, value: Emu) -> EngineResult<()>;
    fn space_after(&self) -> EngineResult<Option<Emu>>;
    fn set_space_after(&mut self, value: Emu) -> EngineResult<()>;
}

pub trait EngineRun {
    fn text(&self) -> String;
    fn set_text(&mut self, text: &str) -> EngineResult<()>;
    fn font(&self) -> &dyn EngineFont;
    fn font_mut(&mut self) -> &mut dyn EngineFont;
    fn hyperlink(&self) -> EngineResult<Option<String>>;
    fn set_hyperlink(&mut self, address: &str) -> EngineResult<()>;
}

pub trait EngineFont {
    fn name(&self) -> EngineResult<Option<String>>;
    fn set_name(&mut self, name: &str) -> EngineResult<()>;
    fn size(&self) -> EngineResult<Option<Emu>>;
    fn set_size(&mut self, size: Emu) -> EngineResult<()>;
    fn bold(&self) -> EngineResult<Option<bool>>;
    fn set_bold(&mut self, value: bool) -> EngineResult<()>;
    fn italic(&self) -> EngineResult<Option<bool>>;
    fn set_italic(&mut self, value: bool) -> EngineResult<()>;
    fn underline(&self) -> EngineResult<Option<NativeUnderline>>;
    fn set_underline(&mut self, value: Option<NativeUnderline>) -> EngineResult<()>;
    fn color_rgb(&self) -> EngineResult<Option<[u8; 3]>>;
    fn set_color_rgb(&mut self, rgb: [u8; 3]) -> EngineResult<()>;
}

pub trait EngineTable {
    fn row_count(&self) -> usize;
    fn column_count(&self) -> usize;
    fn column_width(&self, col: usize) -> EngineResult<Emu>;
    fn set_column_width(&mut self, col: usize, width: Emu) -> EngineResult<()>;
    fn row_height(&self, row: usize) -> EngineResult<Emu>;
    fn set_row_height(&mut self, row: usize, height: Emu) -> EngineResult<()>;
    fn flag(&self, flag: TableFlag) -> EngineResult<Option<bool>>;
    fn set_flag(&mut self, flag: TableFlag, value: bool) -> EngineResult<()>;
    fn cell_text_frame(&self, row: usize, col: usize) -> Option<&dyn EngineTextFrame>;
    fn cell_text_frame_mut(&mut self, row: usize, col: usize)
        -> Option<&mut dyn EngineTextFrame>;
}

pub trait EngineChart {
    fn chart_type(&self) -> EngineResult<NativeChartType>;

    fn has_title(&self) -> EngineResult<bool>;
    fn title_text(&self) -> EngineResult<Option<String>>;
    /// Turn the title on and set its text.
    fn set_title(&mut self, text: &str) -> EngineResult<()>;

    fn has_legend(&self) -> EngineResult<bool>;
    fn set_has_legend(&mut self, value: bool) -> EngineResult<()>;
    fn legend(&self) -> Option<&dyn EngineLegend>;
    fn legend_mut(&mut self) -> Option<&mut dyn EngineLegend>;

    fn style(&self) -> EngineResult<Option<u8>>;
    fn set_style(&mut self, style: u8) -> EngineResult<()>;

    /// Category labels of the first plot.
    fn categories(&self) -> EngineResult<Vec<String>>;
    fn series_count(&self) -> usize;
    fn series(&self, index: usize) -> Option<&dyn EngineSeries>;
    fn series_mut(&mut self, index: usize) -> Option<&mut dyn EngineSeries>;

    fn axis(&self, kind: AxisKind) -> EngineResult<&dyn EngineAxis>;
    fn axis_mut(&mut self, kind: AxisKind) -> EngineResult<&mut dyn EngineAxis>;

    /// Replace every series with `data`. Engines typically reset series and
    /// axis formatting when doing so.
    fn replace_data(&mut self, data: ChartPayload<'_>) -> EngineResult<()>;

    /// The embedded XLSX package backing the chart, if any.
    fn workbook(&self) -> EngineResult<Option<Vec<u8>>>;
    fn set_workbook(&mut self, bytes: Vec<u8>) -> EngineResult<()>;
}

pub trait EngineSeries {
    fn name(&self) -> EngineResult<Option<String>>;
    fn values(&self) -> EngineResult<Vec<Option<f64>>>;

    /// Number of points held in native per-point storage, or `None` when the
    /// series has no such storage for `dimension`.
    fn point_count(&self, dimension: PointDimension) -> EngineResult<Option<usize>>;
    fn point_value(&self, dimension: PointDimension, index: usize) -> EngineResult<Option<f64>>;

    fn formula(&self, which: SeriesFormula) -> Option<String>;

    fn data_labels(&self) -> EngineResult<&dyn EngineDataLabels>;
    fn data_labels_mut(&mut self) -> EngineResult<&mut dyn EngineDataLabels>;
}

pub trait EngineDataLabels {
    fn number_format(&self) -> EngineResult<Option<String>>;
    fn set_number_format(&mut self, format: &str) -> EngineResult<()>;
    fn number_format_is_linked(&self) -> EngineResult<bool>;
    fn set_number_format_is_linked(&mut self, value: bool) -> EngineResult<()>;
    fn position(&self) -> EngineResult<Option<DataLabelPosition>>;
    fn set_position(&mut self, position: DataLabelPosition) -> EngineResult<()>;
    fn flag(&self, flag: DataLabelFlag) -> EngineResult<Option<bool>>;
    fn set_flag(&mut self, flag: DataLabelFlag, value: bool) -> EngineResult<()>;
}

pub trait EngineAxis {
    fn has_title(&self) -> EngineResult<bool>;
    fn set_has_title(&mut self, value: bool) -> EngineResult<()>;
    fn title_text(&self) -> EngineResult<Option<String>>;
    fn set_title_text(&mut self, text: &str) -> EngineResult<()>;
    fn tick_mark(&self, tier: Tier) -> EngineResult<Option<TickMark>>;
    fn set_tick_mark(&mut self, tier: Tier, mark: TickMark) -> EngineResult<()>;
    fn scale(&self, bound: ScaleBound) -> EngineResult<Option<f64>>;
    fn set_scale(&mut self, bound: ScaleBound, value: f64) -> EngineResult<()>;
    fn reverse_order(&self) -> EngineResult<bool>;
    fn set_reverse_order(&mut self, value: bool) -> EngineResult<()>;
    fn tick_label_position(&self) -> EngineResult<Option<TickLabelPosition>>;
    fn set_tick_label_position(&mut self, position: TickLabelPosition) -> EngineResult<()>;
    fn gridlines(&self, tier: Tier) -> EngineResult<bool>;
    fn set_gridlines(&mut self, tier: Tier, value: bool) -> EngineResult<()>;
    fn tick_label_number_format(&self) -> EngineResult<Option<String>>;
    fn set_tick_label_number_format(&mut self, format: &str) -> EngineResult<()>;
    fn tick_label_format_is_linked(&self) -> EngineResult<bool>;
    fn set_tick_label_format_is_linked(&mut self, value: bool) -> EngineResult<()>;
    fn visible(&self) -> EngineResult<bool>;
    fn set_visible(&mut self, value: bool) -> EngineResult<()>;
}

pub trait EngineLegend {
    fn position(&self) -> EngineResult<Option<LegendPosition>>;
    fn set_position(&mut self, position: LegendPosition) -> EngineResult<()>;
    fn include_in_layout(&self) -> EngineResult<Option<bool>>;
    fn set_include_in_layout(&mut self, value: bool) -> EngineResult<()>;
}
