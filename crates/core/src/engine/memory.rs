//! In-memory document engine.
//!
//! Every trait in [`crate::engine`] implemented over plain owned values, with
//! the behaviour of a real engine where the model depends on it: charts get an
//! embedded workbook and formula references, and replacing chart data resets
//! series, axis and legend formatting.
//!
//! Any getter or setter can be made to fail through [`Faults`]. Getters are
//! keyed by method name (`"title_text"`), setters by `set_` plus the property
//! (`"set_title"`). Per-point accessors are keyed with their dimension
//! (`"point_value.bubble_size"`), axis access with the axis name
//! (`"value_axis"`), and chart data with `"replace_data"`, `"workbook"` and
//! `"set_workbook"`.

use super::{
    AxisKind, ChartPayload, DataLabelFlag, DataLabelPosition, EngineAxis, EngineChart,
    EngineDataLabels, EngineDocument, EngineError, EngineFont, EngineLegend, EngineParagraph,
    EngineResult, EngineRun, EngineSeries, EngineShape, EngineSlide, EngineTable,
    EngineTextFrame, Geometry, LegendPosition, LineSpacing, MarginSide, NativeAlignment,
    NativeAnchor, NativeAutoSize, NativeChartType, NativeUnderline, PointDimension, ScaleBound,
    SeriesFormula, TableFlag, Tier, TickLabelPosition, TickMark,
};
use crate::units::{inches_to_emu, Emu};
use deck_xlsx::writer::SHEET_NAME;
use deck_xlsx::{column_name, CellRef, ChartSheetWriter};
use std::collections::{BTreeSet, HashMap};
use std::mem;

/// Operation names that fail when called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Faults(BTreeSet<String>);

impl Faults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(ops: &[&str]) -> Self {
        Self(ops.iter().map(|op| op.to_string()).collect())
    }

    pub fn insert(&mut self, op: &str) {
        self.0.insert(op.to_string());
    }

    pub fn contains(&self, op: &str) -> bool {
        self.0.contains(op)
    }

    pub fn check(&self, op: &str) -> EngineResult<()> {
        if self.contains(op) {
            Err(EngineError::Failed(format!("injected fault: {}", op)))
        } else {
            Ok(())
        }
    }

    fn read<T>(&self, op: &str, value: T) -> EngineResult<T> {
        self.check(op).map(|()| value)
    }
}

// ---------------------------------------------------------------------------
// Document and slides
// ---------------------------------------------------------------------------

/// Number of layouts a new document offers, as in the default template.
pub const DEFAULT_LAYOUT_COUNT: usize = 11;

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDocument {
    pub slide_width: Option<Emu>,
    pub slide_height: Option<Emu>,
    pub layout_count: usize,
    pub slides: Vec<MemorySlide>,
    pub faults: Faults,
}

impl MemoryDocument {
    /// A blank 10 x 7.5 inch document.
    pub fn new() -> Self {
        Self {
            slide_width: Some(inches_to_emu(10.0)),
            slide_height: Some(inches_to_emu(7.5)),
            layout_count: DEFAULT_LAYOUT_COUNT,
            slides: Vec::new(),
            faults: Faults::new(),
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineDocument for MemoryDocument {
    fn slide_width(&self) -> EngineResult<Option<Emu>> {
        self.faults.read("slide_width", self.slide_width)
    }

    fn set_slide_width(&mut self, width: Emu) -> EngineResult<()> {
        self.faults.check("set_slide_width")?;
        self.slide_width = Some(width);
        Ok(())
    }

    fn slide_height(&self) -> EngineResult<Option<Emu>> {
        self.faults.read("slide_height", self.slide_height)
    }

    fn set_slide_height(&mut self, height: Emu) -> EngineResult<()> {
        self.faults.check("set_slide_height")?;
        self.slide_height = Some(height);
        Ok(())
    }

    fn layout_count(&self) -> usize {
        self.layout_count
    }

    fn slide_count(&self) -> usize {
        self.slides.len()
    }

    fn slide(&self, index: usize) -> Option<&dyn EngineSlide> {
        self.slides.get(index).map(|s| s as &dyn EngineSlide)
    }

    fn slide_mut(&mut self, index: usize) -> Option<&mut dyn EngineSlide> {
        self.slides.get_mut(index).map(|s| s as &mut dyn EngineSlide)
    }

    fn add_slide(&mut self, layout: usize) -> EngineResult<&mut dyn EngineSlide> {
        self.faults.check("add_slide")?;
        if layout >= self.layout_count {
            return Err(EngineError::Failed(format!(
                "layout {} out of range ({} layouts)",
                layout, self.layout_count
            )));
        }
        let index = self.slides.len();
        self.slides.push(MemorySlide {
            layout_index: Some(layout),
            ..MemorySlide::default()
        });
        Ok(&mut self.slides[index])
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySlide {
    pub layout_index: Option<usize>,
    pub shapes: Vec<MemoryShape>,
    pub faults: Faults,
    /// Faults given to every chart created on this slide.
    pub chart_faults: Faults,
}

impl MemorySlide {
    fn push_shape(&mut self, geometry: Geometry, content: ShapeContent) -> &mut dyn EngineShape {
        let index = self.shapes.len();
        self.shapes.push(MemoryShape::new(None, geometry, content));
        &mut self.shapes[index]
    }
}

impl EngineSlide for MemorySlide {
    fn layout_index(&self) -> Option<usize> {
        self.layout_index
    }

    fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    fn shape(&self, index: usize) -> Option<&dyn EngineShape> {
        self.shapes.get(index).map(|s| s as &dyn EngineShape)
    }

    fn shape_mut(&mut self, index: usize) -> Option<&mut dyn EngineShape> {
        self.shapes.get_mut(index).map(|s| s as &mut dyn EngineShape)
    }

    fn add_text_box(&mut self, geometry: Geometry) -> EngineResult<&mut dyn EngineShape> {
        self.faults.check("add_text_box")?;
        Ok(self.push_shape(geometry, ShapeContent::TextBox(MemoryTextFrame::default())))
    }

    fn add_picture(
        &mut self,
        image_path: &str,
        geometry: Geometry,
    ) -> EngineResult<&mut dyn EngineShape> {
        self.faults.check("add_picture")?;
        let content = ShapeContent::Picture {
            image_path: image_path.to_string(),
        };
        Ok(self.push_shape(geometry, content))
    }

    fn add_table(
        &mut self,
        rows: usize,
        cols: usize,
        geometry: Geometry,
    ) -> EngineResult<&mut dyn EngineShape> {
        self.faults.check("add_table")?;
        if rows == 0 || cols == 0 {
            return Err(EngineError::Failed(format!("{}x{} table", rows, cols)));
        }
        let table = MemoryTable::new(rows, cols, geometry);
        Ok(self.push_shape(geometry, ShapeContent::Table(table)))
    }

    fn add_chart(
        &mut self,
        chart_type: NativeChartType,
        geometry: Geometry,
        data: ChartPayload<'_>,
    ) -> EngineResult<&mut dyn EngineShape> {
        self.faults.check("add_chart")?;
        let mut chart = MemoryChart::new(chart_type, data)?;
        chart.faults = self.chart_faults.clone();
        Ok(self.push_shape(geometry, ShapeContent::Chart(chart)))
    }
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeContent {
    TextBox(MemoryTextFrame),
    Picture { image_path: String },
    Table(MemoryTable),
    Chart(MemoryChart),
    /// Connectors, groups and anything else the model does not describe.
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryShape {
    pub name: Option<String>,
    pub geometry: Geometry,
    pub rotation: f64,
    pub content: ShapeContent,
    pub faults: Faults,
}

impl MemoryShape {
    pub fn new(name: Option<String>, geometry: Geometry, content: ShapeContent) -> Self {
        Self {
            name,
            geometry,
            rotation: 0.0,
            content,
            faults: Faults::new(),
        }
    }

    pub fn as_chart(&self) -> Option<&MemoryChart> {
        match &self.content {
            ShapeContent::Chart(chart) => Some(chart),
            _ => None,
        }
    }

    pub fn as_chart_mut(&mut self) -> Option<&mut MemoryChart> {
        match &mut self.content {
            ShapeContent::Chart(chart) => Some(chart),
            _ => None,
        }
    }
}

impl EngineShape for MemoryShape {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn set_name(&mut self, name: &str) -> EngineResult<()> {
        self.faults.check("set_name")?;
        self.name = Some(name.to_string());
        Ok(())
    }

    fn geometry(&self) -> EngineResult<Geometry> {
        self.faults.read("geometry", self.geometry)
    }

    fn rotation(&self) -> EngineResult<f64> {
        self.faults.read("rotation", self.rotation)
    }

    fn set_rotation(&mut self, degrees: f64) -> EngineResult<()> {
        self.faults.check("set_rotation")?;
        self.rotation = degrees;
        Ok(())
    }

    fn is_picture(&self) -> bool {
        matches!(self.content, ShapeContent::Picture { .. })
    }

    fn text_frame(&self) -> Option<&dyn EngineTextFrame> {
        match &self.content {
            ShapeContent::TextBox(frame) => Some(frame),
            _ => None,
        }
    }

    fn text_frame_mut(&mut self) -> Option<&mut dyn EngineTextFrame> {
        match &mut self.content {
            ShapeContent::TextBox(frame) => Some(frame),
            _ => None,
        }
    }

    fn table(&self) -> Option<&dyn EngineTable> {
        match &self.content {
            ShapeContent::Table(table) => Some(table),
            _ => None,
        }
    }

    fn table_mut(&mut self) -> Option<&mut dyn EngineTable> {
        match &mut self.content {
            ShapeContent::Table(table) => Some(table),
            _ => None,
        }
    }

    fn chart(&self) -> Option<&dyn EngineChart> {
        self.as_chart().map(|c| c as &dyn EngineChart)
    }

    fn chart_mut(&mut self) -> Option<&mut dyn EngineChart> {
        self.as_chart_mut().map(|c| c as &mut dyn EngineChart)
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTextFrame {
    pub paragraphs: Vec<MemoryParagraph>,
    pub auto_size: Option<NativeAutoSize>,
    pub vertical_anchor: Option<NativeAnchor>,
    pub margin_left: Option<Emu>,
    pub margin_right: Option<Emu>,
    pub margin_top: Option<Emu>,
    pub margin_bottom: Option<Emu>,
    pub word_wrap: Option<bool>,
    pub faults: Faults,
}

/// A new frame holds one empty paragraph and the usual 0.1" / 0.05" insets.
impl Default for MemoryTextFrame {
    fn default() -> Self {
        Self {
            paragraphs: vec![MemoryParagraph::default()],
            auto_size: None,
            vertical_anchor: None,
            margin_left: Some(91_440),
            margin_right: Some(91_440),
            margin_top: Some(45_720),
            margin_bottom: Some(45_720),
            word_wrap: None,
            faults: Faults::new(),
        }
    }
}

impl MemoryTextFrame {
    fn margin_slot(&mut self, side: MarginSide) -> &mut Option<Emu> {
        match side {
            MarginSide::Left => &mut self.margin_left,
            MarginSide::Right => &mut self.margin_right,
            MarginSide::Top => &mut self.margin_top,
            MarginSide::Bottom => &mut self.margin_bottom,
        }
    }
}

impl EngineTextFrame for MemoryTextFrame {
    fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    fn paragraph(&self, index: usize) -> Option<&dyn EngineParagraph> {
        self.paragraphs.get(index).map(|p| p as &dyn EngineParagraph)
    }

    fn paragraph_mut(&mut self, index: usize) -> Option<&mut dyn EngineParagraph> {
        self.paragraphs
            .get_mut(index)
            .map(|p| p as &mut dyn EngineParagraph)
    }

    fn add_paragraph(&mut self) -> EngineResult<&mut dyn EngineParagraph> {
        self.faults.check("add_paragraph")?;
        let index = self.paragraphs.len();
        self.paragraphs.push(MemoryParagraph::default());
        Ok(&mut self.paragraphs[index])
    }

    fn set_text(&mut self, text: &str) -> EngineResult<()> {
        self.faults.check("set_text")?;
        self.paragraphs = text
            .split('\n')
            .map(|line| MemoryParagraph {
                runs: if line.is_empty() {
                    Vec::new()
                } else {
                    vec![MemoryRun::new(line)]
                },
                ..MemoryParagraph::default()
            })
            .collect();
        Ok(())
    }

    fn auto_size(&self) -> EngineResult<Option<NativeAutoSize>> {
        self.faults.read("auto_size", self.auto_size)
    }

    fn set_auto_size(&mut self, value: Option<NativeAutoSize>) -> EngineResult<()> {
        self.faults.check("set_auto_size")?;
        self.auto_size = value;
        Ok(())
    }

    fn vertical_anchor(&self) -> EngineResult<Option<NativeAnchor>> {
        self.faults.read("vertical_anchor", self.vertical_anchor)
    }

    fn set_vertical_anchor(&mut self, value: Option<NativeAnchor>) -> EngineResult<()> {
        self.faults.check("set_vertical_anchor")?;
        self.vertical_anchor = value;
        Ok(())
    }

    fn margin(&self, side: MarginSide) -> EngineResult<Option<Emu>> {
        self.faults.check("margin")?;
        Ok(match side {
            MarginSide::Left => self.margin_left,
            MarginSide::Right => self.margin_right,
            MarginSide::Top => self.margin_top,
            MarginSide::Bottom => self.margin_bottom,
        })
    }

    fn set_margin(&mut self, side: MarginSide, value: Emu) -> EngineResult<()> {
        self.faults.check("set_margin")?;
        *self.margin_slot(side) = Some(value);
        Ok(())
    }

    fn word_wrap(&self) -> EngineResult<Option<bool>> {
        self.faults.read("word_wrap", self.word_wrap)
    }

    fn set_word_wrap(&mut self, value: bool) -> EngineResult<()> {
        self.faults.check("set_word_wrap")?;
        self.word_wrap = Some(value);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryParagraph {
    pub runs: Vec<MemoryRun>,
    pub alignment: Option<NativeAlignment>,
    pub level: u8,
    pub line_spacing: Option<LineSpacing>,
    pub space_before: Option<Emu>,
    pub space_after: Option<Emu>,
    pub faults: Faults,
}

impl EngineParagraph for MemoryParagraph {
    fn run_count(&self) -> usize {
        self.runs.len()
    }

    fn run(&self, index: usize) -> Option<&dyn EngineRun> {
        self.runs.get(index).map(|r| r as &dyn EngineRun)
    }

    fn run_mut(&mut self, index: usize) -> Option<&mut dyn EngineRun> {
        self.runs.get_mut(index).map(|r| r as &mut dyn EngineRun)
    }

    fn add_run(&mut self) -> EngineResult<&mut dyn EngineRun> {
        self.faults.check("add_run")?;
        let index = self.runs.len();
        self.runs.push(MemoryRun::default());
        Ok(&mut self.runs[index])
    }

    fn clear(&mut self) -> EngineResult<()> {
        self.faults.check("clear")?;
        self.runs.clear();
        Ok(())
    }

    fn alignment(&self) -> EngineResult<Option<NativeAlignment>> {
        self.faults.read("alignment", self.alignment)
    }

    fn set_alignment(&mut self, value: Option<NativeAlignment>) -> EngineResult<()> {
        self.faults.check("set_alignment")?;
        self.alignment = value;
        Ok(())
    }

    fn level(&self) -> EngineResult<u8> {
        self.faults.read("level", self.level)
    }

    fn set_level(&mut self, level: u8) -> EngineResult<()> {
        self.faults.check("set_level")?;
        self.level = level;
        Ok(())
    }

    fn line_spacing(&self) -> EngineResult<Option<LineSpacing>> {
        self.faults.read("line_spacing", self.line_spacing)
    }

    fn set_line_spacing(&mut self, value: LineSpacing) -> EngineResult<()> {
        self.faults.check("set_line_spacing")?;
        self.line_spacing = Some(value);
        Ok(())
    }

    fn space_before(&self) -> EngineResult<Option<Emu>> {
        self.faults.read("space_before", self.space_before)
    }

    fn set_space_before(&mut self, value: Emu) -> EngineResult<()> {
        self.faults.check("set_space_before")?;
        self.space_before = Some(value);
        Ok(())
    }

    fn space_after(&self) -> EngineResult<Option<Emu>> {
        self.faults.read("space_after", self.space_after)
    }

    fn set_space_after(&mut self, value: Emu) -> EngineResult<()> {
        self.faults.check("set_space_after")?;
        self.space_after = Some(value);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRun {
    pub text: String,
    pub font: MemoryFont,
    pub hyperlink: Option<String>,
    pub faults: Faults,
}

impl MemoryRun {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

impl EngineRun for MemoryRun {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) -> EngineResult<()> {
        self.faults.check("set_text")?;
        self.text = text.to_string();
        Ok(())
    }

    fn font(&self) -> &dyn EngineFont {
        &self.font
    }

    fn font_mut(&mut self) -> &mut dyn EngineFont {
        &mut self.font
    }

    fn hyperlink(&self) -> EngineResult<Option<String>> {
        self.faults.read("hyperlink", self.hyperlink.clone())
    }

    fn set_hyperlink(&mut self, address: &str) -> EngineResult<()> {
        self.faults.check("set_hyperlink")?;
        self.hyperlink = Some(address.to_string());
        Ok(())
    }
}

/// Run font. `None` means the property is inherited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryFont {
    pub name: Option<String>,
    pub size: Option<Emu>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<NativeUnderline>,
    pub color: Option<[u8; 3]>,
    pub faults: Faults,
}

impl EngineFont for MemoryFont {
    fn name(&self) -> EngineResult<Option<String>> {
        self.faults.read("name", self.name.clone())
    }

    fn set_name(&mut self, name: &str) -> EngineResult<()> {
        self.faults.check("set_name")?;
        self.name = Some(name.to_string());
        Ok(())
    }

    fn size(&self) -> EngineResult<Option<Emu>> {
        self.faults.read("size", self.size)
    }

    fn set_size(&mut self, size: Emu) -> EngineResult<()> {
        self.faults.check("set_size")?;
        self.size = Some(size);
        Ok(())
    }

    fn bold(&self) -> EngineResult<Option<bool>> {
        self.faults.read("bold", self.bold)
    }

    fn set_bold(&mut self, value: bool) -> EngineResult<()> {
        self.faults.check("set_bold")?;
        self.bold = Some(value);
        Ok(())
    }

    fn italic(&self) -> EngineResult<Option<bool>> {
        self.faults.read("italic", self.italic)
    }

    fn set_italic(&mut self, value: bool) -> EngineResult<()> {
        self.faults.check("set_italic")?;
        self.italic = Some(value);
        Ok(())
    }

    fn underline(&self) -> EngineResult<Option<NativeUnderline>> {
        self.faults.read("underline", self.underline)
    }

    fn set_underline(&mut self, value: Option<NativeUnderline>) -> EngineResult<()> {
        self.faults.check("set_underline")?;
        self.underline = value;
        Ok(())
    }

    fn color_rgb(&self) -> EngineResult<Option<[u8; 3]>> {
        self.faults.read("color_rgb", self.color)
    }

    fn set_color_rgb(&mut self, rgb: [u8; 3]) -> EngineResult<()> {
        self.faults.check("set_color_rgb")?;
        self.color = Some(rgb);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTable {
    pub column_widths: Vec<Emu>,
    pub row_heights: Vec<Emu>,
    pub flags: HashMap<TableFlag, bool>,
    pub cells: Vec<Vec<MemoryTextFrame>>,
    pub faults: Faults,
}

impl MemoryTable {
    /// A `rows` x `cols` grid splitting `geometry` evenly, with the header
    /// row and row banding switched on.
    pub fn new(rows: usize, cols: usize, geometry: Geometry) -> Self {
        let share = |total: Emu, parts: usize| total / parts.max(1) as Emu;
        Self {
            column_widths: vec![share(geometry.width, cols); cols],
            row_heights: vec![share(geometry.height, rows); rows],
            flags: HashMap::from([(TableFlag::FirstRow, true), (TableFlag::HorzBanding, true)]),
            cells: vec![vec![MemoryTextFrame::default(); cols]; rows],
            faults: Faults::new(),
        }
    }
}

fn out_of_range(what: &str, index: usize) -> EngineError {
    EngineError::Failed(format!("no {} at index {}", what, index))
}

impl EngineTable for MemoryTable {
    fn row_count(&self) -> usize {
        self.row_heights.len()
    }

    fn column_count(&self) -> usize {
        self.column_widths.len()
    }

    fn column_width(&self, col: usize) -> EngineResult<Emu> {
        self.faults.check("column_width")?;
        self.column_widths
            .get(col)
            .copied()
            .ok_or_else(|| out_of_range("column", col))
    }

    fn set_column_width(&mut self, col: usize, width: Emu) -> EngineResult<()> {
        self.faults.check("set_column_width")?;
        let slot = self
            .column_widths
            .get_mut(col)
            .ok_or_else(|| out_of_range("column", col))?;
        *slot = width;
        Ok(())
    }

    fn row_height(&self, row: usize) -> EngineResult<Emu> {
        self.faults.check("row_height")?;
        self.row_heights
            .get(row)
            .copied()
            .ok_or_else(|| out_of_range("row", row))
    }

    fn set_row_height(&mut self, row: usize, height: Emu) -> EngineResult<()> {
        self.faults.check("set_row_height")?;
        let slot = self
            .row_heights
            .get_mut(row)
            .ok_or_else(|| out_of_range("row", row))?;
        *slot = height;
        Ok(())
    }

    fn flag(&self, flag: TableFlag) -> EngineResult<Option<bool>> {
        self.faults.check("flag")?;
        Ok(Some(self.flags.get(&flag).copied().unwrap_or(false)))
    }

    fn set_flag(&mut self, flag: TableFlag, value: bool) -> EngineResult<()> {
        self.faults.check("set_flag")?;
        self.flags.insert(flag, value);
        Ok(())
    }

    fn cell_text_frame(&self, row: usize, col: usize) -> Option<&dyn EngineTextFrame> {
        self.cells
            .get(row)?
            .get(col)
            .map(|f| f as &dyn EngineTextFrame)
    }

    fn cell_text_frame_mut(&mut self, row: usize, col: usize) -> Option<&mut dyn EngineTextFrame> {
        self.cells
            .get_mut(row)?
            .get_mut(col)
            .map(|f| f as &mut dyn EngineTextFrame)
    }
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryChart {
    pub chart_type: NativeChartType,
    pub title: Option<String>,
    pub legend: Option<MemoryLegend>,
    pub style: Option<u8>,
    pub categories: Vec<String>,
    pub series: Vec<MemorySeries>,
    pub category_axis: MemoryAxis,
    pub value_axis: MemoryAxis,
    /// Embedded XLSX package.
    pub workbook: Option<Vec<u8>>,
    pub faults: Faults,
}

impl MemoryChart {
    /// A chart with no series and no workbook.
    pub fn empty(chart_type: NativeChartType) -> Self {
        Self {
            chart_type,
            title: None,
            legend: None,
            style: None,
            categories: Vec::new(),
            series: Vec::new(),
            category_axis: MemoryAxis::default(),
            value_axis: MemoryAxis::default(),
            workbook: None,
            faults: Faults::new(),
        }
    }

    /// A chart populated from `data`, with its workbook written.
    pub fn new(chart_type: NativeChartType, data: ChartPayload<'_>) -> EngineResult<Self> {
        let mut chart = Self::empty(chart_type);
        let (categories, series, workbook) = chart_data(data)?;
        chart.categories = categories;
        chart.series = series;
        chart.workbook = Some(workbook);
        Ok(chart)
    }

    fn has_axes(&self) -> bool {
        !matches!(
            self.chart_type,
            NativeChartType::Pie
                | NativeChartType::PieExploded
                | NativeChartType::Doughnut
                | NativeChartType::DoughnutExploded
        )
    }

    fn check_axis(&self, kind: AxisKind) -> EngineResult<()> {
        self.faults.check(kind.as_str())?;
        if self.has_axes() {
            Ok(())
        } else {
            Err(EngineError::Unsupported(format!(
                "{} on a {:?} chart",
                kind.as_str(),
                self.chart_type
            )))
        }
    }
}

/// `Sheet1!$B$2:$B$4` for `rows` data rows of column `col`.
fn column_range(col: u32, rows: usize) -> Option<String> {
    if rows == 0 {
        return None;
    }
    let letters = column_name(col);
    Some(format!(
        "{}!${}$2:${}${}",
        SHEET_NAME,
        letters,
        letters,
        rows + 1
    ))
}

fn data_row(index: usize) -> u32 {
    index as u32 + 2
}

type ChartData = (Vec<String>, Vec<MemorySeries>, Vec<u8>);

/// Lay `data` out the way a chart workbook stores it and build the matching
/// series. Category charts put labels in column A and one column per series;
/// XY series take two columns each, bubble series three.
fn chart_data(data: ChartPayload<'_>) -> EngineResult<ChartData> {
    let mut sheet = ChartSheetWriter::new();
    let mut categories = Vec::new();
    let mut series = Vec::new();

    match data {
        ChartPayload::Category(data) => {
            categories = data.categories.clone();
            let rows = data
                .series
                .iter()
                .map(|s| s.values.len())
                .chain([categories.len()])
                .max()
                .unwrap_or(0);

            for (r, label) in categories.iter().enumerate() {
                sheet.set(CellRef::new(1, data_row(r)), label.as_str());
            }
            for (j, source) in data.series.iter().enumerate() {
                let col = j as u32 + 2;
                sheet.set(CellRef::new(col, 1), source.name.as_str());
                for (r, value) in source.values.iter().enumerate() {
                    sheet.set(CellRef::new(col, data_row(r)), *value);
                }

                let mut target = MemorySeries::named(&source.name);
                target.values = source.values.clone();
                target.number_format = source.number_format.clone();
                if let Some(range) = column_range(1, categories.len()) {
                    target.formulas.insert(SeriesFormula::CategoryText, range);
                }
                if let Some(range) = column_range(col, rows) {
                    target.formulas.insert(SeriesFormula::Values, range);
                }
                series.push(target);
            }
        }
        ChartPayload::Xy(data) => {
            for (j, source) in data.series.iter().enumerate() {
                let (x_col, y_col) = (2 * j as u32 + 1, 2 * j as u32 + 2);
                sheet.set(CellRef::new(y_col, 1), source.name.as_str());
                for (r, point) in source.points.iter().enumerate() {
                    sheet.set(CellRef::new(x_col, data_row(r)), point.x);
                    sheet.set(CellRef::new(y_col, data_row(r)), point.y);
                }

                let ys: Vec<Option<f64>> = source.points.iter().map(|p| p.y).collect();
                let mut target = MemorySeries::named(&source.name);
                target.x_values = Some(source.points.iter().map(|p| p.x).collect());
                target.y_values = Some(ys.clone());
                target.values = ys;
                target.number_format = source.number_format.clone();
                let rows = source.points.len();
                for (which, col) in [(SeriesFormula::X, x_col), (SeriesFormula::Y, y_col)] {
                    if let Some(range) = column_range(col, rows) {
                        target.formulas.insert(which, range);
                    }
                }
                series.push(target);
            }
        }
        ChartPayload::Bubble(data) => {
            for (j, source) in data.series.iter().enumerate() {
                let base = 3 * j as u32;
                let (x_col, y_col, size_col) = (base + 1, base + 2, base + 3);
                sheet.set(CellRef::new(y_col, 1), source.name.as_str());
                for (r, point) in source.points.iter().enumerate() {
                    sheet.set(CellRef::new(x_col, data_row(r)), point.x);
                    sheet.set(CellRef::new(y_col, data_row(r)), point.y);
                    sheet.set(CellRef::new(size_col, data_row(r)), point.size);
                }

                let ys: Vec<Option<f64>> = source.points.iter().map(|p| p.y).collect();
                let mut target = MemorySeries::named(&source.name);
                target.x_values = Some(source.points.iter().map(|p| p.x).collect());
                target.y_values = Some(ys.clone());
                target.bubble_sizes = Some(source.points.iter().map(|p| p.size).collect());
                target.values = ys;
                target.number_format = source.number_format.clone();
                let rows = source.points.len();
                for (which, col) in [
                    (SeriesFormula::X, x_col),
                    (SeriesFormula::Y, y_col),
                    (SeriesFormula::BubbleSize, size_col),
                ] {
                    if let Some(range) = column_range(col, rows) {
                        target.formulas.insert(which, range);
                    }
                }
                series.push(target);
            }
        }
    }

    let workbook = sheet
        .to_bytes()
        .map_err(|e| EngineError::Failed(format!("chart workbook: {}", e)))?;
    Ok((categories, series, workbook))
}

impl EngineChart for MemoryChart {
    fn chart_type(&self) -> EngineResult<NativeChartType> {
        self.faults.read("chart_type", self.chart_type)
    }

    fn has_title(&self) -> EngineResult<bool> {
        self.faults.read("has_title", self.title.is_some())
    }

    fn title_text(&self) -> EngineResult<Option<String>> {
        self.faults.read("title_text", self.title.clone())
    }

    fn set_title(&mut self, text: &str) -> EngineResult<()> {
        self.faults.check("set_title")?;
        self.title = Some(text.to_string());
        Ok(())
    }

    fn has_legend(&self) -> EngineResult<bool> {
        self.faults.read("has_legend", self.legend.is_some())
    }

    fn set_has_legend(&mut self, value: bool) -> EngineResult<()> {
        self.faults.check("set_has_legend")?;
        if !value {
            self.legend = None;
        } else if self.legend.is_none() {
            self.legend = Some(MemoryLegend::default());
        }
        Ok(())
    }

    fn legend(&self) -> Option<&dyn EngineLegend> {
        self.legend.as_ref().map(|l| l as &dyn EngineLegend)
    }

    fn legend_mut(&mut self) -> Option<&mut dyn EngineLegend> {
        self.legend.as_mut().map(|l| l as &mut dyn EngineLegend)
    }

    fn style(&self) -> EngineResult<Option<u8>> {
        self.faults.read("style", self.style)
    }

    fn set_style(&mut self, style: u8) -> EngineResult<()> {
        self.faults.check("set_style")?;
        self.style = Some(style);
        Ok(())
    }

    fn categories(&self) -> EngineResult<Vec<String>> {
        self.faults.read("categories", self.categories.clone())
    }

    fn series_count(&self) -> usize {
        self.series.len()
    }

    fn series(&self, index: usize) -> Option<&dyn EngineSeries> {
        self.series.get(index).map(|s| s as &dyn EngineSeries)
    }

    fn series_mut(&mut self, index: usize) -> Option<&mut dyn EngineSeries> {
        self.series.get_mut(index).map(|s| s as &mut dyn EngineSeries)
    }

    fn axis(&self, kind: AxisKind) -> EngineResult<&dyn EngineAxis> {
        self.check_axis(kind)?;
        Ok(match kind {
            AxisKind::Category => &self.category_axis,
            AxisKind::Value => &self.value_axis,
        })
    }

    fn axis_mut(&mut self, kind: AxisKind) -> EngineResult<&mut dyn EngineAxis> {
        self.check_axis(kind)?;
        Ok(match kind {
            AxisKind::Category => &mut self.category_axis,
            AxisKind::Value => &mut self.value_axis,
        })
    }

    /// New series, categories and workbook. Data labels, axes and the legend
    /// fall back to their defaults; injected faults stay in place.
    fn replace_data(&mut self, data: ChartPayload<'_>) -> EngineResult<()> {
        self.faults.check("replace_data")?;
        let (categories, series, workbook) = chart_data(data)?;

        self.categories = categories;
        self.series = series;
        self.workbook = Some(workbook);
        for axis in [&mut self.category_axis, &mut self.value_axis] {
            *axis = MemoryAxis {
                faults: mem::take(&mut axis.faults),
                ..MemoryAxis::default()
            };
        }
        if let Some(legend) = self.legend.as_mut() {
            *legend = MemoryLegend {
                faults: mem::take(&mut legend.faults),
                ..MemoryLegend::default()
            };
        }
        Ok(())
    }

    fn workbook(&self) -> EngineResult<Option<Vec<u8>>> {
        self.faults.read("workbook", self.workbook.clone())
    }

    fn set_workbook(&mut self, bytes: Vec<u8>) -> EngineResult<()> {
        self.faults.check("set_workbook")?;
        self.workbook = Some(bytes);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySeries {
    pub name: Option<String>,
    pub values: Vec<Option<f64>>,
    /// Per-point storage; `None` for series that have none (category charts).
    pub x_values: Option<Vec<Option<f64>>>,
    pub y_values: Option<Vec<Option<f64>>>,
    pub bubble_sizes: Option<Vec<Option<f64>>>,
    pub formulas: HashMap<SeriesFormula, String>,
    pub number_format: Option<String>,
    pub data_labels: MemoryDataLabels,
    pub faults: Faults,
}

impl MemorySeries {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    fn points(&self, dimension: PointDimension) -> Option<&Vec<Option<f64>>> {
        match dimension {
            PointDimension::X => self.x_values.as_ref(),
            PointDimension::Y => self.y_values.as_ref(),
            PointDimension::BubbleSize => self.bubble_sizes.as_ref(),
        }
    }
}

impl EngineSeries for MemorySeries {
    fn name(&self) -> EngineResult<Option<String>> {
        self.faults.read("name", self.name.clone())
    }

    fn values(&self) -> EngineResult<Vec<Option<f64>>> {
        self.faults.read("values", self.values.clone())
    }

    fn point_count(&self, dimension: PointDimension) -> EngineResult<Option<usize>> {
        self.faults
            .check(&format!("point_count.{}", dimension.as_str()))?;
        Ok(self.points(dimension).map(Vec::len))
    }

    fn point_value(&self, dimension: PointDimension, index: usize) -> EngineResult<Option<f64>> {
        self.faults
            .check(&format!("point_value.{}", dimension.as_str()))?;
        Ok(self
            .points(dimension)
            .and_then(|points| points.get(index).copied().flatten()))
    }

    fn formula(&self, which: SeriesFormula) -> Option<String> {
        self.formulas.get(&which).cloned()
    }

    fn data_labels(&self) -> EngineResult<&dyn EngineDataLabels> {
        self.faults.check("data_labels")?;
        Ok(&self.data_labels)
    }

    fn data_labels_mut(&mut self) -> EngineResult<&mut dyn EngineDataLabels> {
        self.faults.check("data_labels")?;
        Ok(&mut self.data_labels)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDataLabels {
    pub number_format: Option<String>,
    pub number_format_is_linked: bool,
    pub position: Option<DataLabelPosition>,
    pub flags: HashMap<DataLabelFlag, bool>,
    pub faults: Faults,
}

impl Default for MemoryDataLabels {
    fn default() -> Self {
        Self {
            number_format: None,
            number_format_is_linked: true,
            position: None,
            flags: HashMap::new(),
            faults: Faults::new(),
        }
    }
}

impl EngineDataLabels for MemoryDataLabels {
    fn number_format(&self) -> EngineResult<Option<String>> {
        self.faults.read("number_format", self.number_format.clone())
    }

    fn set_number_format(&mut self, format: &str) -> EngineResult<()> {
        self.faults.check("set_number_format")?;
        self.number_format = Some(format.to_string());
        Ok(())
    }

    fn number_format_is_linked(&self) -> EngineResult<bool> {
        self.faults
            .read("number_format_is_linked", self.number_format_is_linked)
    }

    fn set_number_format_is_linked(&mut self, value: bool) -> EngineResult<()> {
        self.faults.check("set_number_format_is_linked")?;
        self.number_format_is_linked = value;
        Ok(())
    }

    fn position(&self) -> EngineResult<Option<DataLabelPosition>> {
        self.faults.read("position", self.position)
    }

    fn set_position(&mut self, position: DataLabelPosition) -> EngineResult<()> {
        self.faults.check("set_position")?;
        self.position = Some(position);
        Ok(())
    }

    fn flag(&self, flag: DataLabelFlag) -> EngineResult<Option<bool>> {
        self.faults.read(flag.as_str(), self.flags.get(&flag).copied())
    }

    fn set_flag(&mut self, flag: DataLabelFlag, value: bool) -> EngineResult<()> {
        self.faults.check(&format!("set_{}", flag.as_str()))?;
        self.flags.insert(flag, value);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryAxis {
    pub has_title: bool,
    pub title: Option<String>,
    pub major_tick_mark: Option<TickMark>,
    pub minor_tick_mark: Option<TickMark>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub major_unit: Option<f64>,
    pub minor_unit: Option<f64>,
    pub reverse_order: bool,
    pub tick_label_position: Option<TickLabelPosition>,
    pub major_gridlines: bool,
    pub minor_gridlines: bool,
    pub tick_label_number_format: Option<String>,
    pub tick_label_format_is_linked: bool,
    pub visible: bool,
    pub faults: Faults,
}

/// Automatic scaling, outside major ticks, labels next to the axis.
impl Default for MemoryAxis {
    fn default() -> Self {
        Self {
            has_title: false,
            title: None,
            major_tick_mark: Some(TickMark::Outside),
            minor_tick_mark: Some(TickMark::None),
            minimum: None,
            maximum: None,
            major_unit: None,
            minor_unit: None,
            reverse_order: false,
            tick_label_position: Some(TickLabelPosition::NextToAxis),
            major_gridlines: false,
            minor_gridlines: false,
            tick_label_number_format: Some("General".to_string()),
            tick_label_format_is_linked: true,
            visible: true,
            faults: Faults::new(),
        }
    }
}

impl MemoryAxis {
    fn scale_slot(&mut self, bound: ScaleBound) -> &mut Option<f64> {
        match bound {
            ScaleBound::Minimum => &mut self.minimum,
            ScaleBound::Maximum => &mut self.maximum,
            ScaleBound::MajorUnit => &mut self.major_unit,
            ScaleBound::MinorUnit => &mut self.minor_unit,
        }
    }
}

impl EngineAxis for MemoryAxis {
    fn has_title(&self) -> EngineResult<bool> {
        self.faults.read("has_title", self.has_title)
    }

    fn set_has_title(&mut self, value: bool) -> EngineResult<()> {
        self.faults.check("set_has_title")?;
        self.has_title = value;
        Ok(())
    }

    fn title_text(&self) -> EngineResult<Option<String>> {
        self.faults.read("title_text", self.title.clone())
    }

    fn set_title_text(&mut self, text: &str) -> EngineResult<()> {
        self.faults.check("set_title_text")?;
        self.has_title = true;
        self.title = Some(text.to_string());
        Ok(())
    }

    fn tick_mark(&self, tier: Tier) -> EngineResult<Option<TickMark>> {
        self.faults.check("tick_mark")?;
        Ok(match tier {
            Tier::Major => self.major_tick_mark,
            Tier::Minor => self.minor_tick_mark,
        })
    }

    fn set_tick_mark(&mut self, tier: Tier, mark: TickMark) -> EngineResult<()> {
        self.faults.check("set_tick_mark")?;
        match tier {
            Tier::Major => self.major_tick_mark = Some(mark),
            Tier::Minor => self.minor_tick_mark = Some(mark),
        }
        Ok(())
    }

    fn scale(&self, bound: ScaleBound) -> EngineResult<Option<f64>> {
        self.faults.check("scale")?;
        Ok(match bound {
            ScaleBound::Minimum => self.minimum,
            ScaleBound::Maximum => self.maximum,
            ScaleBound::MajorUnit => self.major_unit,
            ScaleBound::MinorUnit => self.minor_unit,
        })
    }

    fn set_scale(&mut self, bound: ScaleBound, value: f64) -> EngineResult<()> {
        self.faults.check("set_scale")?;
        *self.scale_slot(bound) = Some(value);
        Ok(())
    }

    fn reverse_order(&self) -> EngineResult<bool> {
        self.faults.read("reverse_order", self.reverse_order)
    }

    fn set_reverse_order(&mut self, value: bool) -> EngineResult<()> {
        self.faults.check("set_reverse_order")?;
        self.reverse_order = value;
        Ok(())
    }

    fn tick_label_position(&self) -> EngineResult<Option<TickLabelPosition>> {
        self.faults
            .read("tick_label_position", self.tick_label_position)
    }

    fn set_tick_label_position(&mut self, position: TickLabelPosition) -> EngineResult<()> {
        self.faults.check("set_tick_label_position")?;
        self.tick_label_position = Some(position);
        Ok(())
    }

    fn gridlines(&self, tier: Tier) -> EngineResult<bool> {
        self.faults.check("gridlines")?;
        Ok(match tier {
            Tier::Major => self.major_gridlines,
            Tier::Minor => self.minor_gridlines,
        })
    }

    fn set_gridlines(&mut self, tier: Tier, value: bool) -> EngineResult<()> {
        self.faults.check("set_gridlines")?;
        match tier {
            Tier::Major => self.major_gridlines = value,
            Tier::Minor => self.minor_gridlines = value,
        }
        Ok(())
    }

    fn tick_label_number_format(&self) -> EngineResult<Option<String>> {
        self.faults.read(
            "tick_label_number_format",
            self.tick_label_number_format.clone(),
        )
    }

    fn set_tick_label_number_format(&mut self, format: &str) -> EngineResult<()> {
        self.faults.check("set_tick_label_number_format")?;
        self.tick_label_number_format = Some(format.to_string());
        Ok(())
    }

    fn tick_label_format_is_linked(&self) -> EngineResult<bool> {
        self.faults.read(
            "tick_label_format_is_linked",
            self.tick_label_format_is_linked,
        )
    }

    fn set_tick_label_format_is_linked(&mut self, value: bool) -> EngineResult<()> {
        self.faults.check("set_tick_label_format_is_linked")?;
        self.tick_label_format_is_linked = value;
        Ok(())
    }

    fn visible(&self) -> EngineResult<bool> {
        self.faults.read("visible", self.visible)
    }

    fn set_visible(&mut self, value: bool) -> EngineResult<()> {
        self.faults.check("set_visible")?;
        self.visible = value;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryLegend {
    pub position: Option<LegendPosition>,
    pub include_in_layout: Option<bool>,
    pub faults: Faults,
}

impl Default for MemoryLegend {
    fn default() -> Self {
        Self {
            position: Some(LegendPosition::Right),
            include_in_layout: Some(true),
            faults: Faults::new(),
        }
    }
}

impl EngineLegend for MemoryLegend {
    fn position(&self) -> EngineResult<Option<LegendPosition>> {
        self.faults.read("position", self.position)
    }

    fn set_position(&mut self, position: LegendPosition) -> EngineResult<()> {
        self.faults.check("set_position")?;
        self.position = Some(position);
        Ok(())
    }

    fn include_in_layout(&self) -> EngineResult<Option<bool>> {
        self.faults.read("include_in_layout", self.include_in_layout)
    }

    fn set_include_in_layout(&mut self, value: bool) -> EngineResult<()> {
        self.faults.check("set_include_in_layout")?;
        self.include_in_layout = Some(value);
        Ok(())
    }
}
