//! Table shapes: a grid of cells, each plain text or a full text frame.

use crate::engine::{EngineShape, EngineSlide, EngineTable, TableFlag};
use crate::json::{check_non_negative, JsonModel};
use crate::report::ApplyReport;
use crate::shape::{finish_shape, validate_placement, Placement};
use crate::text::TextFrameModel;
use crate::units::{emu_to_pt, pt_to_emu};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Content of one table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellContent {
    Text(String),
    Frame(TextFrameModel),
}

impl CellContent {
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Frame(frame) => frame.text(),
        }
    }
}

impl From<&str> for CellContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableModel {
    pub name: Option<String>,
    pub left_pt: f64,
    pub top_pt: f64,
    pub width_pt: f64,
    pub height_pt: f64,
    pub rotation: Option<f64>,

    /// Rows of cells. Rows may be ragged; the table is as wide as the longest.
    #[serde(default)]
    pub rows: Vec<Vec<CellContent>>,
    pub col_widths_pt: Option<Vec<f64>>,
    pub row_heights_pt: Option<Vec<f64>>,
    pub first_row: Option<bool>,
    pub last_row: Option<bool>,
    pub first_col: Option<bool>,
    pub last_col: Option<bool>,
    pub horz_banding: Option<bool>,
    pub vert_banding: Option<bool>,
}

impl TableModel {
    pub fn flag(&self, flag: TableFlag) -> Option<bool> {
        match flag {
            TableFlag::FirstRow => self.first_row,
            TableFlag::LastRow => self.last_row,
            TableFlag::FirstCol => self.first_col,
            TableFlag::LastCol => self.last_col,
            TableFlag::HorzBanding => self.horz_banding,
            TableFlag::VertBanding => self.vert_banding,
        }
    }

    fn flag_mut(&mut self, flag: TableFlag) -> &mut Option<bool> {
        match flag {
            TableFlag::FirstRow => &mut self.first_row,
            TableFlag::LastRow => &mut self.last_row,
            TableFlag::FirstCol => &mut self.first_col,
            TableFlag::LastCol => &mut self.last_col,
            TableFlag::HorzBanding => &mut self.horz_banding,
            TableFlag::VertBanding => &mut self.vert_banding,
        }
    }

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

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn from_engine(shape: &dyn EngineShape, table: &dyn EngineTable) -> Self {
        let placement = Placement::read(shape);

        let rows = (0..table.row_count())
            .map(|r| {
                (0..table.column_count())
                    .map(|c| match table.cell_text_frame(r, c) {
                        Some(frame) => CellContent::Frame(TextFrameModel::from_engine(frame)),
                        None => CellContent::Text(String::new()),
                    })
                    .collect()
            })
            .collect();

        let lengths = |count: usize, read: &dyn Fn(usize) -> Option<i64>| {
            (0..count)
                .map(|i| read(i).map(emu_to_pt).filter(|pt| *pt >= 0.0))
                .collect::<Option<Vec<f64>>>()
        };

        let mut model = Self {
            name: placement.name,
            left_pt: placement.left_pt,
            top_pt: placement.top_pt,
            width_pt: placement.width_pt,
            height_pt: placement.height_pt,
            rotation: placement.rotation,
            rows,
            col_widths_pt: lengths(table.column_count(), &|c| table.column_width(c).ok()),
            row_heights_pt: lengths(table.row_count(), &|r| table.row_height(r).ok()),
            first_row: None,
            last_row: None,
            first_col: None,
            last_col: None,
            horz_banding: None,
            vert_banding: None,
        };
        for flag in TableFlag::ALL {
            *model.flag_mut(flag) = table.flag(flag).ok().flatten();
        }
        model
    }

    /// Add this table to `slide`. An empty grid adds nothing.
    pub fn apply_to_slide(&self, slide: &mut dyn EngineSlide) -> Result<ApplyReport> {
        let mut report = ApplyReport::new();
        if self.rows.is_empty() {
            log::debug!("Skipping table without rows");
            return Ok(report);
        }

        let n_rows = self.rows.len();
        let n_cols = self.column_count();
        let placement = self.placement();
        let shape = slide.add_table(n_rows, n_cols, placement.geometry())?;

        if let Some(table) = shape.table_mut() {
            self.fill(table, &mut report);
        }
        finish_shape(shape, &placement, &mut report);

        Ok(report)
    }

    fn fill(&self, table: &mut dyn EngineTable, report: &mut ApplyReport) {
        let n_rows = table.row_count();
        let n_cols = table.column_count();

        match &self.col_widths_pt {
            Some(widths) if widths.len() == n_cols => {
                for (c, width) in widths.iter().enumerate() {
                    report.record(
                        &format!("col_widths_pt[{}]", c),
                        table.set_column_width(c, pt_to_emu(*width)),
                    );
                }
            }
            Some(widths) => log::debug!(
                "Ignoring {} column widths for a {}-column table",
                widths.len(),
                n_cols
            ),
            None => {}
        }

        for flag in TableFlag::ALL {
            if let Some(value) = self.flag(flag) {
                report.record(flag.as_str(), table.set_flag(flag, value));
            }
        }

        match &self.row_heights_pt {
            Some(heights) if heights.len() == n_rows => {
                for (r, height) in heights.iter().enumerate() {
                    report.record(
                        &format!("row_heights_pt[{}]", r),
                        table.set_row_height(r, pt_to_emu(*height)),
                    );
                }
            }
            Some(heights) => log::debug!(
                "Ignoring {} row heights for a {}-row table",
                heights.len(),
                n_rows
            ),
            None => {}
        }

        for (r, row) in self.rows.iter().enumerate() {
            for (c, content) in row.iter().enumerate() {
                let field = format!("rows[{}][{}]", r, c);
                let Some(frame) = table.cell_text_frame_mut(r, c) else {
                    log::debug!("Table has no cell at {}", field);
                    continue;
                };
                match content {
                    CellContent::Text(text) => {
                        report.record(&field, frame.set_text(text));
                    }
                    CellContent::Frame(model) => report.absorb(&field, model.apply_to(frame)),
                }
            }
        }
    }
}

impl JsonModel for TableModel {
    fn validate(&self) -> Result<()> {
        validate_placement(
            self.left_pt,
            self.top_pt,
            self.width_pt,
            self.height_pt,
            self.rotation,
        )?;
        for width in self.col_widths_pt.iter().flatten() {
            check_non_negative("col_widths_pt", *width)?;
        }
        for height in self.row_heights_pt.iter().flatten() {
            check_non_negative("row_heights_pt", *height)?;
        }
        for content in self.rows.iter().flatten() {
            if let CellContent::Frame(frame) = content {
                frame.validate()?;
            }
        }
        Ok(())
    }
}
