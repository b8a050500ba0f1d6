//! Embedded chart workbook editor.
//!
//! Charts in a presentation keep their source data in a small XLSX package.
//! This crate parses the cell references a chart series points at, reads and
//! rewrites individual cells of that package, and writes fresh chart-data
//! workbooks.

pub mod error;
pub mod package;
pub mod reference;
pub mod sheet;
pub mod writer;

pub use error::{Error, Result};
pub use package::WorkbookPackage;
pub use reference::{column_index, column_name, parse_reference, CellRef, RangeRef};
pub use sheet::CellValue;
pub use writer::ChartSheetWriter;
