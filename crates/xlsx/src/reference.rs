//! A1-style cell references and sheet-qualified ranges.
//!
//! Chart series store their source as formulas like `Sheet1!$B$2:$B$5`.
//! [`parse_reference`] turns such a formula into the sheet name and the
//! row-major list of cells it covers.

use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Regex for a single A1 cell, with optional `$` anchors.
static CELL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]{1,7})$").unwrap());

/// Largest column index Excel accepts (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

/// Largest row index Excel accepts.
pub const MAX_ROW: u32 = 1_048_576;

/// Upper bound on the number of cells a single range may expand to.
const MAX_RANGE_CELLS: u64 = 1_000_000;

/// A single cell position. Both coordinates are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    /// 1-based row number.
    pub row: u32,
    /// 1-based column number (`A` = 1).
    pub col: u32,
}

impl CellRef {
    /// Create a cell reference from 1-based column and row numbers.
    pub fn new(col: u32, row: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1-style reference such as `B2` or `$B$2`.
    pub fn parse(text: &str) -> Result<Self> {
        let caps = CELL_REGEX
            .captures(text.trim())
            .ok_or_else(|| Error::InvalidReference(text.to_string()))?;

        let col = column_index(&caps[1]).ok_or_else(|| Error::InvalidReference(text.to_string()))?;
        let row: u32 = caps[2]
            .parse()
            .map_err(|_| Error::InvalidReference(text.to_string()))?;

        if row == 0 || row > MAX_ROW || col > MAX_COLUMN {
            return Err(Error::InvalidReference(text.to_string()));
        }

        Ok(Self { row, col })
    }

    /// Column letters for this cell (`B` for column 2).
    pub fn column_name(&self) -> String {
        column_name(self.col)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_name(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A sheet-qualified list of cells, in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    /// Sheet name with any quoting removed.
    pub sheet: String,
    /// Cells covered by the reference, row by row, left to right.
    pub cells: Vec<CellRef>,
}

impl RangeRef {
    /// Cell addresses as A1 strings.
    pub fn addresses(&self) -> Vec<String> {
        self.cells.iter().map(CellRef::to_string).collect()
    }
}

/// Convert column letters to a 1-based index (`A` = 1, `AA` = 27).
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }

    let mut index: u32 = 0;
    for c in letters.chars() {
        if c == '$' {
            continue;
        }
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A' + 1) as u32;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }

    if index == 0 {
        None
    } else {
        Some(index)
    }
}

/// Convert a 1-based column index to its letters (1 = `A`, 27 = `AA`).
pub fn column_name(index: u32) -> String {
    let mut result = String::new();
    let mut n = index;

    while n > 0 {
        let remainder = ((n - 1) % 26) as u8;
        result.insert(0, (b'A' + remainder) as char);
        n = (n - 1) / 26;
    }

    result
}

/// Parse a formula reference like `Sheet1!$B$2:$B$5` into a [`RangeRef`].
///
/// Both single cells and rectangles are accepted. A rectangle expands over
/// its normalized bounds, so `D2:B2` yields the same cells as `B2:D2`.
pub fn parse_reference(formula: &str) -> Result<RangeRef> {
    let text = formula.trim();
    let (sheet, range) = text
        .rsplit_once('!')
        .ok_or_else(|| Error::InvalidReference(format!("missing sheet name in '{}'", formula)))?;

    let sheet = unquote_sheet(sheet.trim());
    if sheet.is_empty() {
        return Err(Error::InvalidReference(format!(
            "empty sheet name in '{}'",
            formula
        )));
    }

    let cells = match range.split_once(':') {
        None => vec![CellRef::parse(range)?],
        Some((first, second)) => {
            let a = CellRef::parse(first)?;
            let b = CellRef::parse(second)?;
            expand_rectangle(a, b)?
        }
    };

    Ok(RangeRef { sheet, cells })
}

/// Remove surrounding single quotes from a sheet name, undoing `''` escapes.
fn unquote_sheet(sheet: &str) -> String {
    match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(inner) => inner.replace("''", "'"),
        None => sheet.to_string(),
    }
}

fn expand_rectangle(a: CellRef, b: CellRef) -> Result<Vec<CellRef>> {
    let (row_lo, row_hi) = (a.row.min(b.row), a.row.max(b.row));
    let (col_lo, col_hi) = (a.col.min(b.col), a.col.max(b.col));

    let count = u64::from(row_hi - row_lo + 1) * u64::from(col_hi - col_lo + 1);
    if count > MAX_RANGE_CELLS {
        return Err(Error::InvalidReference(format!(
            "range {}:{} covers {} cells",
            a, b, count
        )));
    }

    let mut cells = Vec::with_capacity(count as usize);
    for row in row_lo..=row_hi {
        for col in col_lo..=col_hi {
            cells.push(CellRef::new(col, row));
        }
    }
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index_and_name() {
        assert_eq!(column_index("A"), Some(1));
        assert_eq!(column_index("z"), Some(26));
        assert_eq!(column_index("AA"), Some(27));
        assert_eq!(column_index("$B"), Some(2));
        assert_eq!(column_index("XFD"), Some(16_384));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);

        assert_eq!(column_name(1), "A");
        assert_eq!(column_name(26), "Z");
        assert_eq!(column_name(27), "AA");
        assert_eq!(column_name(16_384), "XFD");
    }

    #[test]
    fn test_cell_parse() {
        assert_eq!(CellRef::parse("B2").unwrap(), CellRef::new(2, 2));
        assert_eq!(CellRef::parse("$C$10").unwrap(), CellRef::new(3, 10));
        assert_eq!(CellRef::parse("aa3").unwrap().to_string(), "AA3");
        assert!(CellRef::parse("B0").is_err());
        assert!(CellRef::parse("2B").is_err());
        assert!(CellRef::parse("").is_err());
    }

    #[test]
    fn test_parse_row_range() {
        let range = parse_reference("Sheet1!$B$2:$D$2").unwrap();
        assert_eq!(range.sheet, "Sheet1");
        assert_eq!(range.addresses(), vec!["B2", "C2", "D2"]);
    }

    #[test]
    fn test_parse_reversed_corners() {
        let forward = parse_reference("Sheet1!B2:D2").unwrap();
        let reversed = parse_reference("Sheet1!D2:B2").unwrap();
        assert_eq!(forward, reversed);
        assert_eq!(reversed.addresses(), vec!["B2", "C2", "D2"]);
    }

    #[test]
    fn test_parse_rectangle_is_row_major() {
        let range = parse_reference("Data!$C$3:$B$2").unwrap();
        assert_eq!(range.addresses(), vec!["B2", "C2", "B3", "C3"]);
    }

    #[test]
    fn test_parse_single_cell() {
        let range = parse_reference("Sheet1!$B$1").unwrap();
        assert_eq!(range.addresses(), vec!["B1"]);
    }

    #[test]
    fn test_parse_quoted_sheet() {
        let range = parse_reference("'Q1 ''Sales'''!$A$2:$A$3").unwrap();
        assert_eq!(range.sheet, "Q1 'Sales'");
        assert_eq!(range.addresses(), vec!["A2", "A3"]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_reference("").is_err());
        assert!(parse_reference("$B$2:$B$5").is_err());
        assert!(parse_reference("Sheet1!").is_err());
        assert!(parse_reference("Sheet1!B2:??").is_err());
        assert!(parse_reference("!A1").is_err());
    }

    #[test]
    fn test_parse_rejects_huge_range() {
        assert!(parse_reference("Sheet1!A1:XFD1048576").is_err());
    }
}
