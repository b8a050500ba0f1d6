//! Worksheet XML editing.
//!
//! A worksheet is split into the markup before `<sheetData>`, its rows, and
//! the markup after `</sheetData>`. Cells keep their original XML until they
//! are overwritten, so everything outside the touched cells is written back
//! exactly as it was read.

use crate::{CellRef, Error, Result};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::Write;

/// A cell value as read from, or written to, a worksheet.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Numeric value.
    Number(f64),
    /// Text value (shared, inline, or formula string).
    Text(String),
    /// Boolean value.
    Bool(bool),
    /// No value.
    Empty,
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(CellValue::Empty, CellValue::Number)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

/// Parsed worksheet with editable rows.
#[derive(Debug, Clone)]
pub(crate) struct SheetXml {
    /// Everything up to and including the `<sheetData>` start tag.
    head: String,
    /// Everything from the `</sheetData>` end tag onwards.
    tail: String,
    rows: Vec<RowXml>,
}

#[derive(Debug, Clone)]
struct RowXml {
    number: u32,
    /// Raw (still escaped) attributes other than `r`.
    attrs: Vec<(String, String)>,
    cells: Vec<CellXml>,
}

#[derive(Debug, Clone)]
struct CellXml {
    col: u32,
    style: Option<String>,
    raw: String,
}

impl SheetXml {
    /// Parse worksheet XML.
    pub(crate) fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut head: Option<String> = None;
        let mut tail: Option<String> = None;
        let mut rows: Vec<RowXml> = Vec::new();
        let mut current_row: Option<RowXml> = None;
        let mut open_cell: Option<(usize, u32, Option<String>)> = None;
        let mut last_row = 0u32;

        loop {
            let start = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| Error::XmlError(format!("Error parsing worksheet: {}", e)))?;
            let end = reader.buffer_position();

            match event {
                Event::Start(ref e) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"sheetData" if head.is_none() => {
                            head = Some(xml[..end].to_string());
                        }
                        b"row" if head.is_some() => {
                            current_row = Some(RowXml::from_start(e, last_row)?);
                        }
                        b"c" => {
                            if let Some(ref row) = current_row {
                                let (col, style) = cell_attributes(e, row)?;
                                open_cell = Some((start, col, style));
                            }
                        }
                        _ => {}
                    }
                }
                Event::Empty(ref e) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"sheetData" if head.is_none() => {
                            head = Some(format!("{}<sheetData>", &xml[..start]));
                            tail = Some(format!("</sheetData>{}", &xml[end..]));
                            break;
                        }
                        b"row" if head.is_some() => {
                            let row = RowXml::from_start(e, last_row)?;
                            last_row = row.number;
                            rows.push(row);
                        }
                        b"c" => {
                            if let Some(ref mut row) = current_row {
                                let (col, style) = cell_attributes(e, row)?;
                                row.cells.push(CellXml {
                                    col,
                                    style,
                                    raw: xml[start..end].to_string(),
                                });
                            }
                        }
                        _ => {}
                    }
                }
                Event::End(ref e) => {
                    let name = e.name();
                    match local_name(name.as_ref()) {
                        b"c" => {
                            if let (Some((cell_start, col, style)), Some(row)) =
                                (open_cell.take(), current_row.as_mut())
                            {
                                row.cells.push(CellXml {
                                    col,
                                    style,
                                    raw: xml[cell_start..end].to_string(),
                                });
                            }
                        }
                        b"row" => {
                            if let Some(row) = current_row.take() {
                                last_row = row.number;
                                rows.push(row);
                            }
                        }
                        b"sheetData" if head.is_some() => {
                            tail = Some(xml[start..].to_string());
                            break;
                        }
                        _ => {}
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let head = head.ok_or_else(|| Error::XmlError("worksheet has no sheetData".to_string()))?;
        let tail = tail.ok_or_else(|| Error::XmlError("unterminated sheetData".to_string()))?;

        rows.sort_by_key(|r| r.number);
        for row in &mut rows {
            row.cells.sort_by_key(|c| c.col);
        }

        Ok(Self { head, tail, rows })
    }

    /// Read a cell's value, resolving shared strings.
    pub(crate) fn value(&self, cell: CellRef, shared_strings: &[String]) -> Result<CellValue> {
        let found = self
            .rows
            .binary_search_by_key(&cell.row, |r| r.number)
            .ok()
            .and_then(|ri| {
                let row = &self.rows[ri];
                row.cells
                    .binary_search_by_key(&cell.col, |c| c.col)
                    .ok()
                    .map(|ci| &row.cells[ci])
            });

        match found {
            Some(c) => read_cell_value(&c.raw, shared_strings),
            None => Ok(CellValue::Empty),
        }
    }

    /// Overwrite (or insert) a single cell, keeping its style.
    pub(crate) fn set(&mut self, cell: CellRef, value: &CellValue) {
        let ri = match self.rows.binary_search_by_key(&cell.row, |r| r.number) {
            Ok(i) => i,
            Err(i) => {
                self.rows.insert(
                    i,
                    RowXml {
                        number: cell.row,
                        attrs: Vec::new(),
                        cells: Vec::new(),
                    },
                );
                i
            }
        };

        let row = &mut self.rows[ri];
        match row.cells.binary_search_by_key(&cell.col, |c| c.col) {
            Ok(ci) => {
                let existing = &mut row.cells[ci];
                existing.raw = render_cell(cell, existing.style.as_deref(), value);
            }
            Err(ci) => {
                // The spans hint no longer covers the row once a cell is added.
                row.attrs.retain(|(k, _)| k != "spans");
                row.cells.insert(
                    ci,
                    CellXml {
                        col: cell.col,
                        style: None,
                        raw: render_cell(cell, None, value),
                    },
                );
            }
        }
    }

    /// Serialize the worksheet back to XML.
    pub(crate) fn render(&self) -> String {
        let capacity = self.head.len() + self.tail.len() + 64 * self.rows.len();
        let mut out = String::with_capacity(capacity);
        out.push_str(&self.head);

        for row in &self.rows {
            let _ = write!(out, r#"<row r="{}""#, row.number);
            for (key, value) in &row.attrs {
                let _ = write!(out, r#" {}="{}""#, key, value);
            }
            if row.cells.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for cell in &row.cells {
                    out.push_str(&cell.raw);
                }
                out.push_str("</row>");
            }
        }

        out.push_str(&self.tail);
        out
    }
}

impl RowXml {
    fn from_start(e: &BytesStart<'_>, previous: u32) -> Result<Self> {
        let mut number = None;
        let mut attrs = Vec::new();

        for attr in e.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = String::from_utf8_lossy(&attr.value).to_string();
            if key == "r" {
                number = Some(
                    value
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| Error::XmlError(format!("invalid row number '{}'", value)))?,
                );
            } else {
                attrs.push((key, value));
            }
        }

        let number = match number {
            Some(number) => number,
            None => previous
                .checked_add(1)
                .ok_or_else(|| Error::XmlError(format!("row after {} out of range", previous)))?,
        };

        Ok(Self {
            number,
            attrs,
            cells: Vec::new(),
        })
    }
}

/// Column and style of a `<c>` element. Cells without `r` follow the previous cell.
fn cell_attributes(e: &BytesStart<'_>, row: &RowXml) -> Result<(u32, Option<String>)> {
    let mut col = None;
    let mut style = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => {
                let text = String::from_utf8_lossy(&attr.value);
                col = Some(CellRef::parse(&text)?.col);
            }
            b"s" => style = Some(String::from_utf8_lossy(&attr.value).to_string()),
            _ => {}
        }
    }

    let col = col.unwrap_or_else(|| row.cells.last().map_or(1, |c| c.col + 1));
    Ok((col, style))
}

fn render_cell(cell: CellRef, style: Option<&str>, value: &CellValue) -> String {
    let style = style
        .map(|s| format!(r#" s="{}""#, s))
        .unwrap_or_default();

    match value {
        CellValue::Number(n) if n.is_finite() => {
            format!(r#"<c r="{}"{}><v>{}</v></c>"#, cell, style, n)
        }
        CellValue::Text(text) => {
            let space = if text.trim() != text {
                r#" xml:space="preserve""#
            } else {
                ""
            };
            format!(
                r#"<c r="{}"{} t="inlineStr"><is><t{}>{}</t></is></c>"#,
                cell,
                style,
                space,
                escape(text.as_str())
            )
        }
        CellValue::Bool(b) => {
            format!(r#"<c r="{}"{} t="b"><v>{}</v></c>"#, cell, style, u8::from(*b))
        }
        CellValue::Number(_) | CellValue::Empty => format!(r#"<c r="{}"{}/>"#, cell, style),
    }
}

fn read_cell_value(raw: &str, shared_strings: &[String]) -> Result<CellValue> {
    let mut reader = Reader::from_str(raw);
    reader.trim_text(false);

    let mut kind: Option<String> = None;
    let mut value: Option<String> = None;
    let mut inline = String::new();
    let mut in_value = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"c" => {
                        kind = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"t")
                            .map(|a| String::from_utf8_lossy(&a.value).to_string());
                    }
                    b"v" => in_value = true,
                    b"t" => in_text = true,
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::XmlError(format!("Error reading cell text: {}", e)))?;
                if in_value {
                    value.get_or_insert_with(String::new).push_str(&text);
                } else if in_text {
                    inline.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"v" => in_value = false,
                    b"t" => in_text = false,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlError(format!("Error reading cell: {}", e))),
            _ => {}
        }
    }

    let parsed = match kind.as_deref() {
        Some("s") => value
            .as_deref()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .and_then(|idx| shared_strings.get(idx).cloned())
            .map_or(CellValue::Empty, CellValue::Text),
        Some("inlineStr") => CellValue::Text(inline),
        Some("str") | Some("e") => CellValue::Text(value.unwrap_or_default()),
        Some("b") => CellValue::Bool(value.as_deref().map(str::trim) == Some("1")),
        _ => match value {
            Some(v) => CellValue::Number(
                v.trim()
                    .parse::<f64>()
                    .map_err(|_| Error::XmlError(format!("invalid numeric cell value '{}'", v)))?,
            ),
            None => CellValue::Empty,
        },
    };

    Ok(parsed)
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:C3"/><sheetData><row r="1" spans="1:3"><c r="A1" t="s"><v>0</v></c><c r="B1" t="inlineStr"><is><t>Sales</t></is></c></row><row r="2"><c r="A2" t="inlineStr"><is><t>Q1</t></is></c><c r="B2" s="3"><v>10</v></c><c r="C2"><f>B2*2</f><v>20</v></c></row></sheetData><pageMargins left="0.7"/></worksheet>"#;

    fn cell(s: &str) -> CellRef {
        CellRef::parse(s).unwrap()
    }

    #[test]
    fn test_read_values() {
        let sheet = SheetXml::parse(SHEET).unwrap();
        let shared = vec!["Region".to_string()];

        assert_eq!(sheet.value(cell("A1"), &shared).unwrap(), CellValue::Text("Region".into()));
        assert_eq!(sheet.value(cell("B1"), &shared).unwrap(), CellValue::Text("Sales".into()));
        assert_eq!(sheet.value(cell("B2"), &shared).unwrap(), CellValue::Number(10.0));
        assert_eq!(sheet.value(cell("C2"), &shared).unwrap(), CellValue::Number(20.0));
        assert_eq!(sheet.value(cell("D9"), &shared).unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_row_number_overflow_is_an_error() {
        let xml = r#"<worksheet><sheetData><row r="4294967295"/><row/></sheetData></worksheet>"#;
        assert!(matches!(SheetXml::parse(xml), Err(Error::XmlError(_))));
    }

    #[test]
    fn test_unchanged_sheet_renders_same_content() {
        let sheet = SheetXml::parse(SHEET).unwrap();
        let rendered = sheet.render();
        assert!(rendered.starts_with(r#"<?xml version="1.0""#));
        assert!(rendered.contains(r#"<dimension ref="A1:C3"/>"#));
        assert!(rendered.contains(r#"<c r="C2"><f>B2*2</f><v>20</v></c>"#));
        assert!(rendered.ends_with(r#"<pageMargins left="0.7"/></worksheet>"#));
    }

    #[test]
    fn test_overwrite_keeps_style_and_drops_formula() {
        let mut sheet = SheetXml::parse(SHEET).unwrap();
        sheet.set(cell("B2"), &CellValue::Number(42.5));
        sheet.set(cell("C2"), &CellValue::Number(7.0));

        let rendered = sheet.render();
        assert!(rendered.contains(r#"<c r="B2" s="3"><v>42.5</v></c>"#));
        assert!(rendered.contains(r#"<c r="C2"><v>7</v></c>"#));
        assert!(!rendered.contains("<f>"));
    }

    #[test]
    fn test_insert_new_row_and_cell_in_order() {
        let mut sheet = SheetXml::parse(SHEET).unwrap();
        sheet.set(cell("B3"), &CellValue::Number(1.0));
        sheet.set(cell("C1"), &CellValue::Text("Costs & more".into()));

        let reparsed = SheetXml::parse(&sheet.render()).unwrap();
        assert_eq!(reparsed.value(cell("B3"), &[]).unwrap(), CellValue::Number(1.0));
        assert_eq!(
            reparsed.value(cell("C1"), &[]).unwrap(),
            CellValue::Text("Costs & more".into())
        );

        let rendered = sheet.render();
        let row2 = rendered.find(r#"<row r="2""#).unwrap();
        let row3 = rendered.find(r#"<row r="3""#).unwrap();
        assert!(row2 < row3);
        // Row 1 gained a cell, so its spans hint is dropped.
        assert!(!rendered.contains("spans="));
    }

    #[test]
    fn test_empty_sheet_data() {
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#;
        let mut sheet = SheetXml::parse(xml).unwrap();
        sheet.set(cell("A1"), &CellValue::Bool(true));

        let rendered = sheet.render();
        assert!(rendered.contains(r#"<sheetData><row r="1"><c r="A1" t="b"><v>1</v></c></row></sheetData>"#));
    }

    #[test]
    fn test_missing_sheet_data_is_error() {
        assert!(SheetXml::parse("<worksheet></worksheet>").is_err());
    }

    #[test]
    fn test_clear_cell() {
        let mut sheet = SheetXml::parse(SHEET).unwrap();
        sheet.set(cell("B2"), &CellValue::Empty);
        assert_eq!(sheet.value(cell("B2"), &[]).unwrap(), CellValue::Empty);
        assert!(sheet.render().contains(r#"<c r="B2" s="3"/>"#));
    }
}
