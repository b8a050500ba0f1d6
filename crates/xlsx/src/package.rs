//! XLSX package loading and saving.

use crate::sheet::{local_name, SheetXml};
use crate::{CellRef, CellValue, Error, RangeRef, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// A sheet listed in `xl/workbook.xml`, resolved to its worksheet part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    /// Sheet name as shown on the tab.
    pub name: String,
    /// Worksheet part path inside the package.
    pub part: String,
}

/// An XLSX package held in memory, with per-cell editing.
///
/// Every part is kept as read. Only worksheets touched through
/// [`WorkbookPackage::set_cell`] are re-serialized by
/// [`WorkbookPackage::to_bytes`].
#[derive(Debug, Clone)]
pub struct WorkbookPackage {
    /// Parts in archive order.
    parts: Vec<(String, Vec<u8>)>,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    /// Edited worksheets keyed by part path.
    edited: BTreeMap<String, SheetXml>,
}

impl WorkbookPackage {
    /// Load a package from XLSX bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            parts.push((name, buf));
        }

        let mut package = Self {
            parts,
            sheets: Vec::new(),
            shared_strings: Vec::new(),
            edited: BTreeMap::new(),
        };

        let workbook_xml = package
            .part_text(WORKBOOK_PART)?
            .ok_or_else(|| Error::MissingPart(WORKBOOK_PART.to_string()))?;
        let declared = parse_workbook_sheets(&workbook_xml)?;

        let targets = match package.part_text(WORKBOOK_RELS_PART)? {
            Some(rels) => parse_relationships(&rels)?,
            None => HashMap::new(),
        };

        for sheet in declared {
            let part = sheet
                .rel_id
                .as_ref()
                .and_then(|id| targets.get(id))
                .map(|target| resolve_target(target))
                .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", sheet.sheet_id));

            if package.part(&part).is_none() {
                log::debug!("Sheet '{}' points at missing part {}", sheet.name, part);
                continue;
            }
            package.sheets.push(SheetEntry {
                name: sheet.name,
                part,
            });
        }

        if let Some(shared) = package.part_text(SHARED_STRINGS_PART)? {
            package.shared_strings = parse_shared_strings(&shared)?;
        }

        Ok(package)
    }

    /// Sheets in workbook order.
    pub fn sheets(&self) -> &[SheetEntry] {
        &self.sheets
    }

    /// Whether a sheet with this exact name exists.
    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets.iter().any(|s| s.name == name)
    }

    /// Raw bytes of a part, if present.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        let name = name.strip_prefix('/').unwrap_or(name);
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// Read a cell value from a sheet.
    pub fn cell_value(&self, sheet: &str, cell: CellRef) -> Result<CellValue> {
        let part = self.sheet_part(sheet)?;
        match self.edited.get(&part) {
            Some(xml) => xml.value(cell, &self.shared_strings),
            None => self.load_sheet(&part)?.value(cell, &self.shared_strings),
        }
    }

    /// Write a single cell value.
    pub fn set_cell(&mut self, sheet: &str, cell: CellRef, value: &CellValue) -> Result<()> {
        let part = self.sheet_part(sheet)?;
        if !self.edited.contains_key(&part) {
            let parsed = self.load_sheet(&part)?;
            self.edited.insert(part.clone(), parsed);
        }
        if let Some(xml) = self.edited.get_mut(&part) {
            xml.set(cell, value);
        }
        Ok(())
    }

    /// Write `values` into the cells of `range`, in order.
    ///
    /// Only `min(cells, values)` cells are written: surplus values are
    /// dropped and surplus cells keep whatever they held before.
    /// Returns the number of cells written.
    pub fn write_cells(&mut self, range: &RangeRef, values: &[CellValue]) -> Result<usize> {
        if !self.has_sheet(&range.sheet) {
            return Err(Error::UnknownSheet(range.sheet.clone()));
        }

        let count = range.cells.len().min(values.len());
        for (cell, value) in range.cells.iter().zip(values) {
            self.set_cell(&range.sheet, *cell, value)?;
        }

        if range.cells.len() != values.len() {
            log::debug!(
                "Range on '{}' has {} cells for {} values; wrote {}",
                range.sheet,
                range.cells.len(),
                values.len(),
                count
            );
        }
        Ok(count)
    }

    /// Serialize the package back to XLSX bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, bytes) in &self.parts {
            zip.start_file(name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to write '{}': {}", name, e)))?;
            match self.edited.get(name) {
                Some(sheet) => zip.write_all(sheet.render().as_bytes())?,
                None => zip.write_all(bytes)?,
            }
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }

    fn sheet_part(&self, sheet: &str) -> Result<String> {
        self.sheets
            .iter()
            .find(|s| s.name == sheet)
            .map(|s| s.part.clone())
            .ok_or_else(|| Error::UnknownSheet(sheet.to_string()))
    }

    fn load_sheet(&self, part: &str) -> Result<SheetXml> {
        let text = self
            .part_text(part)?
            .ok_or_else(|| Error::MissingPart(part.to_string()))?;
        SheetXml::parse(&text)
    }

    fn part_text(&self, name: &str) -> Result<Option<String>> {
        match self.part(name) {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| Error::XmlError(format!("'{}' is not UTF-8: {}", name, e))),
            None => Ok(None),
        }
    }
}

#[derive(Debug)]
struct DeclaredSheet {
    name: String,
    sheet_id: String,
    rel_id: Option<String>,
}

fn parse_workbook_sheets(xml: &str) -> Result<Vec<DeclaredSheet>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let name = e.name();
                if local_name(name.as_ref()) != b"sheet" {
                    continue;
                }

                let mut sheet = DeclaredSheet {
                    name: String::new(),
                    sheet_id: String::new(),
                    rel_id: None,
                };
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map_err(|e| Error::XmlError(format!("Error reading sheet entry: {}", e)))?
                        .to_string();
                    match attr.key.as_ref() {
                        b"name" => sheet.name = value,
                        b"sheetId" => sheet.sheet_id = value,
                        key if local_name(key) == b"id" => sheet.rel_id = Some(value),
                        _ => {}
                    }
                }
                sheets.push(sheet);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing workbook: {}", e)));
            }
            _ => {}
        }
    }

    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let mut id = String::new();
                let mut target = String::new();

                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = String::from_utf8_lossy(&attr.value).to_string(),
                        b"Target" => target = String::from_utf8_lossy(&attr.value).to_string(),
                        _ => {}
                    }
                }
                targets.insert(id, target);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(targets)
}

/// Resolve a relationship target relative to `xl/workbook.xml`.
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        format!("xl/{}", target.trim_start_matches("./"))
    }
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"si" => current.clear(),
                    b"rPh" => phonetic_depth += 1,
                    b"t" if phonetic_depth == 0 => in_text = true,
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"si" {
                    strings.push(String::new());
                }
            }
            Ok(Event::Text(ref e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::XmlError(format!("Error reading shared string: {}", e)))?;
                current.push_str(&text);
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"si" => strings.push(std::mem::take(&mut current)),
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"t" => in_text = false,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing shared strings: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(strings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_reference, ChartSheetWriter};

    fn sample() -> Vec<u8> {
        let mut writer = ChartSheetWriter::new();
        writer.set(CellRef::new(2, 1), "Sales");
        for (i, v) in [10.0, 20.0, 30.0, 40.0, 50.0].iter().enumerate() {
            writer.set(CellRef::new(2, i as u32 + 2), *v);
        }
        writer.to_bytes().unwrap()
    }

    /// A package whose workbook uses shared strings and a renamed sheet part.
    fn shared_string_package() -> Vec<u8> {
        let parts: [(&str, &str); 4] = [
            (
                "xl/workbook.xml",
                r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Data &amp; Notes" sheetId="4" r:id="rId7"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/data.xml"/></Relationships>"#,
            ),
            (
                "xl/worksheets/data.xml",
                r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="s"><v>1</v></c></row></sheetData></worksheet>"#,
            ),
            (
                "xl/sharedStrings.xml",
                r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><si><t>zero</t></si><si><r><t>on</t></r><r><t>e</t></r><rPh><t>ignored</t></rPh></si></sst>"#,
            ),
        ];

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            zip.start_file(name, FileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_load_resolves_sheets() {
        let package = WorkbookPackage::from_bytes(&sample()).unwrap();
        assert_eq!(package.sheets().len(), 1);
        assert_eq!(package.sheets()[0].name, "Sheet1");
        assert_eq!(package.sheets()[0].part, "xl/worksheets/sheet1.xml");
        assert!(package.has_sheet("Sheet1"));
        assert!(!package.has_sheet("sheet1"));
    }

    #[test]
    fn test_shared_strings_and_relationship_targets() {
        let package = WorkbookPackage::from_bytes(&shared_string_package()).unwrap();
        assert_eq!(package.sheets()[0].name, "Data & Notes");
        assert_eq!(package.sheets()[0].part, "xl/worksheets/data.xml");
        assert_eq!(
            package.cell_value("Data & Notes", CellRef::new(1, 1)).unwrap(),
            CellValue::Text("one".into())
        );
    }

    #[test]
    fn test_write_fewer_values_than_cells() {
        let mut package = WorkbookPackage::from_bytes(&sample()).unwrap();
        let range = parse_reference("Sheet1!$B$2:$B$6").unwrap();
        let values: Vec<CellValue> = vec![1.0f64.into(), 2.0f64.into(), 3.0f64.into()];

        let written = package.write_cells(&range, &values).unwrap();
        assert_eq!(written, 3);

        let reloaded = WorkbookPackage::from_bytes(&package.to_bytes().unwrap()).unwrap();
        let read = |row| reloaded.cell_value("Sheet1", CellRef::new(2, row)).unwrap();
        assert_eq!(read(2), CellValue::Number(1.0));
        assert_eq!(read(3), CellValue::Number(2.0));
        assert_eq!(read(4), CellValue::Number(3.0));
        // Surplus cells keep their old values.
        assert_eq!(read(5), CellValue::Number(40.0));
        assert_eq!(read(6), CellValue::Number(50.0));
    }

    #[test]
    fn test_write_more_values_than_cells() {
        let mut package = WorkbookPackage::from_bytes(&sample()).unwrap();
        let range = parse_reference("Sheet1!$B$2:$B$3").unwrap();
        let values: Vec<CellValue> = vec![7.0f64.into(), 8.0f64.into(), 9.0f64.into()];

        assert_eq!(package.write_cells(&range, &values).unwrap(), 2);
        assert_eq!(
            package.cell_value("Sheet1", CellRef::new(2, 4)).unwrap(),
            CellValue::Number(30.0)
        );
    }

    #[test]
    fn test_unknown_sheet() {
        let mut package = WorkbookPackage::from_bytes(&sample()).unwrap();
        let range = parse_reference("Missing!$B$2").unwrap();
        assert!(matches!(
            package.write_cells(&range, &[CellValue::Number(1.0)]),
            Err(Error::UnknownSheet(_))
        ));
    }

    #[test]
    fn test_untouched_parts_survive() {
        let original = sample();
        let mut package = WorkbookPackage::from_bytes(&original).unwrap();
        package
            .set_cell("Sheet1", CellRef::new(2, 2), &CellValue::Number(99.0))
            .unwrap();

        let reloaded = WorkbookPackage::from_bytes(&package.to_bytes().unwrap()).unwrap();
        let before = WorkbookPackage::from_bytes(&original).unwrap();
        assert_eq!(reloaded.part("xl/styles.xml"), before.part("xl/styles.xml"));
        assert_eq!(reloaded.part("/xl/workbook.xml"), before.part("xl/workbook.xml"));
    }

    #[test]
    fn test_corrupt_blob() {
        assert!(matches!(
            WorkbookPackage::from_bytes(b"not a zip"),
            Err(Error::ZipError(_))
        ));
    }
}
