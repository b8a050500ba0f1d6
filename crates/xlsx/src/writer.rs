//! Minimal chart-data workbook generation.
//!
//! Produces a valid single-sheet XLSX package named `Sheet1`, the layout
//! presentation engines embed behind a chart:
//!
//! ```text
//!     |    A     |    B     |    C     |
//! ----+----------+----------+----------+
//!   1 |          | Series 1 | Series 2 |
//!   2 | Cat 1    |   10.0   |   15.0   |
//!   3 | Cat 2    |   20.0   |   25.0   |
//! ```

use crate::sheet::SheetXml;
use crate::{CellRef, CellValue, Error, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the only sheet in a generated workbook.
pub const SHEET_NAME: &str = "Sheet1";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#;

const EMPTY_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#;

/// Builder for a single-sheet chart-data workbook.
#[derive(Debug, Clone, Default)]
pub struct ChartSheetWriter {
    cells: BTreeMap<CellRef, CellValue>,
}

impl ChartSheetWriter {
    /// Create an empty workbook builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell on `Sheet1`.
    pub fn set(&mut self, cell: CellRef, value: impl Into<CellValue>) -> &mut Self {
        self.cells.insert(cell, value.into());
        self
    }

    /// Produce the XLSX bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut sheet = SheetXml::parse(EMPTY_SHEET)?;
        for (cell, value) in &self.cells {
            sheet.set(*cell, value);
        }
        let sheet_xml = sheet.render();

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let parts: [(&str, &str); 6] = [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", ROOT_RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", &sheet_xml),
            ("xl/styles.xml", STYLES),
        ];

        for (name, body) in parts {
            zip.start_file(name, options)
                .map_err(|e| Error::ZipError(format!("Failed to write '{}': {}", name, e)))?;
            zip.write_all(body.as_bytes())?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WorkbookPackage;

    #[test]
    fn test_generated_workbook_reads_back() {
        let mut writer = ChartSheetWriter::new();
        writer
            .set(CellRef::new(2, 1), "Revenue")
            .set(CellRef::new(1, 2), "Q1")
            .set(CellRef::new(2, 2), 12.5)
            .set(CellRef::new(2, 3), CellValue::Empty);

        let package = WorkbookPackage::from_bytes(&writer.to_bytes().unwrap()).unwrap();
        assert!(package.has_sheet(SHEET_NAME));
        assert!(package.part("xl/styles.xml").is_some());

        let read = |col, row| package.cell_value(SHEET_NAME, CellRef::new(col, row)).unwrap();
        assert_eq!(read(2, 1), CellValue::Text("Revenue".into()));
        assert_eq!(read(1, 2), CellValue::Text("Q1".into()));
        assert_eq!(read(2, 2), CellValue::Number(12.5));
        assert_eq!(read(2, 3), CellValue::Empty);
        assert_eq!(read(5, 5), CellValue::Empty);
    }

    #[test]
    fn test_empty_workbook() {
        let bytes = ChartSheetWriter::new().to_bytes().unwrap();
        let package = WorkbookPackage::from_bytes(&bytes).unwrap();
        assert_eq!(package.sheets().len(), 1);
    }
}
