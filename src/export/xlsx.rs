//! XLSX Workbook Writer
//! Generates a single-sheet Excel workbook.
//!
//! Uses direct ZIP/XML generation: the package holds only the parts a
//! spreadsheet reader needs, and every text cell is an inline string so no
//! shared string table is required.

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::io::{Cursor, Write};
use ::zip::write::FileOptions;
use ::zip::ZipWriter;

pub const SHEET_NAME: &str = "Sheet1";

/// Cell values of one column, converted once up front.
enum CellColumn {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

/// XLSX generator for cleaned data
pub struct XlsxWriter;

impl XlsxWriter {
    /// Serialize a DataFrame to workbook bytes: header row, then one row per record.
    pub fn write_to_bytes(df: &DataFrame) -> Result<Vec<u8>> {
        let columns = df
            .get_columns()
            .iter()
            .map(Self::cell_column)
            .collect::<Result<Vec<_>>>()?;
        let headers: Vec<String> = df
            .get_columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let sheet = Self::sheet_xml(&headers, &columns, df.height())?;

        Self::package(&sheet).map_err(|e| PipelineError::Serialization {
            format: "xlsx",
            message: e.to_string(),
        })
    }

    fn package(sheet_xml: &str) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        // 1. [Content_Types].xml
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(Self::content_types_xml().as_bytes())?;

        // 2. _rels/.rels
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(Self::rels_xml().as_bytes())?;

        // 3. xl/workbook.xml and its relationships
        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(Self::workbook_xml().as_bytes())?;
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(Self::workbook_rels_xml().as_bytes())?;

        // 4. The sheet
        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        zip.write_all(sheet_xml.as_bytes())?;

        // 5. docProps
        zip.start_file("docProps/core.xml", options)?;
        zip.write_all(Self::core_props_xml().as_bytes())?;
        zip.start_file("docProps/app.xml", options)?;
        zip.write_all(Self::app_props_xml().as_bytes())?;

        Ok(zip.finish()?.into_inner())
    }

    fn cell_column(column: &Column) -> Result<CellColumn> {
        let dtype = column.dtype();
        let unsupported = || PipelineError::Serialization {
            format: "xlsx",
            message: format!("column '{}' has unsupported type {}", column.name(), dtype),
        };

        if dtype.is_nested() || matches!(dtype, DataType::Binary | DataType::BinaryOffset) {
            return Err(unsupported());
        }

        let cells = if dtype.is_integer() {
            let cast = column.cast(&DataType::Int64)?;
            CellColumn::Int(cast.i64()?.into_iter().collect())
        } else if dtype.is_float() {
            let cast = column.cast(&DataType::Float64)?;
            CellColumn::Float(cast.f64()?.into_iter().collect())
        } else if dtype == &DataType::Boolean {
            CellColumn::Bool(column.bool()?.into_iter().collect())
        } else {
            // Temporal, categorical, decimal and text columns are written as their text rendering
            let cast = column
                .cast(&DataType::String)
                .map_err(|_| unsupported())?;
            CellColumn::Text(
                cast.str()?
                    .into_iter()
                    .map(|v| v.map(str::to_string))
                    .collect(),
            )
        };
        Ok(cells)
    }

    fn sheet_xml(headers: &[String], columns: &[CellColumn], height: usize) -> Result<String> {
        let mut rows = String::new();

        rows.push_str(r#"<row r="1">"#);
        for (col_idx, name) in headers.iter().enumerate() {
            Self::push_text_cell(&mut rows, &Self::cell_ref(col_idx, 1), name)?;
        }
        rows.push_str("</row>\n");

        for row_idx in 0..height {
            let row_num = row_idx + 2;
            rows.push_str(&format!(r#"<row r="{}">"#, row_num));
            for (col_idx, column) in columns.iter().enumerate() {
                let cell_ref = Self::cell_ref(col_idx, row_num);
                match column {
                    CellColumn::Int(values) => {
                        if let Some(v) = values[row_idx] {
                            rows.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, v));
                        }
                    }
                    CellColumn::Float(values) => match values[row_idx] {
                        // Spreadsheets have no NaN; leave the cell empty like a missing value
                        Some(v) if v.is_nan() => {}
                        Some(v) if v.is_infinite() => {
                            return Err(PipelineError::Serialization {
                                format: "xlsx",
                                message: format!(
                                    "infinite value in column '{}' row {}",
                                    headers[col_idx],
                                    row_idx + 1
                                ),
                            });
                        }
                        Some(v) => {
                            rows.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, v));
                        }
                        None => {}
                    },
                    CellColumn::Bool(values) => {
                        if let Some(v) = values[row_idx] {
                            rows.push_str(&format!(
                                r#"<c r="{}" t="b"><v>{}</v></c>"#,
                                cell_ref,
                                u8::from(v)
                            ));
                        }
                    }
                    CellColumn::Text(values) => {
                        if let Some(v) = &values[row_idx] {
                            Self::push_text_cell(&mut rows, &cell_ref, v)?;
                        }
                    }
                }
            }
            rows.push_str("</row>\n");
        }

        Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheetData>
{}</sheetData>
</worksheet>"#,
            rows
        ))
    }

    fn push_text_cell(out: &mut String, cell_ref: &str, text: &str) -> Result<()> {
        let escaped = Self::escape_xml(text)?;
        out.push_str(&format!(
            r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            cell_ref, escaped
        ));
        Ok(())
    }

    /// Escape text for XML. Control characters cannot appear in XML 1.0 at all.
    fn escape_xml(text: &str) -> Result<String> {
        let mut escaped = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                '"' => escaped.push_str("&quot;"),
                '\'' => escaped.push_str("&apos;"),
                '\t' | '\n' | '\r' => escaped.push(ch),
                c if c.is_control() && (c as u32) < 0x20 => {
                    return Err(PipelineError::Serialization {
                        format: "xlsx",
                        message: format!("control character U+{:04X} cannot be stored", c as u32),
                    });
                }
                c => escaped.push(c),
            }
        }
        Ok(escaped)
    }

    /// `A1`-style reference for a zero-based column and one-based row.
    fn cell_ref(col_idx: usize, row_num: usize) -> String {
        let mut letters = Vec::new();
        let mut n = col_idx + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        letters.reverse();
        format!("{}{}", String::from_utf8_lossy(&letters), row_num)
    }

    fn content_types_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
</Types>"#
    }

    fn rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#
    }

    fn workbook_xml() -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
            SHEET_NAME
        )
    }

    fn workbook_rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#
    }

    fn core_props_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:creator>tabclean</dc:creator>
<cp:lastModifiedBy>tabclean</cp:lastModifiedBy>
</cp:coreProperties>"#
    }

    fn app_props_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
<Application>tabclean</Application>
<DocSecurity>0</DocSecurity>
<ScaleCrop>false</ScaleCrop>
</Properties>"#
    }
}
