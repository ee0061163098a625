//! Data Loader Module
//! Turns uploaded CSV / XLSX bytes into a Polars DataFrame.

use crate::error::{PipelineError, Result};
use calamine::{Data, DataType as _, Reader, Xlsx};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// Rows scanned when inferring CSV column types.
const INFER_SCHEMA_ROWS: usize = 10000;

static EMPTY_CELL: Data = Data::Empty;

/// Text read as a missing value, in CSV fields and spreadsheet string cells.
/// Empty fields are always missing.
pub const MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing_token(text: &str) -> bool {
    text.is_empty() || MISSING_TOKENS.contains(&text)
}

/// Input formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    /// Parse a (case-insensitive) file extension.
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" => Ok(SourceFormat::Xlsx),
            _ => Err(PipelineError::UnsupportedFormat(ext.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Lower-cased suffix after the last `.`, or an empty string.
pub fn extension_of(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    name: String,
    content: Vec<u8>,
    format: SourceFormat,
}

impl FileRecord {
    /// Create a record, rejecting unsupported extensions up front.
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let format = SourceFormat::from_extension(&extension_of(&name))?;
        Ok(Self {
            name,
            content,
            format,
        })
    }

    /// Read a file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        // Check the extension before touching the file
        SourceFormat::from_extension(&extension_of(&name))?;
        let content = std::fs::read(path)?;
        Self::new(name, content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Handles file loading with Polars (CSV) and calamine (XLSX).
pub struct DataLoader;

impl DataLoader {
    /// Load raw bytes given a declared extension.
    pub fn load(content: &[u8], ext: &str) -> Result<DataFrame> {
        let format = SourceFormat::from_extension(ext)?;
        Self::load_format(content, format)
    }

    pub fn load_format(content: &[u8], format: SourceFormat) -> Result<DataFrame> {
        match format {
            SourceFormat::Csv => Self::load_csv(content),
            SourceFormat::Xlsx => Self::load_xlsx(content),
        }
    }

    /// Parse comma-separated text. The first row is the header.
    pub fn load_csv(content: &[u8]) -> Result<DataFrame> {
        let null_values: Vec<PlSmallStr> = MISSING_TOKENS
            .iter()
            .copied()
            .map(PlSmallStr::from_static)
            .collect();
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .map_parse_options(|opts| {
                opts.with_null_values(Some(NullValues::AllColumns(null_values.clone())))
            })
            .into_reader_with_file_handle(Cursor::new(content.to_vec()))
            .finish()
            .map_err(|e| PipelineError::Parse {
                format: "csv",
                message: e.to_string(),
            })
    }

    /// Parse the first worksheet of an XLSX workbook. The first row is the header.
    pub fn load_xlsx(content: &[u8]) -> Result<DataFrame> {
        let parse_err = |message: String| PipelineError::Parse {
            format: "xlsx",
            message,
        };

        let mut workbook: Xlsx<_> =
            Xlsx::new(Cursor::new(content.to_vec())).map_err(|e| parse_err(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| parse_err("workbook has no worksheets".to_string()))?
            .map_err(|e| parse_err(e.to_string()))?;

        let mut rows = range.rows();
        let Some(header) = rows.next() else {
            return Ok(DataFrame::empty());
        };
        let names = unique_header_names(header);
        let body: Vec<&[Data]> = rows.collect();

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells: Vec<&Data> = body
                    .iter()
                    .map(|row| row.get(idx).unwrap_or(&EMPTY_CELL))
                    .collect();
                build_column(name, &cells)
            })
            .collect::<Vec<_>>();

        Ok(DataFrame::new(columns)?)
    }
}

/// Header cells as unique column names. Blank headers get `column_N`,
/// repeats get a numeric suffix.
fn unique_header_names(header: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell {
                Data::Empty => format!("column_{}", idx + 1),
                other => {
                    let text = other.to_string();
                    if text.trim().is_empty() {
                        format!("column_{}", idx + 1)
                    } else {
                        text
                    }
                }
            };

            let mut name = base.clone();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{base}_{suffix}");
                suffix += 1;
            }
            name
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Bool,
    DateTime,
    Text,
}

fn cell_kind(cell: &Data) -> Option<CellKind> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::Int(_) => Some(CellKind::Int),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(CellKind::Int),
        Data::Float(_) => Some(CellKind::Float),
        Data::Bool(_) => Some(CellKind::Bool),
        // Durations have no calendar date; keep them as day counts
        Data::DateTime(dt) if dt.is_duration() => Some(CellKind::Float),
        Data::DateTime(_) | Data::DateTimeIso(_) => Some(CellKind::DateTime),
        Data::String(s) if is_missing_token(s) => None,
        _ => Some(CellKind::Text),
    }
}

/// Infer a column type from the non-empty cells, widening Int to Float
/// and anything mixed to Text.
fn infer_kind(cells: &[&Data]) -> Option<CellKind> {
    cells
        .iter()
        .filter_map(|c| cell_kind(c))
        .try_fold(None, |acc: Option<CellKind>, kind| {
            let merged = match (acc, kind) {
                (None, k) => k,
                (Some(a), k) if a == k => a,
                (Some(CellKind::Int), CellKind::Float) | (Some(CellKind::Float), CellKind::Int) => {
                    CellKind::Float
                }
                _ => return Err(CellKind::Text),
            };
            Ok(Some(merged))
        })
        .unwrap_or_else(Some)
}

fn build_column(name: String, cells: &[&Data]) -> Column {
    let name: PlSmallStr = name.into();
    match infer_kind(cells) {
        Some(CellKind::Int) => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Data::Int(v) => Some(*v),
                    Data::Float(f) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            Column::new(name, values)
        }
        Some(CellKind::Bool) => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Data::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            Column::new(name, values)
        }
        Some(CellKind::DateTime) => {
            let values: Vec<Option<NaiveDateTime>> = cells.iter().map(|c| c.as_datetime()).collect();
            Column::new(name, values)
        }
        Some(CellKind::Text) => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|c| match c {
                    Data::Empty | Data::Error(_) => None,
                    Data::String(s) if is_missing_token(s) => None,
                    Data::String(s) => Some(s.clone()),
                    Data::DateTime(_) | Data::DateTimeIso(_) => c
                        .as_datetime()
                        .map(|dt| dt.to_string())
                        .or_else(|| Some(c.to_string())),
                    other => Some(other.to_string()),
                })
                .collect();
            Column::new(name, values)
        }
        // Float, or no values at all: an empty spreadsheet column reads as missing numbers
        Some(CellKind::Float) | None => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| match c {
                    Data::Int(v) => Some(*v as f64),
                    Data::Float(f) => Some(*f),
                    Data::DateTime(dt) => Some(dt.as_f64()),
                    _ => None,
                })
                .collect();
            Column::new(name, values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};
    use chrono::NaiveDate;

    #[test]
    fn extension_is_lowercased_suffix() {
        assert_eq!(extension_of("Report.Final.CSV"), "csv");
        assert_eq!(extension_of("sheet.xlsx"), "xlsx");
        assert_eq!(extension_of("no_extension"), "");
    }

    #[test]
    fn file_record_rejects_other_extensions() {
        let err = FileRecord::new("notes.txt", b"hello".to_vec()).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(ext) if ext == "txt"));

        let record = FileRecord::new("DATA.CSV", b"a\n1\n".to_vec()).unwrap();
        assert_eq!(record.format(), SourceFormat::Csv);
        assert_eq!(record.name(), "DATA.CSV");
    }

    #[test]
    fn load_rejects_unknown_extension() {
        assert!(matches!(
            DataLoader::load(b"a,b\n1,2\n", "json"),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn csv_infers_column_types() {
        let df = DataLoader::load(b"id,label,score\n1,a,1.5\n2,b,\n3,c,2.5\n", "csv").unwrap();
        assert_eq!(df.shape(), (3, 3));
        assert_eq!(df.column("id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("label").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("score").unwrap().null_count(), 1);
    }

    #[test]
    fn csv_missing_tokens_are_nulls() {
        let df = DataLoader::load(b"x,y,z\n1,1,a\nNA,NaN,null\n3,3,c\n", "csv").unwrap();
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("y").unwrap().dtype(), &DataType::Int64);
        for name in ["x", "y", "z"] {
            assert_eq!(df.column(name).unwrap().null_count(), 1, "column {name}");
        }
    }

    #[test]
    fn csv_header_only_has_no_rows() {
        let df = DataLoader::load(b"id,label\n", "csv").unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn garbage_xlsx_is_a_parse_error() {
        let err = DataLoader::load(b"definitely not a zip archive", "xlsx").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { format: "xlsx", .. }));
    }

    #[test]
    fn header_names_are_made_unique() {
        let header = vec![
            Data::String("a".into()),
            Data::Empty,
            Data::String("a".into()),
        ];
        assert_eq!(unique_header_names(&header), ["a", "column_2", "a_1"]);
    }

    #[test]
    fn spreadsheet_dates_load_as_datetimes() {
        let noon = Data::DateTime(ExcelDateTime::new(45122.5, ExcelDateTimeType::DateTime, false));
        let missing = Data::String("#N/A".into());
        let column = build_column("when".into(), &[&noon, &missing]);

        assert!(matches!(column.dtype(), DataType::Datetime(_, _)));
        let expected_time = NaiveDate::from_ymd_opt(2023, 7, 15)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        let expected = Column::new("when".into(), [Some(expected_time), None]);
        assert!(column
            .as_materialized_series()
            .equals_missing(expected.as_materialized_series()));
    }

    #[test]
    fn spreadsheet_missing_tokens_do_not_force_text() {
        let one = Data::Float(1.0);
        let na = Data::String("NA".into());
        let three = Data::Float(3.0);
        assert_eq!(infer_kind(&[&one, &na, &three]), Some(CellKind::Int));

        let column = build_column("x".into(), &[&one, &na, &three]);
        assert_eq!(column.null_count(), 1);
    }

    #[test]
    fn spreadsheet_kinds_widen() {
        let int = Data::Float(2.0);
        let float = Data::Float(2.5);
        let text = Data::String("x".into());
        let empty = Data::Empty;

        assert_eq!(infer_kind(&[&int, &empty]), Some(CellKind::Int));
        assert_eq!(infer_kind(&[&int, &float]), Some(CellKind::Float));
        assert_eq!(infer_kind(&[&float, &text, &int]), Some(CellKind::Text));
        assert_eq!(infer_kind(&[&empty]), None);
    }
}
