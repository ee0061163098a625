//! Export module - serialize a cleaned dataset for download

mod xlsx;

pub use xlsx::{XlsxWriter, SHEET_NAME};

use crate::config::ExportFormat;
use crate::error::{PipelineError, Result};
use log::debug;
use polars::prelude::*;

/// A serialized dataset, ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub filename: String,
}

pub struct Exporter;

impl Exporter {
    /// Serialize `df` in `format`, named after the uploaded file.
    pub fn export(df: &DataFrame, format: ExportFormat, original_name: &str) -> Result<ExportArtifact> {
        Self::ensure_serializable(df)?;

        let bytes = match format {
            ExportFormat::Csv => Self::write_csv(df)?,
            ExportFormat::Excel => XlsxWriter::write_to_bytes(df)?,
        };
        let filename = output_filename(original_name, format);
        debug!("Exported {} ({} bytes)", filename, bytes.len());

        Ok(ExportArtifact {
            bytes,
            mime_type: format.mime_type(),
            filename,
        })
    }

    fn write_csv(df: &DataFrame) -> Result<Vec<u8>> {
        let mut out = df.clone();
        let mut buf = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(&mut out)
            .map_err(|e| PipelineError::Serialization {
                format: "csv",
                message: e.to_string(),
            })?;
        Ok(buf)
    }

    /// Nested and binary columns have no flat cell representation.
    fn ensure_serializable(df: &DataFrame) -> Result<()> {
        for column in df.get_columns() {
            let dtype = column.dtype();
            if dtype.is_nested() || matches!(dtype, DataType::Binary | DataType::BinaryOffset) {
                return Err(PipelineError::Serialization {
                    format: "export",
                    message: format!("column '{}' has unsupported type {}", column.name(), dtype),
                });
            }
        }
        Ok(())
    }
}

/// Replace the final extension of `original` with the export suffix.
pub fn output_filename(original: &str, format: ExportFormat) -> String {
    let stem = match original.rfind('.') {
        Some(idx) if idx > 0 => &original[..idx],
        _ => original,
    };
    format!("{}.{}", stem, format.extension())
}
