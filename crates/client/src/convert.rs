//! Columnar-to-tabular conversion seam.
//!
//! Thermal history and mesh exports arrive as columnar (Parquet) files.
//! Converting them to CSV is delegated to a [`ColumnarConverter`]; when no
//! converter is available, or conversion fails, the raw file is kept and
//! the caller is told no converted file exists.

use std::fs::File;
use std::path::{Path, PathBuf};

use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// No converter capability is installed.
    #[error("no columnar converter is available")]
    Unsupported,

    #[error("conversion failed: {0}")]
    Failed(String),
}

/// Converts a downloaded columnar file into a row-oriented text file.
pub trait ColumnarConverter: Send + Sync {
    fn convert(&self, source: &Path, target: &Path) -> Result<(), ConversionError>;
}

/// Converter that never converts; raw exports are kept as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConverter;

impl ColumnarConverter for NoConverter {
    fn convert(&self, _source: &Path, _target: &Path) -> Result<(), ConversionError> {
        Err(ConversionError::Unsupported)
    }
}

/// Parquet to CSV through the Arrow record batch reader. The header row
/// carries the column names.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetCsvConverter;

impl ParquetCsvConverter {
    fn write_csv(source: &Path, target: &Path) -> Result<(), ConversionError> {
        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(source).map_err(failed)?)
            .and_then(|builder| builder.build())
            .map_err(failed)?;

        let mut writer = arrow_csv::Writer::new(File::create(target).map_err(failed)?);
        for batch in reader {
            writer.write(&batch.map_err(failed)?).map_err(failed)?;
        }
        Ok(())
    }
}

impl ColumnarConverter for ParquetCsvConverter {
    fn convert(&self, source: &Path, target: &Path) -> Result<(), ConversionError> {
        let result = Self::write_csv(source, target);
        if result.is_err() && target.exists() {
            // Never leave a truncated CSV next to the raw file.
            let _ = std::fs::remove_file(target);
        }
        result
    }
}

fn failed(e: impl std::fmt::Display) -> ConversionError {
    ConversionError::Failed(e.to_string())
}

/// Run `converter` and return the converted path, or `None` (with a
/// warning) if no conversion happened. Never fails.
pub fn convert_or_keep(
    converter: &dyn ColumnarConverter,
    source: &Path,
    target: &Path,
) -> Option<PathBuf> {
    match converter.convert(source, target) {
        Ok(()) => {
            tracing::info!(path = %target.display(), "Converted to CSV");
            Some(target.to_path_buf())
        }
        Err(e) => {
            tracing::warn!(
                source = %source.display(),
                error = %e,
                "Keeping raw columnar file; no CSV produced",
            );
            None
        }
    }
}

/// Path of the CSV sibling for a columnar file.
pub fn csv_sibling(path: &Path) -> PathBuf {
    path.with_extension("csv")
}
