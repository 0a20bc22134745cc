//! File-system factor sink.

use crate::export::{ExportError, ExportFormat, Exporter};
use fremantle_data::{DataError, FactorSink, FactorTable};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes every persisted table to `<dir>/<name>.<ext>`.
///
/// An existing file of the same name is replaced.
#[derive(Debug, Clone)]
pub struct CsvDirectorySink {
    dir: PathBuf,
    format: ExportFormat,
}

impl CsvDirectorySink {
    /// Create a CSV sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            format: ExportFormat::Csv,
        })
    }

    /// Write tables in `format` instead of CSV.
    pub const fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a table named `name` is written to.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{}", self.format.extension()))
    }
}

impl FactorSink for CsvDirectorySink {
    fn persist(&self, name: &str, table: &FactorTable) -> fremantle_data::Result<()> {
        let path = self.path_for(name);
        table
            .export_to_file(&path, self.format)
            .map_err(|e| match e {
                ExportError::Io(e) => DataError::Io(e),
                ExportError::Data(e) => e,
                other => DataError::Sink(other.to_string()),
            })?;
        debug!(path = %path.display(), rows = table.len(), "wrote factor table");
        Ok(())
    }
}
