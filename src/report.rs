use std::fs;
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

pub const DEFAULT_REPORT_PATH: &str = "detailed_report.txt";

/// Destination for the per-batch detail trail
pub trait ReportSink {
    fn write(&self, lines: &[String]) -> AppResult<()>;
}

/// Writes one line per entry, replacing any previous report
pub struct FileReport {
    path: PathBuf,
}

impl FileReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for FileReport {
    fn write(&self, lines: &[String]) -> AppResult<()> {
        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }

        fs::write(&self.path, contents).map_err(|e| AppError::Report {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        log::info!("Detailed report written to {}", self.path.display());
        Ok(())
    }
}
