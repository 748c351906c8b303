use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};

/// Copies every log line to stderr and to the day's log file
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// `log20240131.txt` style name for the current day
pub fn daily_log_file_name() -> String {
    format!("log{}.txt", Local::now().format("%Y%m%d"))
}

/// Initialise the global logger.
///
/// `RUST_LOG` wins over `default_level`. When `logs_dir` is given, output is
/// also appended to the day's log file inside it and that path is returned.
pub fn init_logging(default_level: &str, logs_dir: Option<&Path>) -> AppResult<Option<PathBuf>> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));

    let log_path = match logs_dir {
        Some(dir) => {
            let path = dir.join(daily_log_file_name());
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            builder.target(Target::Pipe(Box::new(TeeWriter { file })));
            Some(path)
        }
        None => None,
    };

    builder
        .try_init()
        .map_err(|e| AppError::Internal(format!("Logger already initialised: {}", e)))?;

    Ok(log_path)
}
