use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::uploader::{CandidateFile, CapacityLimits};

/// Recursively collect every file under `directories` whose extension is allowed.
///
/// Extensions are compared lowercase with their leading dot (`.png`). An empty
/// allow-list accepts every file. Missing directories are logged and skipped.
pub fn scan_files(directories: &[PathBuf], allowed_extensions: &[String]) -> Vec<CandidateFile> {
    let mut files = Vec::new();

    for directory in directories {
        if !directory.is_dir() {
            log::warn!("Directory does not exist: {}", directory.display());
            continue;
        }

        let root = std::fs::canonicalize(directory).unwrap_or_else(|_| directory.clone());
        let before = files.len();

        for entry in WalkDir::new(&root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !is_allowed(entry.path(), allowed_extensions) {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) => files.push(CandidateFile::new(entry.into_path(), metadata.len())),
                Err(e) => log::warn!("Could not read size of {}: {}", entry.path().display(), e),
            }
        }

        log::debug!(
            "Found {} matching file(s) in {}",
            files.len() - before,
            root.display()
        );
    }

    files
}

/// Split off files that can never fit in a batch; returns `(valid, ignored)`
pub fn partition_oversized(
    files: Vec<CandidateFile>,
    limits: &CapacityLimits,
) -> (Vec<CandidateFile>, Vec<CandidateFile>) {
    files.into_iter().partition(|file| limits.fits_alone(file))
}

fn is_allowed(path: &Path, allowed_extensions: &[String]) -> bool {
    if allowed_extensions.is_empty() {
        return true;
    }

    match path.extension() {
        Some(extension) => {
            let extension = format!(".{}", extension.to_string_lossy().to_lowercase());
            allowed_extensions.iter().any(|allowed| *allowed == extension)
        }
        None => false,
    }
}
