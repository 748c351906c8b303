use std::path::{Path, PathBuf};

/// A local file waiting to be uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub display_name: String,
    pub size_bytes: u64,
}

impl CandidateFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let display_name = Path::new(&path)
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Self {
            path,
            display_name,
            size_bytes,
        }
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0 / 1024.0
    }
}

/// Per-message limits imposed by the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityLimits {
    pub max_batch_size_bytes: u64,
    pub max_files_per_batch: usize,
}

impl CapacityLimits {
    pub fn fits_alone(&self, file: &CandidateFile) -> bool {
        file.size_bytes <= self.max_batch_size_bytes
    }
}

/// Files that are uploaded and published together as one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    files: Vec<CandidateFile>,
    total_size_bytes: u64,
}

impl Batch {
    fn with_file(file: CandidateFile) -> Self {
        let mut batch = Self::default();
        batch.push(file);
        batch
    }

    fn push(&mut self, file: CandidateFile) {
        self.total_size_bytes += file.size_bytes;
        self.files.push(file);
    }

    fn accepts(&self, file: &CandidateFile, limits: &CapacityLimits) -> bool {
        self.files.len() < limits.max_files_per_batch
            && self.total_size_bytes + file.size_bytes <= limits.max_batch_size_bytes
    }

    pub fn files(&self) -> &[CandidateFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.total_size_bytes
    }

    pub fn total_size_mb(&self) -> f64 {
        self.total_size_bytes as f64 / 1024.0 / 1024.0
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.display_name.clone()).collect()
    }
}

/// Pack files into batches using descending first-fit.
///
/// Every file must already fit within `max_batch_size_bytes` on its own;
/// oversized files are expected to be split off by the caller beforehand.
/// Ties on size are broken by path so the same input always produces the
/// same partition.
pub fn plan_batches(mut files: Vec<CandidateFile>, limits: &CapacityLimits) -> Vec<Batch> {
    files.sort_by(|a, b| {
        b.size_bytes
            .cmp(&a.size_bytes)
            .then_with(|| a.path.cmp(&b.path))
    });

    let mut batches: Vec<Batch> = Vec::new();

    for file in files {
        debug_assert!(
            limits.fits_alone(&file),
            "{} exceeds the batch size limit",
            file.display_name
        );

        match batches.iter_mut().find(|b| b.accepts(&file, limits)) {
            Some(batch) => batch.push(file),
            None => batches.push(Batch::with_file(file)),
        }
    }

    log::debug!(
        "Planned {} batch(es) with limits of {} bytes / {} files",
        batches.len(),
        limits.max_batch_size_bytes,
        limits.max_files_per_batch
    );

    batches
}
