use crate::error::Result;
use crate::storage::service::{Rescanner, ScanSummary, StorageService};
use std::sync::Arc;
use walkdir::WalkDir;

/// Walks a subtree and reports what a metadata index would pick up.
pub struct FilesystemRescanner {
    storage: Arc<dyn StorageService>,
}

impl FilesystemRescanner {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }
}

impl Rescanner for FilesystemRescanner {
    fn scan(&self, owner: &str, full_path: &str) -> Result<ScanSummary> {
        let node = self.storage.get_by_path(full_path)?;
        let resolved = self.storage.local_path(&node)?;

        let mut summary = ScanSummary::default();
        for entry in WalkDir::new(resolved.path()).min_depth(1) {
            let entry = entry?;
            if entry.file_type().is_dir() {
                summary.directories += 1;
            } else {
                summary.files += 1;
            }
        }

        log::info!(
            "Rescanned {} as {}: {} files, {} directories",
            full_path,
            owner,
            summary.files,
            summary.directories
        );
        Ok(summary)
    }
}
