use crate::error::Result;
use crate::storage::{join_cloud_path, StorageService};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A scratch directory inside the user's app folder that receives the
/// extracted content before it is moved into place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingArea {
    /// Cloud path of the staging directory, e.g. `/alice/extract/photos`.
    pub tmp_path: String,
    /// Local directory the backend extracts into.
    pub extract_to: PathBuf,
    pub owner: String,
}

pub struct StagingManager {
    storage: Arc<dyn StorageService>,
    user_id: String,
    app_name: String,
}

impl StagingManager {
    pub fn new<U: Into<String>, A: Into<String>>(
        storage: Arc<dyn StorageService>,
        user_id: U,
        app_name: A,
    ) -> Self {
        Self {
            storage,
            user_id: user_id.into(),
            app_name: app_name.into(),
        }
    }

    pub fn app_path(&self) -> String {
        format!("/{}/{}", self.user_id, self.app_name)
    }

    pub fn staging_path(&self, archive_file_name: &str) -> String {
        join_cloud_path(&self.app_path(), &staging_dir_name(archive_file_name))
    }

    /// Ensures the app directory exists, evicts any leftover staging
    /// directory for this archive and returns the fresh staging area.
    pub fn prepare(&self, archive_file_name: &str) -> Result<StagingArea> {
        let app_path = self.app_path();
        let app_node = match self.storage.get_by_path(&app_path) {
            Ok(node) => node,
            Err(e) if e.is_not_found() => {
                log::debug!("Creating app directory {}", app_path);
                self.storage.create_directory(&app_path)?
            }
            Err(e) => return Err(e),
        };

        let name = staging_dir_name(archive_file_name);
        let tmp_path = join_cloud_path(&app_path, &name);
        self.evict(&tmp_path)?;

        let app_local = self.storage.local_path(&app_node)?;
        let extract_to = app_local.path().join(&name);

        log::debug!(
            "Staging {} in {} ({})",
            archive_file_name,
            tmp_path,
            extract_to.display()
        );

        Ok(StagingArea {
            tmp_path,
            extract_to,
            owner: self.user_id.clone(),
        })
    }

    /// Removes a staging directory. A directory that is already gone is fine.
    pub fn discard(&self, area: &StagingArea) -> Result<()> {
        self.evict(&area.tmp_path)
    }

    fn evict(&self, tmp_path: &str) -> Result<()> {
        let node = match self.storage.get_by_path(tmp_path) {
            Ok(node) => node,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };

        log::warn!("Removing leftover staging directory {}", tmp_path);
        match self.storage.delete_node(&node) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// File stem of an archive name, with one inner `.tar` layer removed.
///
/// `photos.zip` gives `photos`, `data.tar.gz` gives `data`.
pub fn staging_dir_name(archive_file_name: &str) -> String {
    let stem = file_stem(archive_file_name);
    strip_tar_suffix(&stem).to_string()
}

pub fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

pub fn strip_tar_suffix(stem: &str) -> &str {
    match stem.strip_suffix(".tar") {
        Some(inner) if !inner.is_empty() => inner,
        _ => stem,
    }
}
