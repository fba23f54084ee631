use crate::error::Result;
use crate::storage::service::{join_cloud_path, Node, ResolvedPath, StorageService};
use std::path::Path;
use std::sync::Arc;

/// Maps user-relative cloud paths to backend-local paths and back.
pub struct StoragePathResolver {
    storage: Arc<dyn StorageService>,
    user_id: String,
}

impl StoragePathResolver {
    pub fn new<S: Into<String>>(storage: Arc<dyn StorageService>, user_id: S) -> Self {
        Self {
            storage,
            user_id: user_id.into(),
        }
    }

    /// Resolves `file_name` inside `directory` to a local path.
    ///
    /// Fails with `NotFound` when the node does not exist, and with
    /// `UnsupportedStorage` when its backend has no local view.
    pub fn resolve(&self, directory: &str, file_name: &str) -> Result<(Node, ResolvedPath)> {
        let relative = join_cloud_path(directory, file_name);
        let node = self.storage.get_node(&self.user_id, &relative)?;
        let resolved = self.storage.local_path(&node)?;

        log::debug!(
            "Resolved {} for {} to {}",
            relative,
            self.user_id,
            resolved.path().display()
        );
        Ok((node, resolved))
    }

    /// Root-namespace path of a backend-local path, as seen by `owner`.
    pub fn storage_path_of(&self, owner: &str, local: &Path) -> Result<String> {
        self.storage.owner_path_of(owner, local)
    }
}
