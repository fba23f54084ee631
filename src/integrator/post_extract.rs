use crate::error::{ExtractError, Result};
use crate::policy::FilenamePolicy;
use crate::storage::{join_cloud_path, RequestContext, Rescanner, ScanSummary, StoragePathResolver};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Who owns the extracted content versus who asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipContext {
    pub owner_user_id: String,
    pub calling_user_id: String,
}

impl OwnershipContext {
    pub fn is_shared(&self) -> bool {
        self.owner_user_id != self.calling_user_id
    }
}

#[derive(Debug, Clone)]
pub struct IntegrationPlan {
    /// Local directory the backend extracted into.
    pub extract_to: PathBuf,
    /// Staging cloud path, set for staged jobs only.
    pub tmp_path: Option<String>,
    /// User-relative directory holding the archive.
    pub directory: String,
    pub destination_name: String,
}

impl IntegrationPlan {
    pub fn destination_relative(&self) -> String {
        join_cloud_path(&self.directory, &self.destination_name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrationReport {
    pub removed_files: usize,
    /// Root-namespace path the content ended up at.
    pub destination: String,
    pub rescan: Option<ScanSummary>,
}

/// Makes freshly extracted files part of the user's tree.
pub struct PostExtractIntegrator {
    ctx: RequestContext,
    policy: Arc<dyn FilenamePolicy>,
    rescanner: Arc<dyn Rescanner>,
}

impl PostExtractIntegrator {
    pub fn new(
        ctx: RequestContext,
        policy: Arc<dyn FilenamePolicy>,
        rescanner: Arc<dyn Rescanner>,
    ) -> Self {
        Self {
            ctx,
            policy,
            rescanner,
        }
    }

    pub fn integrate(&self, plan: &IntegrationPlan) -> Result<IntegrationReport> {
        let removed_files = self.sanitize(&plan.extract_to);

        let storage = &self.ctx.storage;
        let destination_relative = plan.destination_relative();
        let destination_full = storage.user_path(&self.ctx.user_id, &destination_relative);

        if let Some(ref tmp_path) = plan.tmp_path {
            let staged = storage
                .get_by_path(tmp_path)
                .map_err(|e| ExtractError::integration("staging directory disappeared", e))?;
            let moved = storage
                .move_node(&staged, &destination_full)
                .map_err(|e| {
                    ExtractError::integration(
                        format!("cannot move {} to {}", tmp_path, destination_full),
                        e,
                    )
                })?;

            log::info!("Moved {} to {}", tmp_path, moved.path);
            return Ok(IntegrationReport {
                removed_files,
                destination: moved.path,
                rescan: None,
            });
        }

        let node = storage
            .get_node(&self.ctx.user_id, &destination_relative)
            .map_err(|e| ExtractError::integration("extracted folder not found", e))?;
        let ownership = OwnershipContext {
            owner_user_id: storage.node_owner(&node),
            calling_user_id: self.ctx.user_id.clone(),
        };

        let summary = if ownership.is_shared() {
            let owner_path = StoragePathResolver::new(storage.clone(), self.ctx.user_id.clone())
                .storage_path_of(&ownership.owner_user_id, &plan.extract_to)
                .map_err(|e| ExtractError::integration("cannot map shared folder to its owner", e))?;
            log::debug!(
                "{} is shared by {}, rescanning {}",
                destination_full,
                ownership.owner_user_id,
                owner_path
            );
            self.rescanner.scan(&ownership.owner_user_id, &owner_path)
        } else {
            self.rescanner.scan(&ownership.calling_user_id, &destination_full)
        }
        .map_err(|e| ExtractError::integration("rescan failed", e))?;

        Ok(IntegrationReport {
            removed_files,
            destination: destination_full,
            rescan: Some(summary),
        })
    }

    /// Deletes every blacklisted file below `root`. Failures are logged and skipped.
    fn sanitize(&self, root: &Path) -> usize {
        let mut removed = 0;

        for entry in WalkDir::new(root).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Cannot inspect extracted entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_dir() || !self.policy.is_path_blacklisted(entry.path()) {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    log::warn!("Removed blacklisted file {}", entry.path().display());
                    removed += 1;
                }
                Err(e) => {
                    log::error!(
                        "Failed to remove blacklisted file {}: {}",
                        entry.path().display(),
                        e
                    );
                }
            }
        }

        removed
    }
}
