use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

/// Where a node physically lives, as far as extraction cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeLocation {
    /// Plain local directory, usable in place.
    Local(PathBuf),
    /// Reachable only through a scratch copy.
    Remote(PathBuf),
    /// No local view exists.
    Encrypted,
}

/// A file or folder in the storage root namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Root-namespace path such as `/alice/files/Documents/photos.zip`.
    pub path: String,
    pub kind: NodeKind,
    pub owner: String,
    pub location: NodeLocation,
}

impl Node {
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }
}

/// A backend-local path for a node.
///
/// For storages without in-place access the path points into a scratch
/// directory owned by this value and removed when it is dropped.
pub struct ResolvedPath {
    path: PathBuf,
    _scratch: Option<TempDir>,
}

impl ResolvedPath {
    pub fn in_place(path: PathBuf) -> Self {
        Self {
            path,
            _scratch: None,
        }
    }

    pub fn scratch(path: PathBuf, scratch: TempDir) -> Self {
        Self {
            path,
            _scratch: Some(scratch),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_scratch_copy(&self) -> bool {
        self._scratch.is_some()
    }
}

impl fmt::Debug for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedPath")
            .field("path", &self.path)
            .field("scratch", &self.is_scratch_copy())
            .finish()
    }
}

/// The cloud storage as seen by the extraction layer.
///
/// Relative paths are relative to a user's `files` folder and start with `/`.
/// Full paths live in the root namespace (`/<user>/files/...`).
pub trait StorageService: Send + Sync {
    fn get_node(&self, user_id: &str, relative_path: &str) -> Result<Node>;

    fn get_by_path(&self, full_path: &str) -> Result<Node>;

    fn local_path(&self, node: &Node) -> Result<ResolvedPath>;

    fn create_directory(&self, full_path: &str) -> Result<Node>;

    fn delete_node(&self, node: &Node) -> Result<()>;

    /// Moves a node to `target_full_path`. Fails with `AlreadyExists` rather than overwrite.
    fn move_node(&self, node: &Node, target_full_path: &str) -> Result<Node>;

    fn node_owner(&self, node: &Node) -> String {
        node.owner.clone()
    }

    fn is_encryption_enabled(&self) -> bool;

    fn user_path(&self, user_id: &str, relative_path: &str) -> String {
        format!("/{}/files{}", user_id, normalize_cloud_path(relative_path))
            .trim_end_matches('/')
            .to_string()
    }

    /// Maps a backend-local path back to `owner`'s root-namespace path.
    fn owner_path_of(&self, owner: &str, local: &Path) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files: usize,
    pub directories: usize,
}

/// Re-indexes a subtree after content appeared on disk outside the storage API.
pub trait Rescanner: Send + Sync {
    fn scan(&self, owner: &str, full_path: &str) -> Result<ScanSummary>;
}

/// The acting user plus the storage they act on.
#[derive(Clone)]
pub struct RequestContext {
    pub user_id: String,
    pub storage: Arc<dyn StorageService>,
}

impl RequestContext {
    pub fn new<S: Into<String>>(user_id: S, storage: Arc<dyn StorageService>) -> Self {
        Self {
            user_id: user_id.into(),
            storage,
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Normalizes a slash-separated cloud path: leading `/`, no empty or `.`
/// segments, `..` resolved against its parent. Never climbs above the root.
pub fn normalize_cloud_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Joins two cloud path fragments and normalizes the result.
pub fn join_cloud_path(base: &str, name: &str) -> String {
    normalize_cloud_path(&format!("{}/{}", base, name))
}

/// True when the raw path contains a `..` segment.
pub fn has_parent_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}
