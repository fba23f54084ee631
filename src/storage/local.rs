use crate::config::{MountConfig, MountKind, ShareConfig, StorageConfig};
use crate::error::{ExtractError, Result};
use crate::storage::service::{
    has_parent_segment, normalize_cloud_path, Node, NodeKind, NodeLocation, ResolvedPath,
    StorageService,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const MAX_SHARE_DEPTH: usize = 8;

/// Storage backed by a data directory laid out as `<data_root>/<user>/files/...`.
///
/// External mounts and shares from the `[storage]` config section are overlaid
/// on each user's `files` folder.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    data_root: PathBuf,
    mounts: Vec<MountConfig>,
    shares: Vec<ShareConfig>,
    encryption_enabled: bool,
}

/// A root-namespace path mapped onto the disk.
#[derive(Debug, Clone)]
struct Placement {
    full_path: String,
    owner: String,
    physical: PathBuf,
    kind: MountKind,
}

impl LocalStorage {
    pub fn new<P: Into<PathBuf>>(data_root: P) -> Self {
        Self {
            data_root: data_root.into(),
            mounts: Vec::new(),
            shares: Vec::new(),
            encryption_enabled: false,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            data_root: config.data_root.clone(),
            mounts: config.mounts.clone(),
            shares: config.shares.clone(),
            encryption_enabled: config.encryption_enabled,
        }
    }

    pub fn with_mount(mut self, mount: MountConfig) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn with_share(mut self, share: ShareConfig) -> Self {
        self.shares.push(share);
        self
    }

    pub fn with_encryption(mut self, enabled: bool) -> Self {
        self.encryption_enabled = enabled;
        self
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    fn place(&self, full_path: &str) -> Result<Placement> {
        self.place_at_depth(full_path, 0)
    }

    fn place_at_depth(&self, full_path: &str, depth: usize) -> Result<Placement> {
        if has_parent_segment(full_path) {
            return Err(ExtractError::InvalidPath {
                path: full_path.to_string(),
            });
        }

        let full_path = normalize_cloud_path(full_path);
        let segments: Vec<&str> = full_path.split('/').filter(|s| !s.is_empty()).collect();
        let user = match segments.first() {
            Some(user) => *user,
            None => {
                return Err(ExtractError::InvalidPath { path: full_path });
            }
        };

        if segments.get(1) == Some(&"files") {
            let relative = format!("/{}", segments[2..].join("/"));

            if let Some((share, rest)) = self.share_for(user, &relative) {
                if depth >= MAX_SHARE_DEPTH {
                    return Err(ExtractError::InvalidPath { path: full_path });
                }
                let owner_full = format!("/{}/files{}{}", share.owner, share.owner_path, rest);
                let mut placement = self.place_at_depth(&owner_full, depth + 1)?;
                placement.full_path = full_path;
                return Ok(placement);
            }

            if let Some((mount, rest)) = self.mount_for(user, &relative) {
                return Ok(Placement {
                    physical: join_relative(&mount.local_root, rest),
                    owner: user.to_string(),
                    kind: mount.kind,
                    full_path,
                });
            }
        }

        let mut physical = self.data_root.join(user);
        for segment in &segments[1..] {
            physical.push(segment);
        }

        Ok(Placement {
            owner: user.to_string(),
            physical,
            kind: MountKind::Local,
            full_path,
        })
    }

    fn share_for<'a>(&'a self, user: &str, relative: &'a str) -> Option<(&'a ShareConfig, &'a str)> {
        self.shares
            .iter()
            .filter(|share| share.recipient == user)
            .filter_map(|share| strip_mount_point(relative, &share.mount_point).map(|rest| (share, rest)))
            .max_by_key(|(share, _)| share.mount_point.len())
    }

    fn mount_for<'a>(&'a self, user: &str, relative: &'a str) -> Option<(&'a MountConfig, &'a str)> {
        self.mounts
            .iter()
            .filter(|mount| mount.user == user || mount.user == "*")
            .filter_map(|mount| strip_mount_point(relative, &mount.mount_point).map(|rest| (mount, rest)))
            .max_by_key(|(mount, _)| mount.mount_point.len())
    }

    fn node_from(&self, placement: Placement) -> Result<Node> {
        let metadata = match fs::metadata(&placement.physical) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ExtractError::NotFound {
                    path: placement.full_path,
                });
            }
            Err(e) => return Err(ExtractError::Io(e)),
        };

        let kind = if metadata.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        };

        let location = match placement.kind {
            MountKind::Local => NodeLocation::Local(placement.physical),
            MountKind::Remote => NodeLocation::Remote(placement.physical),
            MountKind::Encrypted => NodeLocation::Encrypted,
        };

        Ok(Node {
            path: placement.full_path,
            kind,
            owner: placement.owner,
            location,
        })
    }

    fn physical_of(&self, node: &Node) -> Result<PathBuf> {
        match &node.location {
            NodeLocation::Local(path) | NodeLocation::Remote(path) => Ok(path.clone()),
            NodeLocation::Encrypted => Err(ExtractError::UnsupportedStorage {
                path: node.path.clone(),
                reason: "storage is encrypted at rest".to_string(),
            }),
        }
    }

    fn scratch_copy(&self, node: &Node, source: &Path) -> Result<ResolvedPath> {
        let scratch = TempDir::new()?;
        let target = scratch.path().join(node.name());

        if node.is_dir() {
            fs::create_dir_all(&target)?;
            let mut options = fs_extra::dir::CopyOptions::new();
            options.content_only = true;
            fs_extra::dir::copy(source, &target, &options)
                .map_err(|e| ExtractError::Io(io::Error::other(e.to_string())))?;
        } else {
            fs::copy(source, &target)?;
        }

        log::debug!(
            "Copied remote node {} to scratch path {}",
            node.path,
            target.display()
        );
        Ok(ResolvedPath::scratch(target, scratch))
    }
}

impl StorageService for LocalStorage {
    fn get_node(&self, user_id: &str, relative_path: &str) -> Result<Node> {
        if has_parent_segment(relative_path) {
            return Err(ExtractError::InvalidPath {
                path: relative_path.to_string(),
            });
        }
        self.get_by_path(&self.user_path(user_id, relative_path))
    }

    fn get_by_path(&self, full_path: &str) -> Result<Node> {
        let placement = self.place(full_path)?;
        self.node_from(placement)
    }

    fn local_path(&self, node: &Node) -> Result<ResolvedPath> {
        match &node.location {
            NodeLocation::Local(path) => Ok(ResolvedPath::in_place(path.clone())),
            NodeLocation::Remote(path) => self.scratch_copy(node, path),
            NodeLocation::Encrypted => Err(ExtractError::UnsupportedStorage {
                path: node.path.clone(),
                reason: "storage is encrypted at rest".to_string(),
            }),
        }
    }

    fn create_directory(&self, full_path: &str) -> Result<Node> {
        let placement = self.place(full_path)?;
        if placement.kind == MountKind::Encrypted {
            return Err(ExtractError::UnsupportedStorage {
                path: placement.full_path,
                reason: "storage is encrypted at rest".to_string(),
            });
        }
        fs::create_dir_all(&placement.physical)?;
        self.node_from(placement)
    }

    fn delete_node(&self, node: &Node) -> Result<()> {
        let physical = self.physical_of(node)?;
        let result = if node.is_dir() {
            fs::remove_dir_all(&physical)
        } else {
            fs::remove_file(&physical)
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ExtractError::NotFound {
                path: node.path.clone(),
            }),
            Err(e) => Err(ExtractError::Io(e)),
        }
    }

    fn move_node(&self, node: &Node, target_full_path: &str) -> Result<Node> {
        let from = self.physical_of(node)?;
        let target = self.place(target_full_path)?;
        if target.kind == MountKind::Encrypted {
            return Err(ExtractError::UnsupportedStorage {
                path: target.full_path,
                reason: "storage is encrypted at rest".to_string(),
            });
        }

        if target.physical.exists() {
            return Err(ExtractError::AlreadyExists {
                path: target.full_path,
            });
        }

        if let Some(parent) = target.physical.parent() {
            fs::create_dir_all(parent)?;
        }

        move_with_fallback(&from, &target.physical)?;
        self.node_from(target)
    }

    fn is_encryption_enabled(&self) -> bool {
        self.encryption_enabled
    }

    fn owner_path_of(&self, owner: &str, local: &Path) -> Result<String> {
        let mounted = self
            .mounts
            .iter()
            .filter(|mount| mount.user == owner || mount.user == "*")
            .filter_map(|mount| {
                local
                    .strip_prefix(&mount.local_root)
                    .ok()
                    .map(|rest| (mount, rest))
            })
            .max_by_key(|(mount, _)| mount.local_root.components().count());

        if let Some((mount, rest)) = mounted {
            let base = format!(
                "/{}/files{}",
                owner,
                normalize_cloud_path(&mount.mount_point).trim_end_matches('/')
            );
            return Ok(append_components(base, rest));
        }

        let owner_files = self.data_root.join(owner).join("files");
        let rest = local
            .strip_prefix(&owner_files)
            .map_err(|_| ExtractError::InvalidPath {
                path: local.display().to_string(),
            })?;

        Ok(append_components(format!("/{}/files", owner), rest))
    }
}

fn append_components(mut full_path: String, rest: &Path) -> String {
    for component in rest.components() {
        full_path.push('/');
        full_path.push_str(&component.as_os_str().to_string_lossy());
    }
    full_path
}

/// Returns the remainder of `relative` below `mount_point`, on a segment boundary.
fn strip_mount_point<'a>(relative: &'a str, mount_point: &str) -> Option<&'a str> {
    let mount_point = mount_point.trim_end_matches('/');
    let rest = relative.strip_prefix(mount_point)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

fn join_relative(root: &Path, rest: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in rest.split('/').filter(|s| !s.is_empty()) {
        path.push(segment);
    }
    path
}

/// Renames `from` to `to`, falling back to copy-and-delete when a rename is
/// not possible (e.g. across devices).
pub fn move_with_fallback(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::warn!("rename failed ({}), falling back to copy and delete", e);

            if !from.exists() {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "Source path does not exist",
                ));
            }

            if to.exists() {
                return Err(e);
            }

            if from.is_dir() {
                fs::create_dir_all(to)?;
                let mut options = fs_extra::dir::CopyOptions::new();
                options.content_only = true;
                fs_extra::dir::move_dir(from, to, &options)
                    .map(|_| ())
                    .map_err(|err| io::Error::other(err.to_string()))
            } else {
                let options = fs_extra::file::CopyOptions::new();
                fs_extra::file::move_file(from, to, &options)
                    .map(|_| ())
                    .map_err(|err| io::Error::other(err.to_string()))
            }
        }
    }
}
