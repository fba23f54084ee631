use crate::error::{ExtractError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub policy: PolicyConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_root: PathBuf,
    pub app_name: String,
    pub encryption_enabled: bool,
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
    #[serde(default)]
    pub shares: Vec<ShareConfig>,
}

/// An external storage mounted into a user's tree.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MountConfig {
    /// Mounting user, or `*` for every user.
    pub user: String,
    /// User-relative mount point, e.g. `/External`.
    pub mount_point: String,
    pub local_root: PathBuf,
    #[serde(default)]
    pub kind: MountKind,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MountKind {
    #[default]
    Local,
    Remote,
    Encrypted,
}

/// A folder owned by `owner` that appears in `recipient`'s tree at `mount_point`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ShareConfig {
    pub owner: String,
    pub owner_path: String,
    pub recipient: String,
    pub mount_point: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub blacklisted_files: Vec<String>,
    pub blacklist_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub unrar: String,
    pub sevenzip: String,
    pub timeout: u64,
    pub success_check: SuccessCheckMode,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessCheckMode {
    #[default]
    ExitStatus,
    OutputLines,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            app_name: "extract".to_string(),
            encryption_enabled: false,
            mounts: Vec::new(),
            shares: Vec::new(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            blacklisted_files: vec![".htaccess".to_string()],
            blacklist_patterns: Vec::new(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            unrar: "unrar".to_string(),
            sevenzip: "7za".to_string(),
            timeout: 600, // 10 minutes
            success_check: SuccessCheckMode::ExitStatus,
        }
    }
}

impl ToolsConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ExtractError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ExtractError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ExtractError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["cloud-extract.toml", ".cloud-extract.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref data_root) = cli_args.data_root {
            self.storage.data_root = data_root.clone();
        }

        if let Some(timeout) = cli_args.timeout {
            self.tools.timeout = timeout;
        }

        if let Some(ref unrar) = cli_args.unrar {
            self.tools.unrar = unrar.clone();
        }

        if let Some(ref sevenzip) = cli_args.sevenzip {
            self.tools.sevenzip = sevenzip.clone();
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| ExtractError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| ExtractError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.app_name.is_empty() || self.storage.app_name.contains('/') {
            return Err(ExtractError::Config {
                message: format!(
                    "App name must be a single non-empty path segment, got {:?}",
                    self.storage.app_name
                ),
            });
        }

        if self.tools.timeout == 0 {
            return Err(ExtractError::Config {
                message: "Tool timeout must be greater than 0".to_string(),
            });
        }

        for pattern in &self.policy.blacklist_patterns {
            Regex::new(pattern).map_err(|e| ExtractError::Config {
                message: format!("Invalid blacklist pattern {:?}: {}", pattern, e),
            })?;
        }

        for mount in &self.storage.mounts {
            if !mount.mount_point.starts_with('/') || mount.mount_point == "/" {
                return Err(ExtractError::Config {
                    message: format!(
                        "Mount point must be an absolute sub-folder, got {:?}",
                        mount.mount_point
                    ),
                });
            }
        }

        for share in &self.storage.shares {
            if !share.mount_point.starts_with('/') || !share.owner_path.starts_with('/') {
                return Err(ExtractError::Config {
                    message: format!(
                        "Share paths must be absolute: {} -> {}",
                        share.owner_path, share.mount_point
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let mut sample_config = Self::default();
        sample_config.storage.mounts.push(MountConfig {
            user: "*".to_string(),
            mount_point: "/External".to_string(),
            local_root: PathBuf::from("/mnt/external"),
            kind: MountKind::Local,
        });
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub data_root: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub unrar: Option<String>,
    pub sevenzip: Option<String>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_root(mut self, data_root: Option<PathBuf>) -> Self {
        self.data_root = data_root;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_unrar(mut self, unrar: Option<String>) -> Self {
        self.unrar = unrar;
        self
    }

    pub fn with_sevenzip(mut self, sevenzip: Option<String>) -> Self {
        self.sevenzip = sevenzip;
        self
    }
}
