use crate::config::PolicyConfig;
use regex::Regex;
use std::path::Path;

/// Decides which file names may not exist in a user's tree.
pub trait FilenamePolicy: Send + Sync {
    fn is_blacklisted(&self, file_name: &str) -> bool;

    fn is_path_blacklisted(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|s| s.to_str())
            .map(|name| self.is_blacklisted(name))
            .unwrap_or(false)
    }
}

pub struct BlacklistPolicy {
    blacklisted_files: Vec<String>,
    blacklist_patterns: Vec<Regex>,
}

impl BlacklistPolicy {
    pub fn new(config: &PolicyConfig) -> Self {
        let blacklist_patterns = config
            .blacklist_patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            blacklisted_files: config
                .blacklisted_files
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
            blacklist_patterns,
        }
    }

    pub fn add_blacklisted_file<S: Into<String>>(&mut self, name: S) {
        let name = name.into().to_lowercase();
        if !self.blacklisted_files.contains(&name) {
            self.blacklisted_files.push(name);
        }
    }

    pub fn blacklisted_files(&self) -> &[String] {
        &self.blacklisted_files
    }
}

impl Default for BlacklistPolicy {
    fn default() -> Self {
        Self::new(&PolicyConfig::default())
    }
}

impl FilenamePolicy for BlacklistPolicy {
    fn is_blacklisted(&self, file_name: &str) -> bool {
        let name_lower = file_name.to_lowercase();
        if self.blacklisted_files.contains(&name_lower) {
            return true;
        }

        self.blacklist_patterns
            .iter()
            .any(|pattern| pattern.is_match(file_name))
    }
}
