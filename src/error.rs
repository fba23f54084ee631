use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported configuration: {message}")]
    UnsupportedConfiguration { message: String },

    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Storage cannot expose a local path for {path}: {reason}")]
    UnsupportedStorage { path: String, reason: String },

    #[error("{tool} failed: {message}")]
    BackendToolFailure { tool: String, message: String },

    #[error("{tool} timed out after {seconds} seconds")]
    ToolTimeout { tool: String, seconds: u64 },

    #[error("Integration failed: {message}")]
    IntegrationFailure {
        message: String,
        #[source]
        source: Option<Box<ExtractError>>,
    },

    #[error("Target already exists: {path}")]
    AlreadyExists { path: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    /// The blocking extraction task panicked or was aborted.
    #[error("Extraction task failed: {message}")]
    TaskFailed { message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn integration<S: Into<String>>(message: S, source: ExtractError) -> Self {
        ExtractError::IntegrationFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ExtractError::NotFound { .. } => true,
            ExtractError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for ExtractError {
    fn user_message(&self) -> String {
        match self {
            ExtractError::UnsupportedConfiguration { message } => message.clone(),
            ExtractError::NotFound { path } => {
                format!("File or folder not found: {}", path)
            }
            ExtractError::UnsupportedStorage { path, .. } => {
                format!("The storage holding {} does not support extraction", path)
            }
            ExtractError::BackendToolFailure { message, .. } => message.clone(),
            ExtractError::ToolTimeout { tool, seconds } => {
                format!("{} did not finish within {} seconds", tool, seconds)
            }
            ExtractError::IntegrationFailure { message, .. } => {
                format!("Extracted files could not be placed: {}", message)
            }
            ExtractError::AlreadyExists { path } => {
                format!("Destination already exists: {}", path)
            }
            ExtractError::InvalidPath { path } => {
                format!("Invalid path: {}", path)
            }
            ExtractError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ExtractError::UnsupportedConfiguration { .. } => Some(
                "Extraction is unavailable while server-side encryption is enabled.".to_string(),
            ),
            ExtractError::NotFound { .. } => Some(
                "Check the --directory and archive name; paths are relative to the user's files.".to_string(),
            ),
            ExtractError::UnsupportedStorage { .. } => Some(
                "Move the archive to a non-encrypted folder and try again.".to_string(),
            ),
            ExtractError::BackendToolFailure { tool, .. } => Some(format!(
                "Make sure `{}` is installed and on PATH, or set its location in the [tools] config section.",
                tool
            )),
            ExtractError::ToolTimeout { .. } => Some(
                "Increase the tool timeout with --timeout or in the [tools] config section.".to_string(),
            ),
            ExtractError::AlreadyExists { .. } => Some(
                "Rename or remove the existing folder, then extract again.".to_string(),
            ),
            ExtractError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string(),
            ),
            ExtractError::TaskFailed { .. } => Some(
                "Run again with -vv to see where the extraction stopped.".to_string(),
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ExtractError {
    fn from(error: toml::de::Error) -> Self {
        ExtractError::Config {
            message: error.to_string(),
        }
    }
}

impl From<walkdir::Error> for ExtractError {
    fn from(error: walkdir::Error) -> Self {
        let path = error
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match error.into_io_error() {
            Some(io) => ExtractError::Io(io),
            None => ExtractError::InvalidPath {
                path: format!("filesystem loop detected at {}", path),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
