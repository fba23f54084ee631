use crate::backend::command::{SuccessCheck, ToolRunner};
use crate::backend::{rar_archive, sevenzip, zip_archive};
use crate::config::{SuccessCheckMode, ToolsConfig};
use crate::staging::staging_manager::file_stem;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Extraction backend selected for an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveType {
    Zip,
    Rar,
    /// A compressed tar (`.tar.gz`, `.tar.xz`, ...) unpacked in two passes.
    TarGz,
    Generic,
}

impl ArchiveType {
    /// Picks the backend from the caller's type hint. An absent or unknown
    /// hint goes to 7-Zip. Archive content is never sniffed.
    pub fn from_hint(hint: Option<&str>, file_name: &str) -> Self {
        let declared = hint.map(|hint| hint.trim().to_lowercase());

        match declared.as_deref() {
            Some("zip") => ArchiveType::Zip,
            Some("rar") => ArchiveType::Rar,
            _ if file_stem(file_name).ends_with(".tar") => ArchiveType::TarGz,
            _ => ArchiveType::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveType::Zip => "zip",
            ArchiveType::Rar => "rar",
            ArchiveType::TarGz => "tar-gz",
            ArchiveType::Generic => "generic",
        }
    }
}

impl fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeCode {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub code: OutcomeCode,
    pub message: Option<String>,
    /// Entries that could not be written although the archive opened.
    pub failed_entries: usize,
}

impl ExtractionOutcome {
    pub fn success() -> Self {
        Self {
            code: OutcomeCode::Success,
            message: None,
            failed_entries: 0,
        }
    }

    pub fn with_failed_entries(failed_entries: usize) -> Self {
        Self {
            code: OutcomeCode::Success,
            message: None,
            failed_entries,
        }
    }

    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self {
            code: OutcomeCode::Failure,
            message: Some(message.into()),
            failed_entries: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == OutcomeCode::Success
    }
}

/// Routes an archive to the zip, rar or 7-Zip backend.
#[derive(Debug, Clone)]
pub struct ExtractionDispatcher {
    pub(crate) runner: ToolRunner,
    pub(crate) unrar: String,
    pub(crate) sevenzip: String,
    success_mode: SuccessCheckMode,
}

impl ExtractionDispatcher {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            runner: ToolRunner::new(tools.timeout_duration()),
            unrar: tools.unrar.clone(),
            sevenzip: tools.sevenzip.clone(),
            success_mode: tools.success_check,
        }
    }

    /// Extracts `source` into `destination`. Never fails; problems are
    /// reported through the outcome.
    pub fn extract(
        &self,
        source: &Path,
        destination: &Path,
        archive_type: ArchiveType,
    ) -> ExtractionOutcome {
        log::info!(
            "Extracting {} ({}) into {}",
            source.display(),
            archive_type,
            destination.display()
        );

        let outcome = match archive_type {
            ArchiveType::Zip => zip_archive::extract_zip(source, destination),
            ArchiveType::Rar => rar_archive::extract_rar(self, source, destination),
            ArchiveType::TarGz => sevenzip::extract_compressed_tar(self, source, destination),
            ArchiveType::Generic => sevenzip::extract_generic(self, source, destination),
        };

        if let Some(ref message) = outcome.message {
            if !outcome.is_success() {
                log::error!("Extraction of {} failed: {}", source.display(), message);
            }
        }
        if outcome.failed_entries > 0 {
            log::warn!(
                "{} entries of {} could not be extracted",
                outcome.failed_entries,
                source.display()
            );
        }

        outcome
    }

    /// Success criterion for a tool whose legacy line threshold is `min_lines`.
    pub(crate) fn success_check(&self, min_lines: usize) -> SuccessCheck {
        match self.success_mode {
            SuccessCheckMode::ExitStatus => SuccessCheck::ExitStatus,
            SuccessCheckMode::OutputLines => SuccessCheck::OutputLines { min_lines },
        }
    }
}
