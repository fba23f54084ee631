use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::orchestrator::ExtractionRequest;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "cloud-extract")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract archives stored in a cloud-storage tree back into that tree")]
#[command(
    long_about = "cloud-extract unpacks a zip, rar, 7z or tar.* archive that lives in a user's \
                  cloud storage. The content lands next to the archive, or goes through a \
                  staging folder when the archive sits on external storage."
)]
#[command(before_help = "📦 cloud-extract - Archive Extraction for Cloud Storage")]
#[command(after_help = "EXAMPLES:\n  \
    cloud-extract photos.zip --directory /Documents --user alice\n  \
    cloud-extract backup.rar -d /SFTP --user alice --external\n  \
    cloud-extract data.tar.gz -d / --user alice --output-format json\n  \
    cloud-extract --generate-config --config cloud-extract.toml")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Archive file name inside --directory
    #[arg(
        value_parser = validate_archive_name,
        required_unless_present = "generate_config"
    )]
    pub archive: Option<String>,

    /// Folder holding the archive, relative to the user's files
    #[arg(short, long, default_value = "/", value_parser = validate_cloud_directory)]
    pub directory: String,

    /// User the extraction runs as
    #[arg(
        short,
        long,
        env = "CLOUD_EXTRACT_USER",
        required_unless_present = "generate_config"
    )]
    pub user: Option<String>,

    /// The archive lives on external storage; extract through a staging folder
    #[arg(long)]
    pub external: bool,

    /// Declared archive type (zip, rar, or anything else for 7-Zip)
    #[arg(short = 't', long = "type", help = "Archive type hint (e.g. zip, rar, 7z)")]
    pub archive_type: Option<String>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Storage data directory
    #[arg(long, help = "Root of the storage data directory")]
    pub data_root: Option<PathBuf>,

    /// External tool timeout in seconds
    #[arg(long, help = "Timeout for unrar/7za runs (seconds)")]
    pub timeout: Option<u64>,

    /// unrar executable
    #[arg(long)]
    pub unrar: Option<String>,

    /// 7-Zip executable
    #[arg(long)]
    pub sevenzip: Option<String>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "Show the extraction plan without writing anything")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_data_root(self.data_root.clone())
            .with_timeout(self.timeout)
            .with_unrar(self.unrar.clone())
            .with_sevenzip(self.sevenzip.clone())
    }

    pub fn extraction_request(&self) -> Option<ExtractionRequest> {
        let archive = self.archive.as_ref()?;
        Some(ExtractionRequest {
            archive_file_name: archive.clone(),
            directory: self.directory.clone(),
            is_external: self.external,
            archive_type_hint: self
                .archive_type
                .clone()
                .or_else(|| extension_hint(archive)),
        })
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Default `log` filter derived from -v/-q.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Type hint implied by a `.zip` or `.rar` extension when `--type` is absent.
fn extension_hint(archive: &str) -> Option<String> {
    let extension = Path::new(archive).extension()?.to_string_lossy().to_lowercase();
    match extension.as_str() {
        "zip" | "rar" => Some(extension),
        _ => None,
    }
}

pub fn validate_archive_name(s: &str) -> std::result::Result<String, String> {
    if s.trim().is_empty() {
        return Err("Archive name must not be empty".to_string());
    }

    if s.contains('/') || s.contains('\\') {
        return Err("Archive name must be a plain file name; use --directory for its folder".to_string());
    }

    if s == "." || s == ".." {
        return Err("Archive name must name a file".to_string());
    }

    Ok(s.to_string())
}

pub fn validate_cloud_directory(s: &str) -> std::result::Result<String, String> {
    if s.split('/').any(|segment| segment == "..") {
        return Err("Directory must not contain '..' segments".to_string());
    }

    if s.contains('\\') {
        return Err("Directory must use '/' as separator".to_string());
    }

    if s.is_empty() {
        Ok("/".to_string())
    } else if s.starts_with('/') {
        Ok(s.to_string())
    } else {
        Ok(format!("/{}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_archive_name_validation() {
        assert!(validate_archive_name("photos.zip").is_ok());
        assert!(validate_archive_name("data.tar.gz").is_ok());

        let invalid = ["", "  ", "../photos.zip", "sub/photos.zip", "..", "a\\b.zip"];
        for name in &invalid {
            assert!(validate_archive_name(name).is_err(), "Should reject: {:?}", name);
        }
    }

    #[test]
    fn test_directory_validation() {
        assert_eq!(validate_cloud_directory("/Documents").unwrap(), "/Documents");
        assert_eq!(validate_cloud_directory("Documents").unwrap(), "/Documents");
        assert_eq!(validate_cloud_directory("").unwrap(), "/");
        assert!(validate_cloud_directory("/Documents/../../bob").is_err());
    }

    #[test]
    fn test_extraction_request() {
        let cli = parse(&[
            "cloud-extract",
            "photos.zip",
            "--directory",
            "/Documents",
            "--user",
            "alice",
            "--type",
            "zip",
        ]);

        let request = cli.extraction_request().unwrap();
        assert_eq!(request.archive_file_name, "photos.zip");
        assert_eq!(request.directory, "/Documents");
        assert!(!request.is_external);
        assert_eq!(request.archive_type_hint.as_deref(), Some("zip"));
        assert_eq!(cli.user_id(), Some("alice"));
    }

    #[test]
    fn test_hint_from_extension_without_type() {
        let zip = parse(&["cloud-extract", "photos.ZIP", "-u", "alice"]);
        assert_eq!(
            zip.extraction_request().unwrap().archive_type_hint.as_deref(),
            Some("zip")
        );

        let rar = parse(&["cloud-extract", "music.rar", "-u", "alice"]);
        assert_eq!(
            rar.extraction_request().unwrap().archive_type_hint.as_deref(),
            Some("rar")
        );

        let tarball = parse(&["cloud-extract", "data.tar.gz", "-u", "alice"]);
        assert!(tarball.extraction_request().unwrap().archive_type_hint.is_none());

        let explicit = parse(&["cloud-extract", "photos.zip", "-u", "alice", "--type", "7z"]);
        assert_eq!(
            explicit.extraction_request().unwrap().archive_type_hint.as_deref(),
            Some("7z")
        );
    }

    #[test]
    fn test_generate_config_needs_no_archive() {
        let cli = parse(&["cloud-extract", "--generate-config"]);
        assert!(cli.generate_config);
        assert!(cli.extraction_request().is_none());
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(parse(&["cloud-extract", "a.zip", "-u", "alice"]).log_filter(), "warn");
        assert_eq!(parse(&["cloud-extract", "a.zip", "-u", "alice", "-vv"]).log_filter(), "debug");
        assert_eq!(parse(&["cloud-extract", "a.zip", "-u", "alice", "-q"]).log_filter(), "error");
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&[
            "cloud-extract",
            "a.zip",
            "-u",
            "alice",
            "--timeout",
            "30",
            "--sevenzip",
            "7z",
        ]);
        let overrides = cli.create_cli_overrides();
        assert_eq!(overrides.timeout, Some(30));
        assert_eq!(overrides.sevenzip.as_deref(), Some("7z"));
        assert!(overrides.data_root.is_none());
    }
}
