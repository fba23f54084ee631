pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod integrator;
pub mod lock;
pub mod orchestrator;
pub mod policy;
pub mod staging;
pub mod storage;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, PolicyConfig, StorageConfig, ToolsConfig};
pub use error::{ExtractError, Result, UserFriendlyError};

// Core functionality re-exports
pub use backend::{ArchiveType, ExtractionDispatcher, ExtractionOutcome, OutcomeCode};
pub use integrator::{IntegrationPlan, IntegrationReport, OwnershipContext, PostExtractIntegrator};
pub use lock::DestinationLocks;
pub use orchestrator::{ArchiveJob, ExtractionRequest, ExtractionResponse, Orchestrator};
pub use policy::{BlacklistPolicy, FilenamePolicy};
pub use staging::{StagingArea, StagingManager};
pub use storage::{
    FilesystemRescanner, LocalStorage, RequestContext, Rescanner, StoragePathResolver,
    StorageService,
};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;

/// Main library interface: one configured storage plus the orchestrator
/// that runs extraction requests against it.
pub struct CloudExtract {
    config: Config,
    storage: Arc<dyn StorageService>,
    orchestrator: Arc<Orchestrator>,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl CloudExtract {
    /// Create a new instance backed by the local data directory from `config`
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::assemble(config, output_mode, verbose, quiet, shutdown))
    }

    /// Create an instance for testing (no signal handler conflicts)
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self::assemble(
            config,
            output_mode,
            verbose,
            quiet,
            GracefulShutdown::new_for_test(),
        )
    }

    fn assemble(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let storage: Arc<dyn StorageService> = Arc::new(LocalStorage::from_config(&config.storage));
        let rescanner: Arc<dyn Rescanner> = Arc::new(FilesystemRescanner::new(storage.clone()));
        let policy: Arc<dyn FilenamePolicy> = Arc::new(BlacklistPolicy::new(&config.policy));
        let orchestrator = Arc::new(Orchestrator::new(
            &config,
            policy,
            rescanner,
            shutdown.clone(),
        ));

        Self {
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(!quiet && output_mode == OutputMode::Human),
            config,
            storage,
            orchestrator,
            shutdown,
        }
    }

    /// Create an instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            crate::cli::OutputFormat::Human => OutputMode::Human,
            crate::cli::OutputFormat::Json => OutputMode::Json,
            crate::cli::OutputFormat::Plain => OutputMode::Plain,
        };

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    pub fn context_for<S: Into<String>>(&self, user_id: S) -> RequestContext {
        RequestContext::new(user_id, self.storage.clone())
    }

    /// Run one extraction request on a blocking thread.
    pub async fn extract_archive(
        &self,
        user_id: &str,
        request: ExtractionRequest,
    ) -> Result<(ExtractionResponse, Duration)> {
        self.shutdown.check_shutdown()?;

        self.output_formatter.start_operation(&format!(
            "Extracting {} from {}",
            request.archive_file_name, request.directory
        ));
        let spinner = self
            .progress_manager
            .create_spinner(&format!("Extracting {}", request.archive_file_name));

        let start = Instant::now();
        let orchestrator = self.orchestrator.clone();
        let ctx = self.context_for(user_id);
        let response = task::spawn_blocking(move || orchestrator.run(&ctx, &request))
            .await
            .map_err(|e| ExtractError::TaskFailed {
                message: e.to_string(),
            });

        ui::progress::finish_spinner(&spinner);
        Ok((response?, start.elapsed()))
    }

    /// Resolve a request and describe what would happen, without writing anything.
    pub fn plan(&self, user_id: &str, request: &ExtractionRequest) -> Result<(ArchiveJob, String)> {
        let ctx = self.context_for(user_id);
        if ctx.storage.is_encryption_enabled() {
            return Err(ExtractError::UnsupportedConfiguration {
                message: orchestrator::ENCRYPTION_MESSAGE.to_string(),
            });
        }

        let job = self.orchestrator.plan(&ctx, request)?;
        let extract_to = if job.needs_staging() {
            StagingManager::new(
                self.storage.clone(),
                user_id,
                self.config.storage.app_name.clone(),
            )
            .staging_path(&job.archive_file_name)
        } else {
            job.in_place_target()?.display().to_string()
        };

        Ok((job, extract_to))
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &ExtractError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
