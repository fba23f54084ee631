use clap::Parser;
use cloud_extract::orchestrator::FailureKind;
use cloud_extract::{
    Cli, CloudExtract, ExtractError, ExtractionRequest, ExtractionResponse, OutputFormatter,
    OutputMode, UserFriendlyError,
};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(&cli);

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let (Some(user), Some(request)) = (cli.user_id(), cli.extraction_request()) else {
        eprintln!("An archive name and --user are required");
        return 2;
    };

    let app = match CloudExtract::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    if cli.dry_run {
        return handle_dry_run(&app, user, &request);
    }

    match app.extract_archive(user, request).await {
        Ok((response, elapsed)) => {
            app.output_formatter().print_response(&response, elapsed);
            response_exit_code(&response)
        }
        Err(e) => {
            app.handle_error(&e);
            error_exit_code(&e)
        }
    }
}

fn setup_logging(cli: &Cli) {
    let env = env_logger::Env::default().default_filter_or(cli.log_filter());
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "cloud-extract.toml".to_string());

    match CloudExtract::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  cloud-extract <archive> --user <user> --config {}", config_path);
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(
    app: &CloudExtract,
    user: &str,
    request: &ExtractionRequest,
) -> i32 {
    match app.plan(user, request) {
        Ok((job, extract_to)) => {
            app.output_formatter().print_plan(&job, &extract_to);
            0
        }
        Err(e) => {
            app.handle_error(&e);
            error_exit_code(&e)
        }
    }
}

/// Maps a wire result onto a process exit code.
fn response_exit_code(response: &ExtractionResponse) -> i32 {
    if response.is_success() {
        return 0;
    }

    match response.failure_kind {
        Some(FailureKind::Rejected) => 2,
        Some(FailureKind::NotFound) => 3,
        Some(FailureKind::Cancelled) => 130,
        _ => 1,
    }
}

fn error_exit_code(error: &ExtractError) -> i32 {
    match error {
        ExtractError::Cancelled => 130,
        ExtractError::UnsupportedConfiguration { .. } | ExtractError::UnsupportedStorage { .. } => 2,
        ExtractError::NotFound { .. } => 3,
        _ => 1,
    }
}

fn print_startup_error(error: &ExtractError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}
