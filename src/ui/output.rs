use crate::error::{ExtractError, UserFriendlyError};
use crate::orchestrator::{ArchiveJob, ExtractionResponse};
use console::{style, Emoji, Term};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static PACKAGE: Emoji = Emoji("📦 ", "> ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", PACKAGE, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &ExtractError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => eprintln!("SUGGESTION: {}", suggestion),
            }
        }
    }

    /// Prints the result of one request. JSON mode prints the wire result verbatim.
    pub fn print_response(&self, response: &ExtractionResponse, elapsed: Duration) {
        match self.mode {
            OutputMode::Json => {
                println!(
                    "{}",
                    serde_json::to_string(response).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputMode::Plain => {
                println!("CODE: {}", response.code);
                if let Some(ref message) = response.message {
                    println!("MESSAGE: {}", message);
                }
                if let Some(ref destination) = response.destination {
                    println!("DESTINATION: {}", destination);
                }
                if response.removed_files > 0 {
                    println!("REMOVED: {}", response.removed_files);
                }
                if response.failed_entries > 0 {
                    println!("FAILED_ENTRIES: {}", response.failed_entries);
                }
                if response.partial {
                    println!("PARTIAL: true");
                }
            }
            OutputMode::Human => self.print_human_response(response, elapsed),
        }
    }

    pub fn print_plan(&self, job: &ArchiveJob, extract_to: &str) {
        match self.mode {
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "plan",
                    "archive": job.source_node.path,
                    "archive_type": job.archive_type,
                    "staged": job.needs_staging(),
                    "extract_to": extract_to,
                    "destination_name": job.destination_name,
                }));
            }
            OutputMode::Plain => {
                println!("ARCHIVE: {}", job.source_node.path);
                println!("TYPE: {}", job.archive_type);
                println!("STAGED: {}", job.needs_staging());
                println!("EXTRACT_TO: {}", extract_to);
            }
            OutputMode::Human => {
                let size = std::fs::metadata(job.source_local.path())
                    .map(|m| format_bytes(m.len()))
                    .unwrap_or_else(|_| "unknown size".to_string());
                println!("Dry run, nothing will be written:");
                println!("  Archive:     {} ({})", job.source_node.path, size);
                println!("  Type:        {}", job.archive_type);
                println!(
                    "  Mode:        {}",
                    if job.needs_staging() { "staged" } else { "in place" }
                );
                println!("  Extract to:  {}", extract_to);
            }
        }
    }

    fn print_human_response(&self, response: &ExtractionResponse, elapsed: Duration) {
        if self.quiet && response.is_success() {
            return;
        }

        if response.is_success() {
            let destination = response.destination.as_deref().unwrap_or("destination");
            self.print_human_message(
                MessageType::Success,
                &format!(
                    "Extracted into {} in {}",
                    destination,
                    format_duration(elapsed)
                ),
            );
        } else {
            self.print_human_message(
                MessageType::Error,
                response.message.as_deref().unwrap_or("Extraction failed"),
            );
        }

        if response.removed_files > 0 {
            self.print_human_message(
                MessageType::Warning,
                &format!("Removed {} blacklisted file(s)", response.removed_files),
            );
        }
        if response.failed_entries > 0 {
            self.print_human_message(
                MessageType::Warning,
                &format!("{} entries could not be extracted", response.failed_entries),
            );
        }
        if response.partial {
            self.print_human_message(
                MessageType::Warning,
                "The archive was extracted but the result could not be placed",
            );
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
