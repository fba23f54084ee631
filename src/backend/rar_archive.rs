use crate::backend::dispatch::{ExtractionDispatcher, ExtractionOutcome};
use std::path::Path;

pub const RAR_FAILURE_MESSAGE: &str =
    "Oops something went wrong. Check that you have rar extension or unrar installed";

/// Output lines unrar prints even when it extracts nothing.
const UNRAR_MIN_LINES: usize = 4;

#[cfg(feature = "native-rar")]
pub fn extract_rar(
    _dispatcher: &ExtractionDispatcher,
    source: &Path,
    destination: &Path,
) -> ExtractionOutcome {
    let (Some(source_str), Some(dest_str)) = (source.to_str(), destination.to_str()) else {
        log::error!("RAR paths must be valid UTF-8: {}", source.display());
        return ExtractionOutcome::failure(RAR_FAILURE_MESSAGE);
    };

    if let Err(e) = std::fs::create_dir_all(destination) {
        log::error!("Cannot create {}: {}", destination.display(), e);
        return ExtractionOutcome::failure(RAR_FAILURE_MESSAGE);
    }

    match rar::Archive::extract_all(source_str, dest_str, "") {
        Ok(_) => ExtractionOutcome::success(),
        Err(e) => {
            log::error!("Failed to extract RAR {}: {:?}", source.display(), e);
            ExtractionOutcome::failure(RAR_FAILURE_MESSAGE)
        }
    }
}

#[cfg(not(feature = "native-rar"))]
pub fn extract_rar(
    dispatcher: &ExtractionDispatcher,
    source: &Path,
    destination: &Path,
) -> ExtractionOutcome {
    // unrar treats a destination without a trailing separator as a file name.
    let mut target = destination.as_os_str().to_os_string();
    target.push(std::path::MAIN_SEPARATOR_STR);

    let args = [
        std::ffi::OsStr::new("x"),
        std::ffi::OsStr::new("-o+"),
        std::ffi::OsStr::new("-y"),
        source.as_os_str(),
        target.as_os_str(),
    ];

    match dispatcher.runner.run(&dispatcher.unrar, args) {
        Ok(output) if output.is_success(dispatcher.success_check(UNRAR_MIN_LINES)) => {
            ExtractionOutcome::success()
        }
        Ok(output) => {
            log::error!(
                "{} exited with {}: {}",
                dispatcher.unrar,
                output.status,
                output.last_line().unwrap_or("no output")
            );
            ExtractionOutcome::failure(RAR_FAILURE_MESSAGE)
        }
        Err(e) => {
            log::error!("{}", e);
            ExtractionOutcome::failure(RAR_FAILURE_MESSAGE)
        }
    }
}

#[cfg(all(test, unix, not(feature = "native-rar")))]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_tool(dir: &Path, script: &str) -> String {
        let path = dir.join("fake-unrar");
        fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_unrar_receives_destination_with_separator() {
        let temp_dir = TempDir::new().unwrap();
        let log = temp_dir.path().join("args.log");
        let tool = fake_tool(
            temp_dir.path(),
            &format!("echo \"$@\" > {}\necho extracted", log.display()),
        );

        let mut tools = ToolsConfig::default();
        tools.unrar = tool;
        let dispatcher = ExtractionDispatcher::new(&tools);

        let source = temp_dir.path().join("music.rar");
        let destination = temp_dir.path().join("music");
        let outcome = extract_rar(&dispatcher, &source, &destination);

        assert!(outcome.is_success());
        let args = fs::read_to_string(&log).unwrap();
        assert_eq!(
            args.trim(),
            format!("x -o+ -y {} {}/", source.display(), destination.display())
        );
    }

    #[test]
    fn test_unrar_failure_message() {
        let temp_dir = TempDir::new().unwrap();
        let tool = fake_tool(temp_dir.path(), "echo 'Cannot open archive' >&2\nexit 10");

        let mut tools = ToolsConfig::default();
        tools.unrar = tool;
        let dispatcher = ExtractionDispatcher::new(&tools);

        let outcome = extract_rar(
            &dispatcher,
            &temp_dir.path().join("broken.rar"),
            &temp_dir.path().join("broken"),
        );
        assert!(!outcome.is_success());
        assert_eq!(outcome.message.as_deref(), Some(RAR_FAILURE_MESSAGE));
    }

    #[test]
    fn test_missing_unrar() {
        let temp_dir = TempDir::new().unwrap();
        let mut tools = ToolsConfig::default();
        tools.unrar = temp_dir.path().join("no-such-unrar").to_string_lossy().into_owned();
        let dispatcher = ExtractionDispatcher::new(&tools);

        let outcome = extract_rar(
            &dispatcher,
            &temp_dir.path().join("music.rar"),
            &temp_dir.path().join("music"),
        );
        assert_eq!(outcome.message.as_deref(), Some(RAR_FAILURE_MESSAGE));
    }
}
