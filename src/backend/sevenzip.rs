use crate::backend::dispatch::{ExtractionDispatcher, ExtractionOutcome};
use crate::staging::staging_manager::file_stem;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

pub const SEVENZIP_FAILURE_MESSAGE: &str =
    "Oops something went wrong. Check that you have p7zip installed";

/// Output lines 7za prints even when it extracts nothing.
const SEVENZIP_MIN_LINES: usize = 5;

/// `7za -y x <source> -o<destination>`
pub fn extract_generic(
    dispatcher: &ExtractionDispatcher,
    source: &Path,
    destination: &Path,
) -> ExtractionOutcome {
    let mut output_flag = OsString::from("-o");
    output_flag.push(destination.as_os_str());

    let args = [
        OsString::from("-y"),
        OsString::from("x"),
        source.as_os_str().to_os_string(),
        output_flag,
    ];

    match dispatcher.runner.run(&dispatcher.sevenzip, args) {
        Ok(output) if output.is_success(dispatcher.success_check(SEVENZIP_MIN_LINES)) => {
            ExtractionOutcome::success()
        }
        Ok(output) => {
            log::error!(
                "{} exited with {}: {}",
                dispatcher.sevenzip,
                output.status,
                output.last_line().unwrap_or("no output")
            );
            ExtractionOutcome::failure(SEVENZIP_FAILURE_MESSAGE)
        }
        Err(e) => {
            log::error!("{}", e);
            ExtractionOutcome::failure(SEVENZIP_FAILURE_MESSAGE)
        }
    }
}

/// Unpacks `name.tar.<compression>` in two passes: the outer layer yields
/// `<destination>/name.tar`, which is then extracted into `<destination>`
/// and removed.
pub fn extract_compressed_tar(
    dispatcher: &ExtractionDispatcher,
    source: &Path,
    destination: &Path,
) -> ExtractionOutcome {
    let source_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let intermediate = destination.join(file_stem(&source_name));

    let first_pass = extract_generic(dispatcher, source, destination);
    if !first_pass.is_success() {
        remove_intermediate(&intermediate);
        return first_pass;
    }

    let second_pass = extract_generic(dispatcher, &intermediate, destination);
    remove_intermediate(&intermediate);
    second_pass
}

fn remove_intermediate(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("Removed intermediate archive {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
    }
}
