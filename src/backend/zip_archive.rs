use crate::backend::dispatch::ExtractionOutcome;
use std::path::Path;

#[cfg(feature = "zip")]
pub fn extract_zip(source: &Path, destination: &Path) -> ExtractionOutcome {
    use std::fs;
    use std::io;

    let mut archive = match fs::File::open(source)
        .map_err(zip::result::ZipError::Io)
        .and_then(zip::ZipArchive::new)
    {
        Ok(archive) => archive,
        Err(e) => {
            log::debug!("Cannot open {}: {}", source.display(), e);
            return ExtractionOutcome::failure("Cannot open Zip file");
        }
    };

    if let Err(e) = fs::create_dir_all(destination) {
        log::error!("Cannot create {}: {}", destination.display(), e);
        return ExtractionOutcome::failure(format!(
            "Cannot create destination folder {}",
            destination.display()
        ));
    }

    let mut failed_entries = 0;
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping entry {} of {}: {}", i, source.display(), e);
                failed_entries += 1;
                continue;
            }
        };

        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                log::warn!("Skipping unsafe entry path {:?}", entry.name());
                failed_entries += 1;
                continue;
            }
        };

        let output_path = destination.join(&entry_path);
        let written = if entry.is_dir() {
            fs::create_dir_all(&output_path)
        } else {
            output_path
                .parent()
                .map(fs::create_dir_all)
                .unwrap_or(Ok(()))
                .and_then(|_| fs::File::create(&output_path))
                .and_then(|mut outfile| io::copy(&mut entry, &mut outfile).map(|_| ()))
        };

        if let Err(e) = written {
            log::warn!("Failed to extract {}: {}", entry_path.display(), e);
            failed_entries += 1;
        }
    }

    ExtractionOutcome::with_failed_entries(failed_entries)
}

#[cfg(not(feature = "zip"))]
pub fn extract_zip(_source: &Path, _destination: &Path) -> ExtractionOutcome {
    ExtractionOutcome::failure("Zip extension is not available")
}
