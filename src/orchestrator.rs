use crate::backend::{ArchiveType, ExtractionDispatcher, ExtractionOutcome};
use crate::config::Config;
use crate::error::{ExtractError, Result, UserFriendlyError};
use crate::integrator::{IntegrationPlan, PostExtractIntegrator};
use crate::lock::DestinationLocks;
use crate::policy::FilenamePolicy;
use crate::staging::staging_manager::{file_stem, strip_tar_suffix};
use crate::staging::{StagingArea, StagingManager};
use crate::storage::{join_cloud_path, Node, RequestContext, Rescanner, ResolvedPath, StoragePathResolver};
use crate::ui::GracefulShutdown;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

pub const ENCRYPTION_MESSAGE: &str = "Encryption is not supported yet";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub archive_file_name: String,
    /// User-relative directory holding the archive.
    pub directory: String,
    pub is_external: bool,
    pub archive_type_hint: Option<String>,
}

/// Wire result: `code` is 1 on success, 0 on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub failed_entries: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub removed_files: usize,
    #[serde(default, skip_serializing_if = "is_false")]
    pub partial: bool,
    /// Why the request failed. Not part of the wire result.
    #[serde(skip)]
    pub failure_kind: Option<FailureKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Refused up front: encryption or a storage without local access.
    Rejected,
    NotFound,
    Cancelled,
    Failed,
}

impl FailureKind {
    pub fn from_error(error: &ExtractError) -> Self {
        match error {
            ExtractError::Cancelled => FailureKind::Cancelled,
            ExtractError::UnsupportedConfiguration { .. }
            | ExtractError::UnsupportedStorage { .. } => FailureKind::Rejected,
            e if e.is_not_found() => FailureKind::NotFound,
            _ => FailureKind::Failed,
        }
    }
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ExtractionResponse {
    pub fn failure<S: Into<String>>(message: S) -> Self {
        Self {
            code: 0,
            message: Some(message.into()),
            failure_kind: Some(FailureKind::Failed),
            ..Default::default()
        }
    }

    pub fn from_error(error: &ExtractError) -> Self {
        Self {
            failure_kind: Some(FailureKind::from_error(error)),
            ..Self::failure(error.user_message())
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 1
    }

    fn from_outcome(outcome: &ExtractionOutcome) -> Self {
        Self {
            code: if outcome.is_success() { 1 } else { 0 },
            message: outcome.message.clone(),
            failed_entries: outcome.failed_entries,
            failure_kind: (!outcome.is_success()).then_some(FailureKind::Failed),
            ..Default::default()
        }
    }
}

/// Everything known about one archive once it has been located.
#[derive(Debug)]
pub struct ArchiveJob {
    pub archive_file_name: String,
    pub directory: String,
    pub is_external: bool,
    pub archive_type: ArchiveType,
    pub source_node: Node,
    pub source_local: ResolvedPath,
    pub destination_name: String,
}

impl ArchiveJob {
    /// Sibling folder of the archive, named after it.
    pub fn in_place_target(&self) -> Result<PathBuf> {
        let parent = self
            .source_local
            .path()
            .parent()
            .ok_or_else(|| ExtractError::InvalidPath {
                path: self.source_local.path().display().to_string(),
            })?;
        Ok(parent.join(&self.destination_name))
    }

    /// Remote sources are only reachable through a scratch copy, so their
    /// content always goes through staging.
    pub fn needs_staging(&self) -> bool {
        self.is_external || self.source_local.is_scratch_copy()
    }
}

/// Folder name extracted content lands in: the archive's stem, without the
/// inner `.tar` for compressed tars.
pub fn destination_name(archive_file_name: &str, archive_type: ArchiveType) -> String {
    let stem = file_stem(archive_file_name);
    match archive_type {
        ArchiveType::TarGz => strip_tar_suffix(&stem).to_string(),
        _ => stem,
    }
}

pub struct Orchestrator {
    app_name: String,
    dispatcher: ExtractionDispatcher,
    policy: Arc<dyn FilenamePolicy>,
    rescanner: Arc<dyn Rescanner>,
    locks: DestinationLocks,
    shutdown: GracefulShutdown,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        policy: Arc<dyn FilenamePolicy>,
        rescanner: Arc<dyn Rescanner>,
        shutdown: GracefulShutdown,
    ) -> Self {
        Self {
            app_name: config.storage.app_name.clone(),
            dispatcher: ExtractionDispatcher::new(&config.tools),
            policy,
            rescanner,
            locks: DestinationLocks::new(),
            shutdown,
        }
    }

    /// Runs one extraction request to completion. Blocking; never fails.
    pub fn run(&self, ctx: &RequestContext, request: &ExtractionRequest) -> ExtractionResponse {
        if ctx.storage.is_encryption_enabled() {
            log::info!("Refusing extraction for {}: encryption enabled", ctx.user_id);
            return ExtractionResponse {
                failure_kind: Some(FailureKind::Rejected),
                ..ExtractionResponse::failure(ENCRYPTION_MESSAGE)
            };
        }

        match self.run_job(ctx, request) {
            Ok(response) => response,
            Err(e) => {
                log::error!("Extraction of {} failed: {}", request.archive_file_name, e);
                ExtractionResponse::from_error(&e)
            }
        }
    }

    /// Builds the job for a request without extracting anything.
    pub fn plan(&self, ctx: &RequestContext, request: &ExtractionRequest) -> Result<ArchiveJob> {
        let resolver = StoragePathResolver::new(ctx.storage.clone(), ctx.user_id.clone());
        let (source_node, source_local) =
            resolver.resolve(&request.directory, &request.archive_file_name)?;

        let archive_type = ArchiveType::from_hint(
            request.archive_type_hint.as_deref(),
            &request.archive_file_name,
        );

        Ok(ArchiveJob {
            archive_file_name: request.archive_file_name.clone(),
            directory: request.directory.clone(),
            is_external: request.is_external,
            archive_type,
            destination_name: destination_name(&request.archive_file_name, archive_type),
            source_node,
            source_local,
        })
    }

    fn run_job(&self, ctx: &RequestContext, request: &ExtractionRequest) -> Result<ExtractionResponse> {
        let job = self.plan(ctx, request)?;
        self.shutdown.check_shutdown()?;

        let staging = StagingManager::new(ctx.storage.clone(), ctx.user_id.clone(), self.app_name.clone());
        let destination_relative = join_cloud_path(&job.directory, &job.destination_name);
        let mut lock_keys = vec![ctx.storage.user_path(&ctx.user_id, &destination_relative)];
        if job.needs_staging() {
            lock_keys.push(staging.staging_path(&job.archive_file_name));
        }
        let _guard = self.locks.lock_many(&lock_keys);

        let (extract_to, staging_area) = if job.needs_staging() {
            let area = staging.prepare(&job.archive_file_name)?;
            (area.extract_to.clone(), Some(area))
        } else {
            (job.in_place_target()?, None)
        };

        let outcome = self
            .dispatcher
            .extract(job.source_local.path(), &extract_to, job.archive_type);
        let mut response = ExtractionResponse::from_outcome(&outcome);
        if !outcome.is_success() {
            return Ok(response);
        }

        if let Err(e) = self.shutdown.check_shutdown() {
            self.discard_staging(&staging, staging_area.as_ref());
            return Err(e);
        }

        let integrator = PostExtractIntegrator::new(ctx.clone(), self.policy.clone(), self.rescanner.clone());
        let plan = IntegrationPlan {
            extract_to,
            tmp_path: staging_area.as_ref().map(|area| area.tmp_path.clone()),
            directory: job.directory.clone(),
            destination_name: job.destination_name.clone(),
        };

        match integrator.integrate(&plan) {
            Ok(report) => {
                response.destination = Some(report.destination);
                response.removed_files = report.removed_files;
            }
            Err(e) => {
                log::error!("{}", e);
                self.discard_staging(&staging, staging_area.as_ref());
                response.code = 0;
                response.partial = true;
                response.failure_kind = Some(FailureKind::Failed);
                response.message = Some(e.user_message());
            }
        }

        Ok(response)
    }

    fn discard_staging(&self, staging: &StagingManager, area: Option<&StagingArea>) {
        if let Some(area) = area {
            if let Err(e) = staging.discard(area) {
                log::warn!("Could not discard staging directory {}: {}", area.tmp_path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MountConfig, MountKind, ShareConfig};
    use crate::policy::BlacklistPolicy;
    use crate::storage::{LocalStorage, ScanSummary, StorageService};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingRescanner {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl Rescanner for RecordingRescanner {
        fn scan(&self, owner: &str, full_path: &str) -> Result<ScanSummary> {
            self.calls
                .lock()
                .unwrap()
                .push((owner.to_string(), full_path.to_string()));
            Ok(ScanSummary::default())
        }
    }

    struct Fixture {
        temp_dir: TempDir,
        orchestrator: Orchestrator,
        rescanner: Arc<RecordingRescanner>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_config(Config::default())
        }

        fn with_config(config: Config) -> Self {
            let temp_dir = TempDir::new().unwrap();
            fs::create_dir_all(temp_dir.path().join("alice/files")).unwrap();
            let rescanner = Arc::new(RecordingRescanner::default());
            let orchestrator = Orchestrator::new(
                &config,
                Arc::new(BlacklistPolicy::new(&config.policy)),
                rescanner.clone(),
                GracefulShutdown::new_for_test(),
            );
            Self {
                temp_dir,
                orchestrator,
                rescanner,
            }
        }

        fn ctx(&self, storage: LocalStorage) -> RequestContext {
            let storage: Arc<dyn StorageService> = Arc::new(storage);
            RequestContext::new("alice", storage)
        }

        fn storage(&self) -> LocalStorage {
            LocalStorage::new(self.temp_dir.path())
        }

        fn path(&self, relative: &str) -> PathBuf {
            self.temp_dir.path().join(relative)
        }
    }

    fn request(name: &str, directory: &str, external: bool, hint: Option<&str>) -> ExtractionRequest {
        ExtractionRequest {
            archive_file_name: name.to_string(),
            directory: directory.to_string(),
            is_external: external,
            archive_type_hint: hint.map(str::to_string),
        }
    }

    #[cfg(feature = "zip")]
    fn write_zip(path: &std::path::Path, entries: &[(&str, &[u8])]) {
        use std::io::Write;
        use zip::write::SimpleFileOptions;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut writer = zip::ZipWriter::new(fs::File::create(path).unwrap());
        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    fn file_names(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = walkdir::WalkDir::new(dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(dir).unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_destination_name() {
        assert_eq!(destination_name("photos.zip", ArchiveType::Zip), "photos");
        assert_eq!(destination_name("data.tar.gz", ArchiveType::TarGz), "data");
        assert_eq!(destination_name("data.tar.gz", ArchiveType::Generic), "data.tar");
        assert_eq!(destination_name("archive", ArchiveType::Generic), "archive");
    }

    #[test]
    fn test_response_serialization_omits_empty_fields() {
        let json = serde_json::to_string(&ExtractionResponse {
            code: 1,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json, r#"{"code":1}"#);

        let json = serde_json::to_string(&ExtractionResponse::failure(ENCRYPTION_MESSAGE)).unwrap();
        assert_eq!(json, r#"{"code":0,"message":"Encryption is not supported yet"}"#);
    }

    #[test]
    fn test_encryption_enabled_writes_nothing() {
        let fixture = Fixture::new();
        let docs = fixture.path("alice/files/Documents");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("photos.zip"), b"zip").unwrap();

        let ctx = fixture.ctx(fixture.storage().with_encryption(true));
        let response = fixture
            .orchestrator
            .run(&ctx, &request("photos.zip", "/Documents", true, Some("zip")));

        assert_eq!(response.code, 0);
        assert_eq!(response.message.as_deref(), Some(ENCRYPTION_MESSAGE));
        assert_eq!(response.failure_kind, Some(FailureKind::Rejected));
        assert!(!docs.join("photos").exists());
        assert!(!fixture.path("alice/extract").exists());
    }

    #[test]
    fn test_missing_archive() {
        let fixture = Fixture::new();
        let ctx = fixture.ctx(fixture.storage());
        let response = fixture
            .orchestrator
            .run(&ctx, &request("missing.zip", "/Documents", false, Some("zip")));

        assert_eq!(response.code, 0);
        assert_eq!(response.failure_kind, Some(FailureKind::NotFound));
        assert!(response.message.unwrap().contains("missing.zip"));
    }

    #[cfg(feature = "zip")]
    #[test]
    fn test_photos_zip_in_place() {
        let fixture = Fixture::new();
        write_zip(
            &fixture.path("alice/files/Documents/photos.zip"),
            &[
                ("one.jpg", b"1"),
                ("two.jpg", b"2"),
                ("three.png", b"3"),
                (".htaccess", b"deny from all"),
            ],
        );

        let ctx = fixture.ctx(fixture.storage());
        let response = fixture
            .orchestrator
            .run(&ctx, &request("photos.zip", "/Documents", false, Some("zip")));

        assert_eq!(response.code, 1, "{:?}", response.message);
        assert_eq!(response.removed_files, 1);
        assert_eq!(response.destination.as_deref(), Some("/alice/files/Documents/photos"));
        assert_eq!(
            file_names(&fixture.path("alice/files/Documents/photos")),
            vec!["one.jpg", "three.png", "two.jpg"]
        );

        let calls = fixture.rescanner.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[("alice".to_string(), "/alice/files/Documents/photos".to_string())]
        );
    }

    #[cfg(feature = "zip")]
    #[test]
    fn test_archive_in_root_directory() {
        let fixture = Fixture::new();
        write_zip(&fixture.path("alice/files/photos.zip"), &[("a.jpg", b"a")]);

        let ctx = fixture.ctx(fixture.storage());
        let response = fixture
            .orchestrator
            .run(&ctx, &request("photos.zip", "/", false, Some("zip")));

        assert_eq!(response.code, 1);
        assert_eq!(response.destination.as_deref(), Some("/alice/files/photos"));
        assert!(fixture.path("alice/files/photos/a.jpg").exists());
    }

    #[cfg(feature = "zip")]
    #[test]
    fn test_external_runs_recover_from_leftover_staging() {
        let fixture = Fixture::new();
        write_zip(
            &fixture.path("alice/files/External/photos.zip"),
            &[("a.jpg", b"a"), (".htaccess", b"x")],
        );

        let leftover = fixture.path("alice/extract/photos");
        fs::create_dir_all(&leftover).unwrap();
        fs::write(leftover.join("stale.jpg"), b"old").unwrap();

        let ctx = fixture.ctx(fixture.storage());
        let first = fixture
            .orchestrator
            .run(&ctx, &request("photos.zip", "/External", true, Some("zip")));
        assert_eq!(first.code, 1, "{:?}", first.message);
        assert_eq!(
            file_names(&fixture.path("alice/files/External/photos")),
            vec!["a.jpg"]
        );
        assert!(!leftover.exists());
        assert!(fixture.rescanner.calls.lock().unwrap().is_empty());

        fs::remove_dir_all(fixture.path("alice/files/External/photos")).unwrap();
        fs::create_dir_all(&leftover).unwrap();

        let second = fixture
            .orchestrator
            .run(&ctx, &request("photos.zip", "/External", true, Some("zip")));
        assert_eq!(second.code, 1, "{:?}", second.message);
        assert!(fixture.path("alice/files/External/photos/a.jpg").exists());
    }

    #[cfg(feature = "zip")]
    #[test]
    fn test_staged_integration_failure_rolls_back() {
        let fixture = Fixture::new();
        write_zip(&fixture.path("alice/files/External/photos.zip"), &[("a.jpg", b"a")]);
        fs::create_dir_all(fixture.path("alice/files/External/photos")).unwrap();

        let ctx = fixture.ctx(fixture.storage());
        let response = fixture
            .orchestrator
            .run(&ctx, &request("photos.zip", "/External", true, Some("zip")));

        assert_eq!(response.code, 0);
        assert!(response.partial);
        assert!(!fixture.path("alice/extract/photos").exists());
        assert!(!fixture.path("alice/files/External/photos/a.jpg").exists());
    }

    #[cfg(feature = "zip")]
    #[test]
    fn test_shared_archive_rescans_as_owner() {
        let fixture = Fixture::new();
        write_zip(&fixture.path("bob/files/Projects/data.zip"), &[("report.csv", b"1,2")]);

        let storage = fixture.storage().with_share(ShareConfig {
            owner: "bob".to_string(),
            owner_path: "/Projects".to_string(),
            recipient: "alice".to_string(),
            mount_point: "/Shared".to_string(),
        });
        let ctx = fixture.ctx(storage);
        let response = fixture
            .orchestrator
            .run(&ctx, &request("data.zip", "/Shared", false, Some("zip")));

        assert_eq!(response.code, 1, "{:?}", response.message);
        assert!(fixture.path("bob/files/Projects/data/report.csv").exists());

        let calls = fixture.rescanner.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[("bob".to_string(), "/bob/files/Projects/data".to_string())]
        );
    }

    #[test]
    fn test_cancelled_before_dispatch() {
        let fixture = Fixture::new();
        let docs = fixture.path("alice/files/Documents");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("photos.zip"), b"zip").unwrap();

        fixture.orchestrator.shutdown.request_shutdown();
        let ctx = fixture.ctx(fixture.storage());
        let response = fixture
            .orchestrator
            .run(&ctx, &request("photos.zip", "/Documents", false, Some("zip")));

        assert_eq!(response.code, 0);
        assert_eq!(response.message.as_deref(), Some("Operation was cancelled by user"));
        assert_eq!(response.failure_kind, Some(FailureKind::Cancelled));
        assert!(!docs.join("photos").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_tar_gz_without_hint() {
        use std::os::unix::fs::PermissionsExt;

        let tools_dir = TempDir::new().unwrap();
        let fake = tools_dir.path().join("fake-7za");
        fs::write(
            &fake,
            "#!/bin/sh\nsrc=\"$3\"\ndest=\"${4#-o}\"\nmkdir -p \"$dest\"\n\
             case \"$src\" in\n  *.gz) echo tar > \"$dest/$(basename \"$src\" .gz)\" ;;\n  \
             *.tar) echo inner > \"$dest/inner.txt\" ;;\nesac\necho \"Everything is Ok\"\n",
        )
        .unwrap();
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = Config::default();
        config.tools.sevenzip = fake.to_string_lossy().into_owned();
        let fixture = Fixture::with_config(config);
        let docs = fixture.path("alice/files/Documents");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("data.tar.gz"), b"gz").unwrap();

        let ctx = fixture.ctx(fixture.storage());
        let response = fixture
            .orchestrator
            .run(&ctx, &request("data.tar.gz", "/Documents", false, None));

        assert_eq!(response.code, 1, "{:?}", response.message);
        assert!(docs.join("data/inner.txt").exists());
        assert!(!docs.join("data/data.tar").exists());
    }

    #[cfg(feature = "zip")]
    #[test]
    fn test_remote_source_goes_through_staging() {
        let fixture = Fixture::new();
        let remote = TempDir::new().unwrap();
        write_zip(
            &remote.path().join("photos.zip"),
            &[("a.jpg", b"a"), (".htaccess", b"deny")],
        );

        let storage = fixture.storage().with_mount(MountConfig {
            user: "*".to_string(),
            mount_point: "/SFTP".to_string(),
            local_root: remote.path().to_path_buf(),
            kind: MountKind::Remote,
        });
        let ctx = fixture.ctx(storage);

        let req = request("photos.zip", "/SFTP", false, Some("zip"));
        let job = fixture.orchestrator.plan(&ctx, &req).unwrap();
        assert!(job.source_local.is_scratch_copy());
        assert!(job.needs_staging());
        drop(job);

        let response = fixture.orchestrator.run(&ctx, &req);

        assert_eq!(response.code, 1, "{:?}", response.message);
        assert_eq!(response.destination.as_deref(), Some("/alice/files/SFTP/photos"));
        assert_eq!(response.removed_files, 1);
        assert_eq!(file_names(&remote.path().join("photos")), vec!["a.jpg"]);
        assert!(!fixture.path("alice/extract/photos").exists());
        assert!(fixture.rescanner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_encrypted_mount_is_rejected() {
        let fixture = Fixture::new();
        let vault = TempDir::new().unwrap();
        fs::write(vault.path().join("secret.zip"), b"cipher").unwrap();

        let storage = fixture.storage().with_mount(MountConfig {
            user: "alice".to_string(),
            mount_point: "/Vault".to_string(),
            local_root: vault.path().to_path_buf(),
            kind: MountKind::Encrypted,
        });
        let ctx = fixture.ctx(storage);

        let response = fixture
            .orchestrator
            .run(&ctx, &request("secret.zip", "/Vault", false, Some("zip")));

        assert_eq!(response.code, 0);
        assert_eq!(response.failure_kind, Some(FailureKind::Rejected));
        assert!(response.message.unwrap().contains("/alice/files/Vault/secret.zip"));
        assert!(!vault.path().join("secret").exists());
        assert!(!fixture.path("alice/extract").exists());
        assert!(fixture.rescanner.calls.lock().unwrap().is_empty());
    }

    #[cfg(all(unix, not(feature = "native-rar")))]
    #[test]
    fn test_rar_in_place_with_unrar() {
        use std::os::unix::fs::PermissionsExt;

        let tools_dir = TempDir::new().unwrap();
        let fake = tools_dir.path().join("fake-unrar");
        fs::write(
            &fake,
            "#!/bin/sh\ndest=\"$5\"\nmkdir -p \"$dest\"\n\
             echo music > \"${dest}track.mp3\"\necho deny > \"${dest}.htaccess\"\n\
             echo \"All OK\"\n",
        )
        .unwrap();
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = Config::default();
        config.tools.unrar = fake.to_string_lossy().into_owned();
        let fixture = Fixture::with_config(config);
        let docs = fixture.path("alice/files/Documents");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("music.rar"), b"rar").unwrap();

        let ctx = fixture.ctx(fixture.storage());
        let response = fixture
            .orchestrator
            .run(&ctx, &request("music.rar", "/Documents", false, Some("rar")));

        assert_eq!(response.code, 1, "{:?}", response.message);
        assert_eq!(response.removed_files, 1);
        assert_eq!(file_names(&docs.join("music")), vec!["track.mp3"]);

        let calls = fixture.rescanner.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[("alice".to_string(), "/alice/files/Documents/music".to_string())]
        );
    }

    #[cfg(feature = "zip")]
    #[tokio::test]
    async fn test_run_from_async_context() {
        let fixture = Fixture::new();
        write_zip(&fixture.path("alice/files/photos.zip"), &[("a.jpg", b"a")]);

        let ctx = fixture.ctx(fixture.storage());
        let response = fixture
            .orchestrator
            .run(&ctx, &request("photos.zip", "/", false, Some("zip")));

        assert_eq!(response.code, 1, "{:?}", response.message);
        assert!(fixture.path("alice/files/photos/a.jpg").exists());
    }
}
