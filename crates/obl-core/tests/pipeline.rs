//! End-to-end install runs against mock version and mirror servers.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mockito::{Mock, Server, ServerOpts};
use obl_core::install::ArchiveOutcome;
use obl_core::locator::find_executable;
use obl_core::manifest::ManifestError;
use obl_core::state::{InstallLock, SETTINGS_XML, StateError};
use obl_core::{
    ChannelReporter, InstallError, InstallOutcome, InstallStatus, Installer, InstallerConfig,
    NullReporter, Reporter, StatusEvent, http_client, paths,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use zip::write::SimpleFileOptions;

const RELEASE: &str = "0.1.0";

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
    work: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("RobloxPlayer");
        let work = temp.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        Self {
            _temp: temp,
            root,
            work,
        }
    }

    fn config(&self, version_url: &str, mirrors: &[String]) -> InstallerConfig {
        InstallerConfig::default()
            .with_install_dir(&self.root)
            .with_work_dir(&self.work)
            .with_version_url(version_url)
            .with_mirrors(mirrors.iter().cloned())
            .with_timeouts(1, 10)
    }

    fn installer(&self, config: InstallerConfig, reporter: Arc<dyn Reporter>) -> Installer {
        let client = http_client(&config).unwrap();
        Installer::new(config, client, reporter)
    }

    fn version_file(&self) -> PathBuf {
        paths::version_file(&self.root)
    }

    fn work_is_empty(&self) -> bool {
        std::fs::read_dir(&self.work).unwrap().next().is_none()
    }

    fn lock_is_free(&self) -> bool {
        let mut lock = InstallLock::open(&self.root).unwrap();
        lock.try_acquire().is_ok()
    }
}

/// Cancels its token as soon as the first archive finishes.
struct CancelAfterFirstArchive(CancellationToken);

impl Reporter for CancelAfterFirstArchive {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &str, _: u64, _: Option<u64>) {}
    fn archive_done(&self, _: &str, _: &str) {
        self.0.cancel();
    }
    fn archive_failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: usize) {}
}

fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn manifest_body(archives: &[&str]) -> String {
    let mut body = String::from("v0\n");
    for name in archives {
        body.push_str(&format!("{name}\n0123456789abcdef\n1024\n4096\n"));
    }
    body
}

fn base(server: &Server) -> String {
    format!("{}/", server.url())
}

async fn version_endpoint(server: &mut Server, release: &str) -> (Mock, String) {
    let mock = server
        .mock("GET", "/version")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"version":"2.650.1","clientVersionUpload":"{release}"}}"#
        ))
        .create_async()
        .await;
    (mock, format!("{}/version", server.url()))
}

async fn serve_manifest(server: &mut Server, archives: &[&str]) -> Mock {
    server
        .mock("GET", format!("/{RELEASE}-rbxPkgManifest.txt").as_str())
        .with_status(200)
        .with_body(manifest_body(archives))
        .create_async()
        .await
}

async fn serve_archive(server: &mut Server, name: &str, body: Vec<u8>) -> Mock {
    server
        .mock("GET", format!("/{RELEASE}-{name}").as_str())
        .with_status(200)
        .with_body(body)
        .create_async()
        .await
}

fn unwrap_report(outcome: InstallOutcome) -> obl_core::InstallReport {
    match outcome {
        InstallOutcome::Installed(report) => report,
        InstallOutcome::UpToDate(release) => panic!("unexpected up-to-date for {release}"),
    }
}

#[tokio::test]
async fn test_install_fails_over_and_pins_second_mirror() {
    let fx = Fixture::new();
    let mut meta = Server::new_async().await;
    // Unpooled: the stalled body blocks this server's thread past the test.
    let mut slow = Server::new_with_opts_async(ServerOpts::default()).await;
    let mut good = Server::new_async().await;

    let (_version, version_url) = version_endpoint(&mut meta, RELEASE).await;

    // Mirror 1 stalls past the metadata timeout.
    let _stalled = slow
        .mock("GET", format!("/{RELEASE}-rbxPkgManifest.txt").as_str())
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_secs(3));
            w.write_all(b"v0\n")
        })
        .create_async()
        .await;
    let never = slow
        .mock("GET", mockito::Matcher::Regex(r"\.zip$".to_string()))
        .expect(0)
        .create_async()
        .await;

    let _manifest = serve_manifest(&mut good, &["Libraries.zip", "content-sounds.zip"]).await;
    let libraries = serve_archive(
        &mut good,
        "Libraries.zip",
        zip_bytes(&[
            ("RobloxPlayerBeta.exe", "MZ"),
            ("libcef.dll", "dll"),
        ]),
    )
    .await;
    let sounds = serve_archive(
        &mut good,
        "content-sounds.zip",
        zip_bytes(&[("ouch.ogg", "ouch"), ("ui/click.ogg", "click")]),
    )
    .await;

    let mirrors = vec![base(&slow), base(&good)];
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let installer = fx.installer(
        fx.config(&version_url, &mirrors),
        Arc::new(ChannelReporter::new(tx)),
    );

    let report = unwrap_report(installer.run(false).await.unwrap());

    assert_eq!(report.status(), InstallStatus::Complete);
    assert_eq!(report.release, RELEASE);
    assert_eq!(report.mirror, mirrors[1]);
    assert_eq!(report.installed_count(), 2);
    assert!(report.settings_written);
    assert!(report.version_recorded);

    assert!(fx.root.join("libcef.dll").is_file());
    assert_eq!(
        std::fs::read(fx.root.join("content/sounds/ouch.ogg")).unwrap(),
        b"ouch"
    );
    assert!(fx.root.join("content/sounds/ui/click.ogg").is_file());
    assert_eq!(std::fs::read_to_string(fx.version_file()).unwrap(), RELEASE);
    assert_eq!(
        std::fs::read_to_string(paths::settings_file(&fx.root)).unwrap(),
        SETTINGS_XML
    );
    assert!(fx.lock_is_free());
    assert!(fx.work_is_empty());

    assert_eq!(
        find_executable(&fx.root, ".exe", "robloxplayer").unwrap(),
        fx.root.join("RobloxPlayerBeta.exe")
    );

    libraries.assert_async().await;
    sounds.assert_async().await;
    never.assert_async().await;

    let events: Vec<StatusEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert!(events.contains(&StatusEvent::Info(format!("Latest release: {RELEASE}"))));
    assert!(events.iter().any(|e| matches!(e, StatusEvent::Warning(w) if w.contains("failed"))));
    assert_eq!(
        events.last(),
        Some(&StatusEvent::Summary {
            succeeded: 2,
            total: 2
        })
    );
}

#[tokio::test]
async fn test_archive_404_fails_run_and_removes_stale_version() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["ssl.zip"]).await;
    let _missing = server
        .mock("GET", format!("/{RELEASE}-ssl.zip").as_str())
        .with_status(404)
        .create_async()
        .await;

    std::fs::create_dir_all(&fx.root).unwrap();
    std::fs::write(fx.version_file(), "0.0.9").unwrap();

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    let report = unwrap_report(installer.run(false).await.unwrap());

    assert_eq!(report.status(), InstallStatus::Failed);
    assert_eq!(report.installed_count(), 0);
    match &report.archives[0] {
        ArchiveOutcome::Failed { filename, reason } => {
            assert_eq!(filename, "ssl.zip");
            assert!(reason.contains("404"), "reason: {reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!report.version_recorded);
    assert!(!fx.version_file().exists());
    assert!(fx.work_is_empty());
}

#[tokio::test]
async fn test_partial_install_does_not_record_version() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip", "ssl.zip", "shaders.zip"]).await;
    let _lib = serve_archive(&mut server, "Libraries.zip", zip_bytes(&[("a.dll", "a")])).await;
    let _ssl = server
        .mock("GET", format!("/{RELEASE}-ssl.zip").as_str())
        .with_status(500)
        .create_async()
        .await;
    let _shaders = serve_archive(&mut server, "shaders.zip", zip_bytes(&[("s.bin", "s")])).await;

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    let report = unwrap_report(installer.run(false).await.unwrap());

    assert_eq!(
        report.status(),
        InstallStatus::Partial {
            failed: vec!["ssl.zip".to_string()]
        }
    );
    assert!(fx.root.join("a.dll").is_file());
    assert!(fx.root.join("shaders/s.bin").is_file());
    assert!(report.settings_written);
    assert!(!fx.version_file().exists());
}

#[tokio::test]
async fn test_second_run_is_up_to_date_without_downloads() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let manifest = server
        .mock("GET", format!("/{RELEASE}-rbxPkgManifest.txt").as_str())
        .with_status(200)
        .with_body(manifest_body(&["Libraries.zip"]))
        .expect(1)
        .create_async()
        .await;
    let archive = server
        .mock("GET", format!("/{RELEASE}-Libraries.zip").as_str())
        .with_status(200)
        .with_body(zip_bytes(&[("a.dll", "a")]))
        .expect(1)
        .create_async()
        .await;

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );

    let first = installer.run(false).await.unwrap();
    assert!(first.is_success());

    let second = installer.run(false).await.unwrap();
    assert_eq!(
        second,
        InstallOutcome::UpToDate(obl_core::ReleaseId::new(RELEASE).unwrap())
    );

    manifest.assert_async().await;
    archive.assert_async().await;
}

#[tokio::test]
async fn test_missing_sentinel_triggers_reinstall() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip"]).await;
    let archive = server
        .mock("GET", format!("/{RELEASE}-Libraries.zip").as_str())
        .with_status(200)
        .with_body(zip_bytes(&[("a.dll", "a")]))
        .expect(2)
        .create_async()
        .await;

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    assert!(installer.run(false).await.unwrap().is_success());

    std::fs::remove_file(paths::settings_file(&fx.root)).unwrap();
    assert_eq!(std::fs::read_to_string(fx.version_file()).unwrap(), RELEASE);

    let rerun = unwrap_report(installer.run(false).await.unwrap());
    assert_eq!(rerun.status(), InstallStatus::Complete);
    assert!(paths::settings_file(&fx.root).is_file());

    archive.assert_async().await;
}

#[tokio::test]
async fn test_force_reinstalls_current_release() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip"]).await;
    let archive = server
        .mock("GET", format!("/{RELEASE}-Libraries.zip").as_str())
        .with_status(200)
        .with_body(zip_bytes(&[("a.dll", "a")]))
        .expect(2)
        .create_async()
        .await;

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    assert!(installer.run(false).await.unwrap().is_success());
    assert!(matches!(
        installer.run(true).await.unwrap(),
        InstallOutcome::Installed(_)
    ));

    archive.assert_async().await;
}

#[tokio::test]
async fn test_traversal_entry_skipped_inside_pipeline() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["content-sky.zip"]).await;
    let _sky = serve_archive(
        &mut server,
        "content-sky.zip",
        zip_bytes(&[
            ("sky.tex", "blue"),
            ("../../evil.txt", "pwned"),
            ("night/stars.tex", "dots"),
        ]),
    )
    .await;

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    let report = unwrap_report(installer.run(false).await.unwrap());

    assert_eq!(report.status(), InstallStatus::Complete);
    match &report.archives[0] {
        ArchiveOutcome::Installed { files, skipped, .. } => {
            assert_eq!(*files, 2);
            assert_eq!(skipped, &vec!["../../evil.txt".to_string()]);
        }
        other => panic!("expected install, got {other:?}"),
    }
    assert!(fx.root.join("content/sky/night/stars.tex").is_file());
    assert!(!fx.root.join("evil.txt").exists());
    assert!(!fx.root.join("content/evil.txt").exists());
}

#[tokio::test]
async fn test_unmapped_archive_lands_in_root() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["content-brand-new.zip"]).await;
    let _new = serve_archive(
        &mut server,
        "content-brand-new.zip",
        zip_bytes(&[("new.bin", "1")]),
    )
    .await;

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    let report = unwrap_report(installer.run(false).await.unwrap());

    assert_eq!(report.status(), InstallStatus::Complete);
    assert!(fx.root.join("new.bin").is_file());
}

#[tokio::test]
async fn test_empty_manifest_is_nothing_to_install() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &[]).await;

    std::fs::create_dir_all(&fx.root).unwrap();
    std::fs::write(fx.version_file(), "0.0.9").unwrap();

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    let report = unwrap_report(installer.run(false).await.unwrap());

    assert_eq!(report.status(), InstallStatus::NothingToInstall);
    assert!(!report.settings_written);
    assert!(!paths::settings_file(&fx.root).exists());
    assert!(!fx.version_file().exists());
}

#[tokio::test]
async fn test_version_failure_aborts_before_touching_disk() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let _version = server
        .mock("GET", "/version")
        .with_status(503)
        .create_async()
        .await;
    let manifest = server
        .mock("GET", mockito::Matcher::Regex("rbxPkgManifest".to_string()))
        .expect(0)
        .create_async()
        .await;

    let installer = fx.installer(
        fx.config(&format!("{}/version", server.url()), &[base(&server)]),
        Arc::new(NullReporter),
    );
    let err = installer.run(false).await.unwrap_err();

    assert!(matches!(err, InstallError::VersionUnavailable));
    assert!(!fx.root.exists());
    manifest.assert_async().await;
}

#[tokio::test]
async fn test_no_mirror_serves_manifest() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _gone = server
        .mock("GET", format!("/{RELEASE}-rbxPkgManifest.txt").as_str())
        .with_status(404)
        .create_async()
        .await;

    let installer = fx.installer(
        fx.config(
            &version_url,
            &[base(&server), "http://127.0.0.1:9/".to_string()],
        ),
        Arc::new(NullReporter),
    );
    let err = installer.run(false).await.unwrap_err();

    match err {
        InstallError::Manifest(ManifestError::Unavailable { attempts, .. }) => {
            assert_eq!(attempts.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!fx.root.exists());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let fx = Fixture::new();
    let token = CancellationToken::new();
    token.cancel();

    let installer = fx
        .installer(
            fx.config("http://127.0.0.1:9/version", &["http://127.0.0.1:9/".to_string()]),
            Arc::new(NullReporter),
        )
        .with_cancellation(token);

    assert!(matches!(
        installer.run(false).await,
        Err(InstallError::Cancelled)
    ));
}

#[tokio::test]
async fn test_locked_root_is_refused() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip"]).await;
    let archive = server
        .mock("GET", format!("/{RELEASE}-Libraries.zip").as_str())
        .expect(0)
        .create_async()
        .await;

    let mut held = InstallLock::open(&fx.root).unwrap();
    let _guard = held.try_acquire().unwrap();
    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );

    assert!(matches!(
        installer.run(false).await,
        Err(InstallError::State(StateError::Locked { .. }))
    ));
    archive.assert_async().await;
}

#[tokio::test]
async fn test_stale_lock_file_does_not_block_install() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip"]).await;
    let _lib = serve_archive(&mut server, "Libraries.zip", zip_bytes(&[("a.dll", "a")])).await;

    // Left behind by a run that was killed.
    std::fs::create_dir_all(&fx.root).unwrap();
    std::fs::write(paths::lock_file(&fx.root), "999999\n").unwrap();

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    let report = unwrap_report(installer.run(false).await.unwrap());

    assert_eq!(report.status(), InstallStatus::Complete);
    assert!(fx.lock_is_free());
}

#[tokio::test]
async fn test_unopenable_lock_is_a_state_error() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip"]).await;

    // The root is a plain file, so neither it nor the lock can be created.
    std::fs::write(&fx.root, "not a directory").unwrap();

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );

    assert!(matches!(
        installer.run(false).await,
        Err(InstallError::State(StateError::Io { .. }))
    ));
}

#[tokio::test]
async fn test_cancel_between_archives_stops_the_loop() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip", "ssl.zip"]).await;
    let first = server
        .mock("GET", format!("/{RELEASE}-Libraries.zip").as_str())
        .with_status(200)
        .with_body(zip_bytes(&[("a.dll", "a")]))
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", format!("/{RELEASE}-ssl.zip").as_str())
        .expect(0)
        .create_async()
        .await;

    std::fs::create_dir_all(&fx.root).unwrap();
    std::fs::write(fx.version_file(), "0.0.9").unwrap();

    let token = CancellationToken::new();
    let installer = fx
        .installer(
            fx.config(&version_url, &[base(&server)]),
            Arc::new(CancelAfterFirstArchive(token.clone())),
        )
        .with_cancellation(token);

    assert!(matches!(
        installer.run(false).await,
        Err(InstallError::Cancelled)
    ));
    assert!(fx.root.join("a.dll").is_file());
    assert!(!fx.version_file().exists());
    assert!(!paths::settings_file(&fx.root).exists());
    assert!(fx.lock_is_free());

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_cancel_during_download_drops_the_transfer() {
    let fx = Fixture::new();
    // Unpooled: the stalled body blocks this server's thread past the test.
    let mut server = Server::new_with_opts_async(ServerOpts::default()).await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip"]).await;
    let _stalled = server
        .mock("GET", format!("/{RELEASE}-Libraries.zip").as_str())
        .with_status(200)
        .with_chunked_body(|w| {
            w.write_all(b"PK")?;
            std::thread::sleep(Duration::from_secs(5));
            w.write_all(b"rest")
        })
        .create_async()
        .await;

    let token = CancellationToken::new();
    let installer = fx
        .installer(
            fx.config(&version_url, &[base(&server)]),
            Arc::new(NullReporter),
        )
        .with_cancellation(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        token.cancel();
    });

    let started = Instant::now();
    let result = installer.run(false).await;
    canceller.await.unwrap();

    assert!(matches!(result, Err(InstallError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(fx.work_is_empty());
    assert!(!fx.version_file().exists());
    assert!(fx.lock_is_free());
}

#[tokio::test]
async fn test_uncreatable_destination_fails_only_that_archive() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip", "shaders.zip"]).await;
    let _lib = serve_archive(&mut server, "Libraries.zip", zip_bytes(&[("a.dll", "a")])).await;
    let shaders = server
        .mock("GET", format!("/{RELEASE}-shaders.zip").as_str())
        .expect(0)
        .create_async()
        .await;

    // A plain file where the shaders directory belongs.
    std::fs::create_dir_all(&fx.root).unwrap();
    std::fs::write(fx.root.join("shaders"), "not a directory").unwrap();

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    let report = unwrap_report(installer.run(false).await.unwrap());

    assert_eq!(
        report.status(),
        InstallStatus::Partial {
            failed: vec!["shaders.zip".to_string()]
        }
    );
    match &report.archives[1] {
        ArchiveOutcome::Failed { reason, .. } => {
            assert!(reason.starts_with("cannot create"), "reason: {reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(fx.root.join("a.dll").is_file());
    assert!(!fx.version_file().exists());
    shaders.assert_async().await;
}

#[tokio::test]
async fn test_settings_write_failure_leaves_run_unrecorded() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip"]).await;
    let _lib = serve_archive(&mut server, "Libraries.zip", zip_bytes(&[("a.dll", "a")])).await;

    // A directory in place of the sentinel makes the write fail.
    std::fs::create_dir_all(paths::settings_file(&fx.root)).unwrap();
    std::fs::write(fx.version_file(), RELEASE).unwrap();

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    let outcome = installer.run(false).await.unwrap();
    assert!(!outcome.is_success());

    let report = unwrap_report(outcome);
    assert_eq!(report.status(), InstallStatus::Unrecorded);
    assert_eq!(report.installed_count(), 1);
    assert!(!report.settings_written);
    assert!(!report.version_recorded);
    assert!(fx.root.join("a.dll").is_file());
    assert!(!fx.version_file().exists());
}

#[tokio::test]
async fn test_manifest_name_with_path_is_refused() {
    let fx = Fixture::new();
    let mut server = Server::new_async().await;
    let (_version, version_url) = version_endpoint(&mut server, RELEASE).await;
    let _manifest = serve_manifest(&mut server, &["Libraries.zip", "../x.zip"]).await;
    let _lib = serve_archive(&mut server, "Libraries.zip", zip_bytes(&[("a.dll", "a")])).await;
    let escaped = server
        .mock("GET", mockito::Matcher::Regex(r"x\.zip$".to_string()))
        .expect(0)
        .create_async()
        .await;

    let installer = fx.installer(
        fx.config(&version_url, &[base(&server)]),
        Arc::new(NullReporter),
    );
    let report = unwrap_report(installer.run(false).await.unwrap());

    assert_eq!(
        report.status(),
        InstallStatus::Partial {
            failed: vec!["../x.zip".to_string()]
        }
    );
    let outside: Vec<_> = std::fs::read_dir(fx.work.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(outside.len(), 2, "unexpected entries: {outside:?}");
    assert!(fx.work_is_empty());
    escaped.assert_async().await;
}

#[test]
fn test_locator_fixture_tree() {
    let temp = TempDir::new().unwrap();
    let exe = temp
        .path()
        .join("RobloxPlayer")
        .join("Versions")
        .join("abc")
        .join("RobloxPlayerBeta.exe");
    std::fs::create_dir_all(exe.parent().unwrap()).unwrap();
    std::fs::write(&exe, b"MZ").unwrap();
    std::fs::write(temp.path().join("RobloxPlayer").join("readme.txt"), b"hi").unwrap();

    let found = find_executable(temp.path(), ".exe", "RobloxPlayer").unwrap();
    assert_eq!(found, exe);
    assert!(Path::new(&found).ends_with("Versions/abc/RobloxPlayerBeta.exe"));
}
