//! Integration tests for the install pipeline

#[cfg(test)]
mod tests {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use spkg_builder::DependencyProbe;
    use spkg_errors::{Error, FetchError, InstallError, VerificationError};
    use spkg_events::{channel, AppEvent, EventReceiver, InstallEvent};
    use spkg_hash::{HashAlgorithm, IntegrityHash};
    use spkg_install::{InstallConfig, Installer};
    use spkg_types::{InstallStage, PackageDescriptor};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const SCRIPT: &[u8] = b"#!/bin/sh\necho \"hello $HELLO_VERSION: greets people\"\n";
    const BUILD: &str = "sed 's/$HELLO_VERSION/{version}/' hello.sh > {bin}/hello && chmod +x {bin}/hello";

    struct Fixture {
        temp: TempDir,
        archive: PathBuf,
        sha256: String,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempfile::tempdir().unwrap();
            let archive = temp.path().join("hello-1.4.2.tar.gz");
            write_source_archive(&archive);
            let bytes = std::fs::read(&archive).unwrap();
            let sha256 = IntegrityHash::compute(HashAlgorithm::Sha256, &bytes).to_hex();
            Self {
                temp,
                archive,
                sha256,
            }
        }

        fn bin_dir(&self) -> PathBuf {
            self.temp.path().join("prefix").join("bin")
        }

        fn work_root(&self) -> PathBuf {
            self.temp.path().join("work")
        }

        fn config(&self) -> InstallConfig {
            let mut config = InstallConfig::default().with_bin_dir(self.bin_dir());
            config.prefix = self.temp.path().join("prefix");
            config.work_root = self.work_root();
            config
        }

        fn descriptor(&self, sha256: &str, deps: &str, expect: &str) -> PackageDescriptor {
            let yaml = format!(
                r#"
metadata:
  name: hello
  description: greeting tool
  homepage: https://example.com/hello
  license: MIT
source:
  url: file://{archive}
  sha256: {sha256}
dependencies:
  build: {deps}
build:
  - command:
      program: sh
      args: ["-c", "{BUILD}"]
test:
  command: ["{{bin}}/hello", "--help"]
  expect: "{expect}"
"#,
                archive = self.archive.display(),
            );
            PackageDescriptor::from_yaml_str(&yaml).unwrap()
        }

        fn valid(&self) -> PackageDescriptor {
            self.descriptor(&self.sha256, "[sh]", "hello")
        }
    }

    fn write_source_archive(path: &Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(SCRIPT.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "hello-1.4.2/hello.sh", SCRIPT)
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn installer(config: InstallConfig) -> (Installer, EventReceiver) {
        let (tx, rx) = channel();
        (Installer::new(config, tx).unwrap(), rx)
    }

    fn stages_reached(rx: &mut EventReceiver) -> Vec<InstallStage> {
        let mut stages = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Install(InstallEvent::StageReached { stage, .. }) = event {
                stages.push(stage);
            }
        }
        stages
    }

    fn work_dir_is_empty(fixture: &Fixture) -> bool {
        std::fs::read_dir(fixture.work_root())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }

    #[tokio::test]
    async fn test_valid_archive_reaches_installed() {
        let fixture = Fixture::new();
        let (installer, mut rx) = installer(fixture.config());

        let report = installer.install(&fixture.valid()).await.unwrap();

        assert_eq!(report.stage, InstallStage::Installed);
        assert_eq!(report.installed_path, fixture.bin_dir().join("hello"));
        assert_eq!(report.version.as_str(), "1.4.2");
        assert_eq!(report.source_hash.to_hex(), fixture.sha256);
        assert!(report.timing(InstallStage::Built).is_some());
        assert!(report.timing(InstallStage::Verified).is_none());
        assert!(work_dir_is_empty(&fixture));

        assert_eq!(
            stages_reached(&mut rx),
            vec![
                InstallStage::Resolved,
                InstallStage::IntegrityChecked,
                InstallStage::DependenciesSatisfied,
                InstallStage::Built,
                InstallStage::Installed,
            ]
        );

        let output = std::process::Command::new(&report.installed_path)
            .output()
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&output.stdout),
            "hello 1.4.2: greets people\n"
        );
    }

    #[tokio::test]
    async fn test_tampered_hash_fails_at_integrity_check() {
        let fixture = Fixture::new();
        let (installer, mut rx) = installer(fixture.config().with_keep_work_dir(true));
        let tampered = "0".repeat(64);

        let err = installer
            .install(&fixture.descriptor(&tampered, "[sh]", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
        assert!(!fixture.bin_dir().join("hello").exists());

        let mut reached = Vec::new();
        let mut failure = None;
        let mut kept = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Install(InstallEvent::StageReached { stage, .. }) => reached.push(stage),
                AppEvent::Install(InstallEvent::StageFailed {
                    reached, failed_at, ..
                }) => failure = Some((reached, failed_at)),
                AppEvent::Install(InstallEvent::WorkDirKept { path, .. }) => kept = Some(path),
                _ => {}
            }
        }
        assert_eq!(reached, vec![InstallStage::Resolved]);
        assert_eq!(
            failure,
            Some((InstallStage::Resolved, InstallStage::IntegrityChecked))
        );

        // the rejected archive is gone and nothing was extracted
        let kept = kept.unwrap();
        assert!(std::fs::read_dir(kept.join("download"))
            .unwrap()
            .next()
            .is_none());
        assert!(!kept.join("src").exists());
        assert!(!kept.join("stage").exists());
    }

    #[tokio::test]
    async fn test_failed_smoke_test_leaves_binary_installed() {
        let fixture = Fixture::new();
        let (installer, _rx) = installer(fixture.config());

        let outcome = installer
            .install_and_test(&fixture.descriptor(&fixture.sha256, "[sh]", "itsyhome"))
            .await
            .unwrap();

        assert!(!outcome.is_verified());
        assert_eq!(outcome.report.stage, InstallStage::Installed);
        assert!(matches!(
            outcome.verification_error,
            Some(VerificationError::PatternNotFound { .. })
        ));
        assert!(fixture.bin_dir().join("hello").is_file());
    }

    #[tokio::test]
    async fn test_install_and_test_reaches_verified() {
        let fixture = Fixture::new();
        let (installer, _rx) = installer(fixture.config());

        let outcome = installer.install_and_test(&fixture.valid()).await.unwrap();
        assert!(outcome.is_verified());
        assert!(outcome.report.timing(InstallStage::Verified).is_some());

        installer.test(&fixture.valid()).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_build_tool_fails_before_build() {
        let fixture = Fixture::new();
        let empty = fixture.temp.path().join("empty-path");
        std::fs::create_dir_all(&empty).unwrap();
        let (installer, mut rx) = installer(fixture.config());
        let installer = installer.with_probe(DependencyProbe::with_search_path(&empty));

        let err = installer
            .install(&fixture.descriptor(&fixture.sha256, "[go, sh]", "hello"))
            .await
            .unwrap_err();
        match err {
            Error::MissingDependency(missing) => {
                assert_eq!(missing.missing, vec!["go".to_string(), "sh".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }

        let reached = stages_reached(&mut rx);
        assert_eq!(reached.last(), Some(&InstallStage::IntegrityChecked));
        assert!(!fixture.bin_dir().exists());
    }

    #[tokio::test]
    async fn test_installing_twice_yields_same_digest() {
        let fixture = Fixture::new();
        let (installer, _rx) = installer(fixture.config());

        let first = installer.install(&fixture.valid()).await.unwrap();
        let second = installer.install(&fixture.valid()).await.unwrap();
        assert_eq!(first.binary_hash, second.binary_hash);
        assert_eq!(first.installed_path, second.installed_path);
    }

    #[tokio::test]
    async fn test_existing_file_conflicts_without_overwrite() {
        let fixture = Fixture::new();
        std::fs::create_dir_all(fixture.bin_dir()).unwrap();
        std::fs::write(fixture.bin_dir().join("hello"), b"someone else's").unwrap();
        let (installer, _rx) = installer(fixture.config().with_overwrite(false));

        let err = installer.install(&fixture.valid()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::Conflict { .. })
        ));
        assert_eq!(
            std::fs::read(fixture.bin_dir().join("hello")).unwrap(),
            b"someone else's"
        );
    }

    #[tokio::test]
    async fn test_directory_at_target_conflicts() {
        let fixture = Fixture::new();
        std::fs::create_dir_all(fixture.bin_dir().join("hello")).unwrap();
        let (installer, _rx) = installer(fixture.config());

        let err = installer.install(&fixture.valid()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_test_without_install() {
        let fixture = Fixture::new();
        let (installer, _rx) = installer(fixture.config());

        let err = installer.test(&fixture.valid()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::NotInstalled { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_resolves_and_checks_only() {
        let fixture = Fixture::new();
        let dest = fixture.temp.path().join("fetched");
        let (installer, _rx) = installer(fixture.config());

        let report = installer.fetch(&fixture.valid(), &dest).await.unwrap();
        assert_eq!(report.archive_path, dest.join("hello-1.4.2.tar.gz"));
        assert_eq!(report.size, std::fs::metadata(&fixture.archive).unwrap().len());
        assert!(!fixture.bin_dir().exists());

        let err = installer
            .fetch(&fixture.descriptor(&"f".repeat(64), "[sh]", "hello"), &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
        assert!(!dest.join("hello-1.4.2.tar.gz").exists());
    }

    #[tokio::test]
    async fn test_fetch_into_archive_directory_keeps_archive() {
        let fixture = Fixture::new();
        let original = std::fs::read(&fixture.archive).unwrap();
        let (installer, _rx) = installer(fixture.config());

        let err = installer
            .fetch(&fixture.valid(), fixture.archive.parent().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Fetch(FetchError::SourceIsDestination { .. })
        ));
        assert_eq!(std::fs::read(&fixture.archive).unwrap(), original);
    }
}
