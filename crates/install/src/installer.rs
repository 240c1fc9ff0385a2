//! Main installer implementation

use crate::pipeline::{duration_ms, Pipeline};
use crate::stages;
use crate::workdir::WorkDir;
use crate::{InstallConfig, InstallOutcome};
use spkg_builder::{DependencyProbe, SourceBuilder};
use spkg_errors::{Error, InstallError};
use spkg_events::{AppEvent, EventEmitter, EventSender, InstallEvent};
use spkg_net::NetClient;
use spkg_types::{BuildOptions, FetchReport, InstallReport, PackageDescriptor};
use std::path::Path;

/// Installs packages described by descriptors
#[derive(Clone)]
pub struct Installer {
    config: InstallConfig,
    client: NetClient,
    builder: SourceBuilder,
    probe: DependencyProbe,
    tx: EventSender,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EventEmitter for Installer {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

impl Installer {
    /// Create new installer
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(config: InstallConfig, tx: EventSender) -> Result<Self, Error> {
        let client = NetClient::new(config.network.clone())?;
        let builder = SourceBuilder::new(config.build.clone()).with_event_sender(tx.clone());
        Ok(Self {
            config,
            client,
            builder,
            probe: DependencyProbe::new(),
            tx,
        })
    }

    /// Probe build tools with `probe` instead of the process `PATH`
    #[must_use]
    pub fn with_probe(mut self, probe: DependencyProbe) -> Self {
        self.probe = probe;
        self
    }

    #[must_use]
    pub fn config(&self) -> &InstallConfig {
        &self.config
    }

    /// Options the smoke test runs with against the live bin directory
    #[must_use]
    pub fn installed_options(&self, descriptor: &PackageDescriptor) -> BuildOptions {
        BuildOptions::for_installed(
            descriptor.name.clone(),
            descriptor.version.clone(),
            self.config.prefix.clone(),
            self.config.bin_dir.clone(),
        )
    }

    /// Run the pipeline through `Installed`
    ///
    /// # Errors
    ///
    /// Returns the first stage error. Nothing is written to the bin
    /// directory unless the build succeeded.
    pub async fn install(&self, descriptor: &PackageDescriptor) -> Result<InstallReport, Error> {
        let mut pipeline = Pipeline::new(&descriptor.name, self.tx.clone());
        let report = self.run_install(descriptor, &mut pipeline).await?;
        self.emit_completed(descriptor, &report, &pipeline);
        Ok(report)
    }

    /// Install, then run the smoke test
    ///
    /// A failed smoke test is reported in the outcome rather than as an
    /// error, and the binary stays installed.
    ///
    /// # Errors
    ///
    /// Returns any error from the install stages, or a non-verification
    /// error raised while preparing the smoke test.
    pub async fn install_and_test(
        &self,
        descriptor: &PackageDescriptor,
    ) -> Result<InstallOutcome, Error> {
        let mut pipeline = Pipeline::new(&descriptor.name, self.tx.clone());
        let mut report = self.run_install(descriptor, &mut pipeline).await?;

        let opts = self.installed_options(descriptor);
        let result = self.verify_installed(descriptor, &opts).await;
        let verification_error = match pipeline.stage_sync(result) {
            Ok(()) => None,
            Err(Error::Verification(err)) => Some(err),
            Err(err) => return Err(err),
        };

        report.stage = pipeline.reached();
        report.timings = pipeline.timings().to_vec();
        report.duration_ms = duration_ms(pipeline.elapsed());
        self.emit_completed(descriptor, &report, &pipeline);

        Ok(InstallOutcome {
            report,
            verification_error,
        })
    }

    /// Run the smoke test against an already installed binary
    ///
    /// # Errors
    ///
    /// Returns `InstallError::NotInstalled` if the binary is absent, or a
    /// `VerificationError` if the smoke test fails.
    pub async fn test(&self, descriptor: &PackageDescriptor) -> Result<(), Error> {
        let installed = descriptor.installed_path(&self.config.bin_dir);
        if !installed.is_file() {
            let err = Error::from(InstallError::NotInstalled {
                path: installed.display().to_string(),
            });
            self.emit_error_with_details(
                format!("{} is not installed", descriptor.name),
                err.to_string(),
            );
            return Err(err);
        }

        let opts = self.installed_options(descriptor);
        self.verify_installed(descriptor, &opts).await
    }

    /// Resolve the source archive into `dest` and check its integrity
    ///
    /// No build tools are probed and nothing is built.
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` or `IntegrityError`; a rejected archive is
    /// removed from `dest`.
    pub async fn fetch(
        &self,
        descriptor: &PackageDescriptor,
        dest: &Path,
    ) -> Result<FetchReport, Error> {
        let mut pipeline = Pipeline::new(&descriptor.name, self.tx.clone());
        let download = pipeline
            .stage(stages::resolve(descriptor, &self.client, dest, &self.tx))
            .await?;
        let source_hash = pipeline
            .stage(stages::verify_integrity(
                &download.path,
                &descriptor.integrity_hash,
            ))
            .await?;

        Ok(FetchReport {
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            archive_path: download.path,
            source_hash,
            size: download.size,
            duration_ms: duration_ms(pipeline.elapsed()),
        })
    }

    async fn run_install(
        &self,
        descriptor: &PackageDescriptor,
        pipeline: &mut Pipeline,
    ) -> Result<InstallReport, Error> {
        let version = descriptor.version.to_string();
        tracing::info!(package = %descriptor.name, %version, bin_dir = %self.config.bin_dir.display(), "install started");
        self.emit(AppEvent::Install(InstallEvent::Started {
            package: descriptor.name.clone(),
            version,
            bin_dir: self.config.bin_dir.clone(),
        }));

        let work = match WorkDir::create(&self.config.work_root, &descriptor.name).await {
            Ok(work) => work,
            Err(err) => return Err(pipeline.fail(err)),
        };
        let result = self.run_stages(descriptor, &work, pipeline).await;
        work.finish(self.config.keep_work_dir, &descriptor.name, &self.tx);
        result
    }

    fn emit_completed(&self, descriptor: &PackageDescriptor, report: &InstallReport, pipeline: &Pipeline) {
        tracing::info!(
            package = %descriptor.name,
            stage = %report.stage,
            duration_ms = report.duration_ms,
            "install finished"
        );
        self.emit(AppEvent::Install(InstallEvent::Completed {
            package: descriptor.name.clone(),
            version: descriptor.version.to_string(),
            stage: report.stage,
            duration: pipeline.elapsed(),
        }));
    }

    async fn run_stages(
        &self,
        descriptor: &PackageDescriptor,
        work: &WorkDir,
        pipeline: &mut Pipeline,
    ) -> Result<InstallReport, Error> {
        let download = pipeline
            .stage(stages::resolve(
                descriptor,
                &self.client,
                &work.downloads(),
                &self.tx,
            ))
            .await?;

        let source_hash = pipeline
            .stage(stages::verify_integrity(
                &download.path,
                &descriptor.integrity_hash,
            ))
            .await?;

        pipeline.stage_sync(stages::ensure_dependencies(
            &descriptor.build_dependencies,
            &self.probe,
            &self.tx,
        ))?;

        let artifact = pipeline
            .stage(stages::build(
                descriptor,
                &self.builder,
                &download.path,
                &work.source(),
                &work.staging(),
            ))
            .await?;

        let installed = pipeline
            .stage(stages::install(
                &artifact,
                &self.config.bin_dir,
                self.config.overwrite,
            ))
            .await?;
        self.emit(AppEvent::Install(InstallEvent::BinaryInstalled {
            package: descriptor.name.clone(),
            path: installed.path.clone(),
            replaced: installed.replaced,
        }));

        Ok(InstallReport {
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            installed_path: installed.path,
            binary_hash: installed.hash,
            source_hash,
            stage: pipeline.reached(),
            timings: pipeline.timings().to_vec(),
            duration_ms: duration_ms(pipeline.elapsed()),
        })
    }

    async fn verify_installed(
        &self,
        descriptor: &PackageDescriptor,
        opts: &BuildOptions,
    ) -> Result<(), Error> {
        let command = stages::verification_command(&descriptor.verification, opts)?.display();
        self.emit(AppEvent::Install(InstallEvent::VerificationStarted {
            package: descriptor.name.clone(),
            command: command.clone(),
        }));

        match stages::verify(&descriptor.verification, opts).await {
            Ok(_) => {
                tracing::info!(package = %descriptor.name, %command, "verification passed");
                self.emit(AppEvent::Install(InstallEvent::VerificationPassed {
                    package: descriptor.name.clone(),
                    command,
                }));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(package = %descriptor.name, %command, error = %err, "verification failed");
                Err(err)
            }
        }
    }
}
