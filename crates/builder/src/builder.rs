//! Source build driver

use crate::execution::{run_checked, CommandSpec};
use crate::go::go_build_command;
use spkg_errors::{BuildError, Error};
use spkg_events::{AppEvent, BuildEvent, EventEmitter, EventSender};
use spkg_types::{BuildOptions, BuildStep, PackageDescriptor};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Build tunables taken from configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Program used for `go` steps
    pub go_binary: String,
    /// Parallelism passed to `go build -p`; `None` leaves the toolchain default
    pub jobs: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            go_binary: "go".to_string(),
            jobs: None,
        }
    }
}

impl From<&spkg_config::Config> for BuildConfig {
    fn from(config: &spkg_config::Config) -> Self {
        Self {
            go_binary: config.build.go_binary.clone(),
            jobs: (config.build.jobs > 0)
                .then(|| spkg_config::calculate_build_jobs(config.build.jobs)),
        }
    }
}

/// Binary produced by a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub name: String,
    pub path: PathBuf,
}

/// Runs a descriptor's build instructions in an extracted source tree
#[derive(Clone)]
pub struct SourceBuilder {
    config: BuildConfig,
    tx: Option<EventSender>,
}

impl EventEmitter for SourceBuilder {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl SourceBuilder {
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self { config, tx: None }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Resolve every build step to a concrete command
    ///
    /// # Errors
    ///
    /// Returns a descriptor error if a template cannot be expanded.
    pub fn plan(
        &self,
        descriptor: &PackageDescriptor,
        opts: &BuildOptions,
        source_root: &Path,
    ) -> Result<Vec<CommandSpec>, Error> {
        descriptor
            .build_instructions
            .iter()
            .map(|step| self.resolve_step(step, opts, source_root))
            .collect()
    }

    fn resolve_step(
        &self,
        step: &BuildStep,
        opts: &BuildOptions,
        source_root: &Path,
    ) -> Result<CommandSpec, Error> {
        match step {
            BuildStep::Go { go } => go_build_command(
                go,
                opts,
                &self.config.go_binary,
                self.config.jobs,
                source_root,
            ),
            BuildStep::Command { command: cmd } => {
                let args = cmd
                    .args
                    .iter()
                    .map(|arg| opts.expand(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut env = BTreeMap::new();
                for (key, value) in &cmd.env {
                    env.insert(key.clone(), opts.expand(value)?);
                }
                Ok(CommandSpec::new(opts.expand(&cmd.program)?)
                    .args(args)
                    .envs(env)
                    .current_dir(source_root))
            }
        }
    }

    /// Build `descriptor` from `source_root`, staging output under `staging`
    ///
    /// Steps run in declaration order; the first failure aborts the build.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::CommandFailed` with the tool's output when a step
    /// exits non-zero, or `MissingArtifact` if the binary was not produced.
    pub async fn build(
        &self,
        descriptor: &PackageDescriptor,
        source_root: &Path,
        staging: &Path,
    ) -> Result<BuildArtifact, Error> {
        let start = Instant::now();
        let name = &descriptor.name;
        let version = descriptor.version.to_string();

        let opts = BuildOptions::for_build(
            name.clone(),
            descriptor.version.clone(),
            source_root.to_path_buf(),
            staging.to_path_buf(),
        );
        tokio::fs::create_dir_all(&opts.bin_dir)
            .await
            .map_err(|e| BuildError::Setup {
                message: format!("failed to create {}: {e}", opts.bin_dir.display()),
            })?;

        let steps = self.plan(descriptor, &opts, source_root)?;
        self.emit_build_started(name, &version, steps.len());

        let result = self.run_steps(name, &steps, source_root).await.and_then(|()| {
            let path = opts.bin_dir.join(descriptor.binary_name());
            if path.is_file() {
                Ok(BuildArtifact {
                    name: descriptor.binary_name().to_string(),
                    path,
                })
            } else {
                Err(BuildError::MissingArtifact {
                    path: path.display().to_string(),
                }
                .into())
            }
        });

        match result {
            Ok(artifact) => {
                self.emit_build_completed(name, &version, artifact.path.clone(), start.elapsed());
                Ok(artifact)
            }
            Err(e) => {
                self.emit(AppEvent::Build(BuildEvent::Failed {
                    package: name.clone(),
                    version,
                    error: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        name: &str,
        steps: &[CommandSpec],
        source_root: &Path,
    ) -> Result<(), Error> {
        let total_steps = steps.len();
        for (index, spec) in steps.iter().enumerate() {
            let step_start = Instant::now();
            self.emit(AppEvent::Build(BuildEvent::StepStarted {
                package: name.to_string(),
                step: index + 1,
                total_steps,
                command: spec.display(),
                working_dir: source_root.to_path_buf(),
            }));

            run_checked(spec).await?;

            self.emit(AppEvent::Build(BuildEvent::StepCompleted {
                package: name.to_string(),
                step: index + 1,
                duration: step_start.elapsed(),
            }));
        }
        Ok(())
    }
}
