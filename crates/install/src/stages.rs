//! Pipeline stages
//!
//! Each function moves a run one step forward and returns what the next
//! stage needs. They hold no state of their own; [`crate::Installer`]
//! sequences them and records the transitions.

use spkg_builder::{extract, run, BuildArtifact, CommandSpec, DependencyProbe, SourceBuilder};
use spkg_errors::{Error, InstallError, VerificationError};
use spkg_events::{AppEvent, BuildEvent, EventEmitter, EventSender};
use spkg_hash::{Hash, IntegrityHash};
use spkg_net::{Download, DownloadResult, NetClient};
use spkg_types::{BuildOptions, PackageDescriptor, VerificationSpec};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Binary moved into the bin directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    pub path: PathBuf,
    /// BLAKE3 digest of the installed file
    pub hash: Hash,
    /// An earlier file at the same path was replaced
    pub replaced: bool,
}

/// File name the archive is stored under
///
/// The last path segment of the URL, or `<name>-<version>` when the URL ends
/// in a slash.
#[must_use]
pub fn archive_file_name(descriptor: &PackageDescriptor) -> String {
    descriptor
        .source_url
        .split(['?', '#'])
        .next()
        .and_then(|url| url.rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map_or_else(
            || format!("{}-{}", descriptor.name, descriptor.version),
            ToString::to_string,
        )
}

/// Fetch the descriptor's source archive into `dest_dir`
///
/// # Errors
///
/// Returns a `FetchError` for an unsupported scheme, a transport failure, a
/// non-success HTTP status or a failed write.
pub async fn resolve(
    descriptor: &PackageDescriptor,
    client: &NetClient,
    dest_dir: &Path,
    tx: &EventSender,
) -> Result<DownloadResult, Error> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| Error::io_with_path(&e, dest_dir))?;

    let dest = dest_dir.join(archive_file_name(descriptor));
    Download::new(&descriptor.source_url)?
        .for_package(&descriptor.name)
        .execute(client, &dest, tx)
        .await
}

/// Check `archive` against `expected`, deleting it on mismatch
///
/// Must run before anything reads the archive's contents.
///
/// # Errors
///
/// Returns an `IntegrityError` when the digests differ or the file cannot be
/// read.
pub async fn verify_integrity(
    archive: &Path,
    expected: &IntegrityHash,
) -> Result<IntegrityHash, Error> {
    match spkg_hash::verify_file(archive, expected).await {
        Ok(actual) => {
            tracing::debug!(archive = %archive.display(), digest = %actual, "integrity verified");
            Ok(actual)
        }
        Err(err) => {
            match tokio::fs::remove_file(archive).await {
                Ok(()) => tracing::debug!(archive = %archive.display(), "removed rejected archive"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    archive = %archive.display(),
                    error = %e,
                    "failed to remove rejected archive"
                ),
            }
            Err(err)
        }
    }
}

/// Check every build tool is on the search path
///
/// # Errors
///
/// Returns a `MissingDependencyError` naming every absent tool.
pub fn ensure_dependencies<E: EventEmitter>(
    tools: &[String],
    probe: &DependencyProbe,
    emitter: &E,
) -> Result<Vec<PathBuf>, Error> {
    probe.ensure(tools, emitter)
}

/// Extract `archive` under `work_dir` and run the build instructions
///
/// # Errors
///
/// Returns a `BuildError` if extraction fails, a step exits non-zero, or the
/// binary is missing afterwards.
pub async fn build(
    descriptor: &PackageDescriptor,
    builder: &SourceBuilder,
    archive: &Path,
    source_dir: &Path,
    staging_dir: &Path,
) -> Result<BuildArtifact, Error> {
    let source_root = extract(archive, source_dir).await?;
    builder.emit(AppEvent::Build(BuildEvent::SourceExtracted {
        package: descriptor.name.clone(),
        archive: archive.to_path_buf(),
        source_root: source_root.clone(),
    }));
    builder.build(descriptor, &source_root, staging_dir).await
}

/// Move `artifact` into `bin_dir`
///
/// The file is copied next to its target, made executable and renamed into
/// place, so the target path never holds a partial binary.
///
/// # Errors
///
/// Returns `InstallError::Conflict` when a directory occupies the target, or
/// a file does and `overwrite` is false; `NotWritable` when the location
/// denies writes.
pub async fn install(
    artifact: &BuildArtifact,
    bin_dir: &Path,
    overwrite: bool,
) -> Result<InstalledBinary, Error> {
    tokio::fs::create_dir_all(bin_dir)
        .await
        .map_err(|e| install_error("create_dir", bin_dir, &e))?;

    let target = bin_dir.join(&artifact.name);
    let replaced = match tokio::fs::symlink_metadata(&target).await {
        Ok(meta) if meta.is_dir() => {
            return Err(InstallError::Conflict {
                path: target.display().to_string(),
                reason: "a directory exists at the install target".to_string(),
            }
            .into());
        }
        Ok(_) if !overwrite => {
            return Err(InstallError::Conflict {
                path: target.display().to_string(),
                reason: "file exists and overwrite is disabled".to_string(),
            }
            .into());
        }
        Ok(_) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => return Err(install_error("stat", &target, &e)),
    };

    let staged = bin_dir.join(format!(".{}.spkg-tmp", artifact.name));
    if let Err(err) = place(&artifact.path, &staged, &target).await {
        let _ = tokio::fs::remove_file(&staged).await;
        return Err(err);
    }

    let hash = Hash::hash_file(&target).await?;
    tracing::info!(path = %target.display(), digest = %hash.to_hex(), replaced, "installed binary");

    Ok(InstalledBinary {
        path: target,
        hash,
        replaced,
    })
}

async fn place(source: &Path, staged: &Path, target: &Path) -> Result<(), Error> {
    tokio::fs::copy(source, staged)
        .await
        .map_err(|e| install_error("copy", staged, &e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(staged, std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| install_error("chmod", staged, &e))?;
    }

    tokio::fs::rename(staged, target)
        .await
        .map_err(|e| install_error("rename", target, &e))
}

fn install_error(operation: &str, path: &Path, e: &std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => InstallError::NotWritable {
            path: path.display().to_string(),
            message: e.to_string(),
        },
        _ => InstallError::FilesystemError {
            operation: operation.to_string(),
            path: path.display().to_string(),
            message: e.to_string(),
        },
    }
    .into()
}

/// Expand the verification command into something runnable
///
/// # Errors
///
/// Returns a descriptor error for an unknown placeholder, or
/// `VerificationError::CommandFailed` for an empty command.
pub fn verification_command(
    spec: &VerificationSpec,
    opts: &BuildOptions,
) -> Result<CommandSpec, Error> {
    let argv = spec
        .command
        .iter()
        .map(|arg| opts.expand(arg))
        .collect::<Result<Vec<_>, _>>()?;

    let Some((program, args)) = argv.split_first() else {
        return Err(VerificationError::CommandFailed {
            command: String::new(),
            message: "verification command is empty".to_string(),
        }
        .into());
    };
    Ok(CommandSpec::new(program.clone()).args(args.iter().cloned()))
}

/// Run the smoke test and match its output
///
/// The command must exit 0 and its stdout and stderr, checked together,
/// must satisfy the expectation. The install is left in place whatever the
/// outcome.
///
/// # Errors
///
/// Returns `VerificationError::CommandFailed` if the command cannot be
/// started, `UnexpectedExit` for a non-zero exit, or `PatternNotFound`
/// carrying the captured output.
pub async fn verify(spec: &VerificationSpec, opts: &BuildOptions) -> Result<String, Error> {
    let command = verification_command(spec, opts)?;
    let shown = command.display();

    let output = run(&command)
        .await
        .map_err(|e| VerificationError::CommandFailed {
            command: shown.clone(),
            message: e.to_string(),
        })?;

    let combined = output.combined();
    if !output.success {
        return Err(VerificationError::UnexpectedExit {
            command: shown,
            exit_code: output.exit_code,
            output: combined,
        }
        .into());
    }

    if spec.expectation.is_satisfied_by(&combined) {
        tracing::debug!(command = %shown, "verification matched");
        Ok(combined)
    } else {
        Err(VerificationError::PatternNotFound {
            command: shown,
            pattern: spec.expectation.pattern().to_string(),
            output: combined,
        }
        .into())
    }
}
