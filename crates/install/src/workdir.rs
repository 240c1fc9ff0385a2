//! Scoped work directory for one pipeline run

use spkg_errors::{Error, InstallError};
use spkg_events::{AppEvent, EventEmitter, EventSender, InstallEvent};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Holds the downloaded archive, extracted source and staging output
///
/// Removed when dropped unless [`WorkDir::finish`] is told to keep it.
#[derive(Debug)]
pub(crate) struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Create a fresh directory under `root`
    pub(crate) async fn create(root: &Path, package: &str) -> Result<Self, Error> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| fs_error("create_work_root", root, &e))?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("spkg-{package}-"))
            .tempdir_in(root)
            .map_err(|e| fs_error("create_work_dir", root, &e))?;

        tracing::debug!(path = %dir.path().display(), "created work directory");
        Ok(Self { dir })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn downloads(&self) -> PathBuf {
        self.path().join("download")
    }

    pub(crate) fn source(&self) -> PathBuf {
        self.path().join("src")
    }

    pub(crate) fn staging(&self) -> PathBuf {
        self.path().join("stage")
    }

    /// Remove the directory, or keep it and report where it is
    pub(crate) fn finish(self, keep: bool, package: &str, tx: &EventSender) {
        if keep {
            let path = self.dir.keep();
            tracing::info!(path = %path.display(), "keeping work directory");
            tx.emit(AppEvent::Install(InstallEvent::WorkDirKept {
                package: package.to_string(),
                path,
            }));
            return;
        }

        let path = self.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove work directory");
        }
    }
}

fn fs_error(operation: &str, path: &Path, e: &std::io::Error) -> Error {
    InstallError::FilesystemError {
        operation: operation.to_string(),
        path: path.display().to_string(),
        message: e.to_string(),
    }
    .into()
}
