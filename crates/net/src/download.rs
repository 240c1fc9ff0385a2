//! Streaming source archive downloads

use crate::client::NetClient;
use futures::StreamExt;
use spkg_errors::{Error, FetchError};
use spkg_events::{AppEvent, DownloadEvent, EventEmitter, EventSender};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Outcome of a completed download
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub size: u64,
    pub duration: Duration,
}

/// A single validated download request
#[derive(Debug, Clone)]
pub struct Download {
    url: Url,
    package: Option<String>,
}

impl Download {
    /// Validate `url` for download
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` or `UnsupportedProtocol` for anything but
    /// http, https or file URLs.
    pub fn new(url: &str) -> Result<Self, Error> {
        Ok(Self {
            url: validate_url(url)?,
            package: None,
        })
    }

    /// Tag emitted events with a package name
    #[must_use]
    pub fn for_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch into `dest`, removing any partial file on failure
    ///
    /// # Errors
    ///
    /// Returns a `FetchError` on transport failure, non-success HTTP status,
    /// when `dest` cannot be written, or when a local source is `dest` itself.
    pub async fn execute(
        &self,
        client: &NetClient,
        dest: &Path,
        tx: &EventSender,
    ) -> Result<DownloadResult, Error> {
        let start = Instant::now();
        let url = self.url.as_str();

        // copying a file onto itself truncates it; the existing file is kept
        if self.url.scheme() == "file" && same_file(&self.local_path()?, dest).await {
            return Err(FetchError::SourceIsDestination {
                path: dest.display().to_string(),
            }
            .into());
        }

        let result = if self.url.scheme() == "file" {
            self.copy_local(dest, tx).await
        } else {
            self.stream_http(client, dest, tx).await
        };

        match result {
            Ok(size) => {
                let duration = start.elapsed();
                tx.emit_download_completed(url, self.package.clone(), size, duration);
                Ok(DownloadResult {
                    path: dest.to_path_buf(),
                    size,
                    duration,
                })
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                tx.emit(AppEvent::Download(DownloadEvent::Failed {
                    url: url.to_string(),
                    package: self.package.clone(),
                    error: e.to_string(),
                    retryable: spkg_errors::UserFacingError::is_retryable(&e),
                }));
                Err(e)
            }
        }
    }

    fn local_path(&self) -> Result<PathBuf, Error> {
        self.url
            .to_file_path()
            .map_err(|()| FetchError::InvalidUrl(self.url.to_string()).into())
    }

    async fn copy_local(&self, dest: &Path, tx: &EventSender) -> Result<u64, Error> {
        let source = self.local_path()?;

        let metadata = tokio::fs::metadata(&source)
            .await
            .map_err(|e| FetchError::DownloadFailed(format!("{}: {e}", source.display())))?;
        tx.emit_download_started(
            self.url.as_str(),
            self.package.clone(),
            Some(metadata.len()),
        );

        tokio::fs::copy(&source, dest)
            .await
            .map_err(|e| storage_failed(dest, &e).into())
    }

    async fn stream_http(
        &self,
        client: &NetClient,
        dest: &Path,
        tx: &EventSender,
    ) -> Result<u64, Error> {
        let url = self.url.as_str();
        let response = client.get(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        let total = response.content_length();
        tx.emit_download_started(url, self.package.clone(), total);

        let mut file = File::create(dest)
            .await
            .map_err(|e| storage_failed(dest, &e))?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        let mut last_report = Instant::now();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::DownloadFailed(e.to_string())
                }
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|e| storage_failed(dest, &e))?;

            downloaded += chunk.len() as u64;
            if last_report.elapsed() >= PROGRESS_INTERVAL {
                last_report = Instant::now();
                tx.emit(AppEvent::Download(DownloadEvent::Progress {
                    url: url.to_string(),
                    bytes_downloaded: downloaded,
                    total_bytes: total,
                }));
            }
        }

        file.flush().await.map_err(|e| storage_failed(dest, &e))?;
        file.sync_all().await.map_err(|e| storage_failed(dest, &e))?;

        Ok(downloaded)
    }
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn storage_failed(path: &Path, e: &std::io::Error) -> FetchError {
    FetchError::StorageFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Validate URL and check for supported protocols
///
/// # Errors
///
/// Returns `InvalidUrl` for unparsable input and `UnsupportedProtocol` for
/// schemes other than http, https and file.
pub fn validate_url(url: &str) -> Result<Url, Error> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" | "file" => Ok(parsed),
        scheme => Err(FetchError::UnsupportedProtocol {
            protocol: scheme.to_string(),
        }
        .into()),
    }
}
