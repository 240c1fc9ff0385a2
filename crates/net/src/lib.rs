#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for spkg
//!
//! This crate retrieves source archives over HTTP(S) or from `file://`
//! locations, with connection pooling and an opt-in retry policy.

mod client;
mod download;

pub use client::{NetClient, NetConfig};
pub use download::{validate_url, Download, DownloadResult};

use spkg_errors::Error;

/// Check if a URL is accessible
///
/// `file://` URLs are checked against the filesystem.
///
/// # Errors
///
/// Returns an error if the URL is malformed or uses an unsupported scheme.
/// Unreachable locations yield `Ok(false)` rather than errors.
pub async fn check_url(client: &NetClient, url: &str) -> Result<bool, Error> {
    let parsed = validate_url(url)?;
    if parsed.scheme() == "file" {
        return Ok(parsed
            .to_file_path()
            .is_ok_and(|path| path.is_file()));
    }

    match client.head(url).await {
        Ok(response) => Ok(response.status().is_success()),
        Err(_) => Ok(false),
    }
}
