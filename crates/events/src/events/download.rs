use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Source archive retrieval events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Download started with connection info
    Started {
        url: String,
        package: Option<String>,
        total_size: Option<u64>,
    },

    /// Bytes received so far
    Progress {
        url: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// Download completed successfully
    Completed {
        url: String,
        package: Option<String>,
        final_size: u64,
        total_time: Duration,
    },

    /// Download failed
    Failed {
        url: String,
        package: Option<String>,
        error: String,
        retryable: bool,
    },

    /// Download retrying after failure
    Retrying {
        url: String,
        attempt: u32,
        max_attempts: u32,
        reason: String,
        backoff_delay: Duration,
    },
}
