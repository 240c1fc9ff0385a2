//! Structured logging integration for events
//!
//! Every event drained from the channel is logged with structured fields
//! before it is rendered, so `--debug` log files hold the full run.

use spkg_events::{AppEvent, BuildEvent, DownloadEvent, GeneralEvent, InstallEvent};
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Log an `AppEvent` using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    let source = event.event_source();
    match event {
        AppEvent::Download(download_event) => match download_event {
            DownloadEvent::Started {
                url,
                package,
                total_size,
            } => {
                info!(
                    target: "spkg::events::download",
                    source = source.as_str(),
                    url = %url,
                    package = ?package,
                    total_size = ?total_size,
                    "Download started"
                );
            }
            DownloadEvent::Progress {
                url,
                bytes_downloaded,
                total_bytes,
            } => {
                debug!(
                    target: "spkg::events::download",
                    source = source.as_str(),
                    url = %url,
                    bytes_downloaded,
                    total_bytes = ?total_bytes,
                    "Download progress"
                );
            }
            DownloadEvent::Completed {
                url,
                package,
                final_size,
                total_time,
            } => {
                info!(
                    target: "spkg::events::download",
                    source = source.as_str(),
                    url = %url,
                    package = ?package,
                    final_size,
                    duration_ms = total_time.as_millis(),
                    "Download completed"
                );
            }
            DownloadEvent::Failed {
                url,
                package,
                error,
                retryable,
            } => {
                error!(
                    target: "spkg::events::download",
                    source = source.as_str(),
                    url = %url,
                    package = ?package,
                    retryable,
                    error = %error,
                    "Download failed"
                );
            }
            DownloadEvent::Retrying {
                url,
                attempt,
                max_attempts,
                reason,
                backoff_delay,
            } => {
                warn!(
                    target: "spkg::events::download",
                    source = source.as_str(),
                    url = %url,
                    attempt,
                    max_attempts,
                    reason = %reason,
                    backoff_ms = backoff_delay.as_millis(),
                    "Download retrying"
                );
            }
        },

        AppEvent::Build(build_event) => match build_event {
            BuildEvent::DependencyChecked { tool, path } => {
                debug!(
                    target: "spkg::events::build",
                    source = source.as_str(),
                    tool = %tool,
                    path = ?path,
                    found = path.is_some(),
                    "Build dependency checked"
                );
            }
            BuildEvent::StepStarted {
                package,
                step,
                total_steps,
                command,
                working_dir,
            } => {
                info!(
                    target: "spkg::events::build",
                    source = source.as_str(),
                    package = %package,
                    step,
                    total_steps,
                    command = %command,
                    working_dir = %working_dir.display(),
                    "Build step started"
                );
            }
            BuildEvent::Failed {
                package,
                version,
                error,
            } => {
                error!(
                    target: "spkg::events::build",
                    source = source.as_str(),
                    package = %package,
                    version = %version,
                    error = %error,
                    "Build failed"
                );
            }
            other => {
                info!(target: "spkg::events::build", source = source.as_str(), event = ?other, "Build event");
            }
        },

        AppEvent::Install(install_event) => match install_event {
            InstallEvent::StageReached {
                package,
                stage,
                elapsed,
            } => {
                info!(
                    target: "spkg::events::install",
                    source = source.as_str(),
                    package = %package,
                    stage = %stage,
                    elapsed_ms = elapsed.as_millis(),
                    "Stage reached"
                );
            }
            InstallEvent::StageFailed {
                package,
                reached,
                failed_at,
                failure,
            } => {
                error!(
                    target: "spkg::events::install",
                    source = source.as_str(),
                    package = %package,
                    reached = %reached,
                    failed_at = %failed_at,
                    kind = %failure.kind,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Stage failed"
                );
            }
            InstallEvent::BinaryInstalled {
                package,
                path,
                replaced,
            } => {
                info!(
                    target: "spkg::events::install",
                    source = source.as_str(),
                    package = %package,
                    path = %path.display(),
                    replaced,
                    "Binary installed"
                );
            }
            other => {
                info!(target: "spkg::events::install", source = source.as_str(), event = ?other, "Install event");
            }
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                warn!(target: "spkg::events::general", source = source.as_str(), context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                error!(target: "spkg::events::general", source = source.as_str(), details = ?details, "{message}");
            }
            GeneralEvent::DebugLog { message, context } => {
                debug!(target: "spkg::events::general", source = source.as_str(), context = ?context, "{message}");
            }
        },
    }
}

const DEBUG_FILTER: &str = "info,spkg=debug,spkg_install=debug,spkg_builder=debug";
const QUIET_FILTER: &str = "warn";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize tracing/logging
///
/// `--json` keeps stdout and stderr clean; `--debug` (or `RUST_LOG`) writes
/// JSON logs to a timestamped file under `log_dir`.
pub fn init_tracing(json_mode: bool, debug_flag: bool, log_dir: &Path) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_flag;

    if debug_enabled {
        match create_log_file(log_dir) {
            Ok((file, path)) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(env_filter(DEBUG_FILTER))
                    .init();
                if !json_mode {
                    eprintln!("Debug logging enabled: {}", path.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // nothing may interleave with the JSON document
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter(QUIET_FILTER))
            .init();
    }
}

fn create_log_file(log_dir: &Path) -> std::io::Result<(std::fs::File, std::path::PathBuf)> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(format!(
        "spkg-{}.log",
        chrono::Utc::now().format("%Y%m%d-%H%M%S")
    ));
    let file = std::fs::File::create(&path)?;
    Ok((file, path))
}
