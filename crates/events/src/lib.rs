#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in spkg
//!
//! All library output goes through events - no direct printing is allowed
//! outside the CLI. The CLI drains the channel, logs each event through
//! `tracing` and renders the ones the user should see.

pub mod meta;
pub use meta::EventSource;

pub mod events;
pub use events::{
    AppEvent, BuildEvent, DownloadEvent, FailureContext, GeneralEvent, InstallEvent,
};

use spkg_types::InstallStage;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel with the `AppEvent` system
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout spkg
///
/// This trait provides a single, consistent API for emitting events regardless of
/// whether you have a raw `EventSender` or a struct that contains one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    /// Emit an error event with details
    fn emit_error_with_details(&self, message: impl Into<String>, details: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error_with_details(
            message, details,
        )));
    }

    /// Emit a download started event
    fn emit_download_started(
        &self,
        url: impl Into<String>,
        package: Option<String>,
        total_size: Option<u64>,
    ) {
        self.emit(AppEvent::Download(DownloadEvent::Started {
            url: url.into(),
            package,
            total_size,
        }));
    }

    /// Emit a download completed event
    fn emit_download_completed(
        &self,
        url: impl Into<String>,
        package: Option<String>,
        final_size: u64,
        total_time: Duration,
    ) {
        self.emit(AppEvent::Download(DownloadEvent::Completed {
            url: url.into(),
            package,
            final_size,
            total_time,
        }));
    }

    /// Emit a build started event
    fn emit_build_started(&self, package: impl Into<String>, version: impl Into<String>, steps: usize) {
        self.emit(AppEvent::Build(BuildEvent::Started {
            package: package.into(),
            version: version.into(),
            steps,
        }));
    }

    /// Emit a build completed event
    fn emit_build_completed(
        &self,
        package: impl Into<String>,
        version: impl Into<String>,
        artifact: PathBuf,
        duration: Duration,
    ) {
        self.emit(AppEvent::Build(BuildEvent::Completed {
            package: package.into(),
            version: version.into(),
            artifact,
            duration,
        }));
    }

    /// Emit a stage transition event
    fn emit_stage_reached(&self, package: impl Into<String>, stage: InstallStage, elapsed: Duration) {
        self.emit(AppEvent::Install(InstallEvent::StageReached {
            package: package.into(),
            stage,
            elapsed,
        }));
    }

    /// Emit a terminal stage failure event
    fn emit_stage_failed(
        &self,
        package: impl Into<String>,
        reached: InstallStage,
        failed_at: InstallStage,
        error: &spkg_errors::Error,
    ) {
        self.emit(AppEvent::Install(InstallEvent::StageFailed {
            package: package.into(),
            reached,
            failed_at,
            failure: FailureContext::from_error(error),
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
