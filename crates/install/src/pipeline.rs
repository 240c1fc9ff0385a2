//! Stage tracking for one pipeline run

use spkg_errors::Error;
use spkg_events::{EventEmitter, EventSender};
use spkg_types::{InstallStage, PipelineState, StageTiming};
use std::future::Future;
use std::time::{Duration, Instant};

/// Records every transition of a run and reports it
pub(crate) struct Pipeline {
    package: String,
    state: PipelineState,
    timings: Vec<StageTiming>,
    started: Instant,
    stage_started: Instant,
    tx: EventSender,
}

impl EventEmitter for Pipeline {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(&self.tx)
    }
}

impl Pipeline {
    pub(crate) fn new(package: impl Into<String>, tx: EventSender) -> Self {
        let now = Instant::now();
        Self {
            package: package.into(),
            state: PipelineState::default(),
            timings: Vec::new(),
            started: now,
            stage_started: now,
            tx,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> PipelineState {
        self.state
    }

    pub(crate) fn reached(&self) -> InstallStage {
        self.state.reached()
    }

    pub(crate) fn timings(&self) -> &[StageTiming] {
        &self.timings
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Await one stage and record the transition it produces
    pub(crate) async fn stage<T, F>(&mut self, work: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        match work.await {
            Ok(value) => {
                self.advance();
                Ok(value)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Synchronous counterpart of [`Pipeline::stage`]
    pub(crate) fn stage_sync<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        match result {
            Ok(value) => {
                self.advance();
                Ok(value)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn advance(&mut self) {
        let elapsed = self.stage_started.elapsed();
        let Some(stage) = self.state.advance() else {
            return;
        };
        self.stage_started = Instant::now();
        self.timings.push(StageTiming {
            stage,
            duration_ms: duration_ms(elapsed),
        });

        tracing::info!(package = %self.package, %stage, elapsed_ms = duration_ms(elapsed), "stage reached");
        self.emit_stage_reached(&self.package, stage, elapsed);
    }

    /// Move to `Failed` and hand the error back
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        self.state.fail(err.kind());
        if let PipelineState::Failed {
            reached, failed_at, ..
        } = self.state
        {
            tracing::error!(
                package = %self.package,
                %reached,
                %failed_at,
                kind = %err.kind(),
                error = %err,
                "pipeline failed"
            );
            self.emit_stage_failed(&self.package, reached, failed_at, &err);
        }
        err
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
