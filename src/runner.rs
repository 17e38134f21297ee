//! Caller-owned driver for a [`RecordProcessor`].
//!
//! The runner owns the stage lifecycle: [`start`](StageRunner::start) runs
//! `initialize` and refuses to continue when configuration issues are
//! reported, [`process_batch`](StageRunner::process_batch) pushes records
//! through and applies the caller-supplied [`ErrorPolicy`] to per-record
//! failures, [`stop`](StageRunner::stop) tears the stage down.

use serde::{Deserialize, Serialize};

use crate::error::{OnRecordError, StartupError};
use crate::record::Record;
use crate::stage::RecordProcessor;

/// Name of the single output lane successful records are forwarded on.
pub const OUTPUT_LANE: &str = "output";

/// What the driver does with a record the stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Drop the record silently (a debug line is still emitted).
    Discard,
    /// Route the record to the error lane of the batch output.
    #[default]
    SendToError,
    /// Abort the batch, surfacing the failure to the caller.
    StopPipeline,
}

/// Output of one batch: forwarded records plus error-lane records.
#[derive(Debug, Default)]
pub struct BatchOutput {
    /// Records forwarded on [`OUTPUT_LANE`], in input order.
    pub output: Vec<Record>,
    /// Per-record failures routed by [`ErrorPolicy::SendToError`].
    pub error_records: Vec<OnRecordError>,
}

/// Drives a stage through its lifecycle.
///
/// # Example
///
/// ```rust
/// use exif_enrich::enrich::MetadataEnricher;
/// use exif_enrich::runner::StageRunner;
///
/// let mut runner = StageRunner::new(MetadataEnricher::new("invalidValue"));
/// let err = runner.start().unwrap_err();
/// assert_eq!(err.issues.len(), 1);
/// ```
pub struct StageRunner<P: RecordProcessor> {
    stage: P,
    policy: ErrorPolicy,
    started: bool,
}

impl<P: RecordProcessor> StageRunner<P> {
    pub fn new(stage: P) -> Self {
        Self { stage, policy: ErrorPolicy::default(), started: false }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Initialize the stage, refusing to start on configuration issues.
    pub fn start(&mut self) -> Result<(), StartupError> {
        let issues = self.stage.initialize();
        if issues.is_empty() {
            self.started = true;
            Ok(())
        } else {
            Err(StartupError { issues })
        }
    }

    /// Push a batch of records through the stage.
    ///
    /// Must be preceded by a successful [`start`](StageRunner::start).
    /// Returns `Err` only under [`ErrorPolicy::StopPipeline`]; records after
    /// the failing one are then not processed.
    pub fn process_batch(
        &mut self,
        records: Vec<Record>,
    ) -> Result<BatchOutput, OnRecordError> {
        debug_assert!(self.started, "process_batch called before start");

        let mut batch = BatchOutput::default();
        for record in records {
            match self.stage.process(record) {
                Ok(record) => batch.output.push(record),
                Err(err) => match self.policy {
                    ErrorPolicy::Discard => {
                        log::debug!("discarding record {}: {err}", err.record.id());
                    }
                    ErrorPolicy::SendToError => batch.error_records.push(err),
                    ErrorPolicy::StopPipeline => return Err(err),
                },
            }
        }
        Ok(batch)
    }

    /// Tear the stage down. Safe to call more than once.
    pub fn stop(&mut self) {
        if self.started {
            self.stage.teardown();
            self.started = false;
        }
    }

    pub fn stage(&self) -> &P {
        &self.stage
    }
}

impl<P: RecordProcessor> Drop for StageRunner<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
