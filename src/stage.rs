//! The host-facing stage lifecycle contract.

use crate::error::{ConfigIssue, OnRecordError};
use crate::record::Record;

/// A pipeline processing stage driven by a caller-owned runner.
///
/// The lifecycle is `initialize` once, `process` per record, `teardown` once.
/// One call at a time per instance: the host is responsible for concurrency
/// (e.g. one instance per partition), and implementations must not retain
/// mutable state across `process` calls beyond their start-up configuration.
pub trait RecordProcessor {
    /// Validate configuration and acquire start-up resources.
    ///
    /// An empty list means the stage may start. A non-empty list must make
    /// the caller refuse to start; see
    /// [`StageRunner::start`](crate::runner::StageRunner::start).
    fn initialize(&mut self) -> Vec<ConfigIssue>;

    /// Transform one record.
    ///
    /// Takes ownership, mutates, and hands the record back for forwarding on
    /// the single output lane. On failure the returned [`OnRecordError`]
    /// carries the record instead; it was not forwarded.
    fn process(&mut self, record: Record) -> Result<Record, OnRecordError>;

    /// Release anything acquired during `initialize`.
    ///
    /// Must be idempotent: calling it again (or without a prior successful
    /// `initialize`) does nothing.
    fn teardown(&mut self);
}
