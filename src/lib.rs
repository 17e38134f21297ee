//! # exif-enrich
//!
//! A data-pipeline processing stage that enriches records with metadata
//! extracted from their attached image file: EXIF directories become ordered
//! tag-name → description mappings set as new top-level record fields.
//!
//! ## Quick Start
//!
//! The simplest way to use the library is through the runner, which drives
//! the stage through its full initialize → process → teardown lifecycle:
//!
//! ```rust,no_run
//! use exif_enrich::config::Config;
//! use exif_enrich::enrich::MetadataEnricher;
//! use exif_enrich::record::{Field, LocalFileRef, Record};
//! use exif_enrich::runner::StageRunner;
//!
//! fn main() -> anyhow::Result<()> {
//!     // Load config from file (contains the stage option and error policy)
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!
//!     // Build the stage and its driver
//!     let enricher = MetadataEnricher::new(config.config.clone());
//!     let mut runner = StageRunner::new(enricher).with_policy(config.on_record_error);
//!     runner.start()?;
//!
//!     // One record per image file
//!     let mut record = Record::new("photo-1");
//!     record.set("/fileRef", Field::file_ref(LocalFileRef::new("photo.jpg")))?;
//!     record.set("/fileInfo/filename", Field::string("photo.jpg"))?;
//!
//!     let batch = runner.process_batch(vec![record])?;
//!     for record in &batch.output {
//!         println!("{}", serde_json::to_string_pretty(record)?);
//!     }
//!     for err in &batch.error_records {
//!         eprintln!("{err}");
//!     }
//!
//!     runner.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! For more control, drive the stage directly and swap its seams — the
//! metadata parser and the diagnostic sink are both injectable:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use exif_enrich::diag::MemorySink;
//! use exif_enrich::enrich::MetadataEnricher;
//! use exif_enrich::record::{BytesFileRef, Field, Record};
//! use exif_enrich::stage::RecordProcessor;
//!
//! fn main() -> anyhow::Result<()> {
//!     let sink = Arc::new(MemorySink::new());
//!     let mut enricher = MetadataEnricher::new("value").with_diagnostics(sink.clone());
//!     assert!(enricher.initialize().is_empty());
//!
//!     let bytes = std::fs::read("photo.jpg")?;
//!     let mut record = Record::new("photo-1");
//!     record.set("/fileRef", Field::file_ref(BytesFileRef::new(bytes)))?;
//!     record.set("/fileInfo/filename", Field::string("photo.jpg"))?;
//!
//!     match enricher.process(record) {
//!         Ok(enriched) => {
//!             for (name, _) in enriched.fields() {
//!                 println!("field: /{name}");
//!             }
//!         }
//!         // The error owns the record; the caller decides where it goes.
//!         Err(err) => eprintln!("{err}"),
//!     }
//!
//!     enricher.teardown();
//!     Ok(())
//! }
//! ```
//!
//! ## Error Contract
//!
//! | Failure | Surface |
//! |---------|---------|
//! | Configuration rejected at start-up | [`error::ConfigIssue`] list from `initialize` |
//! | File stream unavailable per record | [`error::OnRecordError`] (`ENRICH_01`) |
//! | Metadata parse failure per record | [`error::OnRecordError`] (`ENRICH_02`) |
//! | Directory-level parse warnings | logged via [`diag::DiagnosticSink`], never surfaced |
//!
//! ## Modules
//!
//! - [`record`] — record/field model, path lookup, file references
//! - [`metadata`] — metadata model, parser seam, EXIF implementation
//! - [`stage`] — the initialize/process/teardown stage contract
//! - [`enrich`] — the record enricher stage
//! - [`runner`] — caller-owned driver with per-record error policies
//! - [`diag`] — injectable diagnostic sink
//! - [`error`] — error codes, config issues, per-record errors
//! - [`config`] — configuration types and loading/saving

pub mod config;
pub mod diag;
pub mod enrich;
pub mod error;
pub mod metadata;
pub mod record;
pub mod runner;
pub mod stage;
