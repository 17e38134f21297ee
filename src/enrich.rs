//! The record enricher: the stage that turns embedded file metadata into
//! record fields.

use std::sync::Arc;

use indexmap::IndexMap;
use log::Level;

use crate::diag::{DiagnosticSink, LogSink};
use crate::error::{ConfigIssue, ErrorCode, OnRecordError};
use crate::metadata::{ExifMetadataParser, MetadataParser};
use crate::record::{Field, Record};
use crate::stage::RecordProcessor;

/// Sentinel configuration value rejected at start-up.
pub const INVALID_CONFIG: &str = "invalidValue";

/// Record path of the file reference consumed per record.
pub const FILE_REF_PATH: &str = "/fileRef";

/// Record path of the filename, read only for failure diagnostics.
pub const FILENAME_PATH: &str = "/fileInfo/filename";

const CONFIG_GROUP: &str = "ENRICH";
const CONFIG_OPTION: &str = "config";

/// Enriches records with metadata extracted from their attached file.
///
/// Per record: opens the `/fileRef` byte stream, runs the metadata parser,
/// and sets one new top-level field per discovered directory — an ordered
/// mapping from tag name to description. Stream or parse failures fail the
/// record with a per-record error instead of forwarding it.
///
/// Holds no state across records beyond the configuration captured at
/// construction. Both the parser and the diagnostic sink are injectable.
///
/// # Example
///
/// ```rust,no_run
/// use exif_enrich::enrich::MetadataEnricher;
/// use exif_enrich::record::{Field, LocalFileRef, Record};
/// use exif_enrich::stage::RecordProcessor;
///
/// let mut enricher = MetadataEnricher::new("value");
/// assert!(enricher.initialize().is_empty());
///
/// let mut record = Record::new("photo-1");
/// record.set("/fileRef", Field::file_ref(LocalFileRef::new("photo.jpg"))).unwrap();
/// record.set("/fileInfo/filename", Field::string("photo.jpg")).unwrap();
///
/// match enricher.process(record) {
///     Ok(enriched) => println!("{} field(s)", enriched.len()),
///     Err(err) => eprintln!("{err}"),
/// }
/// enricher.teardown();
/// ```
pub struct MetadataEnricher {
    config: String,
    parser: Box<dyn MetadataParser>,
    diag: Arc<dyn DiagnosticSink>,
}

impl MetadataEnricher {
    /// Create an enricher backed by the EXIF parser and the `log` facade.
    pub fn new(config: impl Into<String>) -> Self {
        Self::with_parser(config, Box::new(ExifMetadataParser::new()))
    }

    /// Create an enricher with a custom metadata parser.
    pub fn with_parser(config: impl Into<String>, parser: Box<dyn MetadataParser>) -> Self {
        Self { config: config.into(), parser, diag: Arc::new(LogSink) }
    }

    /// Replace the diagnostic sink.
    pub fn with_diagnostics(mut self, diag: Arc<dyn DiagnosticSink>) -> Self {
        self.diag = diag;
        self
    }

    /// The configuration value captured at construction.
    pub fn config(&self) -> &str {
        &self.config
    }

    /// Wrap a failure as a per-record error, logging the diagnostic line the
    /// filename field exists for.
    fn fail(&self, code: ErrorCode, record: Record, source: anyhow::Error) -> OnRecordError {
        let filename = record
            .get_str(FILENAME_PATH)
            .map(str::to_owned)
            .unwrap_or_else(|_| "<unknown>".to_string());
        self.diag.emit(
            Level::Info,
            &format!("failed to extract metadata from {filename}: {source:#}"),
        );
        OnRecordError::new(code, record, source)
    }
}

impl RecordProcessor for MetadataEnricher {
    fn initialize(&mut self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.config == INVALID_CONFIG {
            issues.push(ConfigIssue::new(
                CONFIG_GROUP,
                CONFIG_OPTION,
                ErrorCode::InvalidConfig,
                format!("the value {INVALID_CONFIG:?} is rejected by this stage"),
            ));
        }

        issues
    }

    fn process(&mut self, mut record: Record) -> Result<Record, OnRecordError> {
        self.diag.emit(Level::Debug, &format!("input record: {record:?}"));

        let stream = record
            .get_file_ref(FILE_REF_PATH)
            .map_err(anyhow::Error::new)
            .and_then(|file_ref| file_ref.open());
        let stream = match stream {
            Ok(stream) => stream,
            Err(source) => return Err(self.fail(ErrorCode::StreamUnavailable, record, source)),
        };

        // The parser owns the stream from here: it is dropped (and the
        // descriptor released) before parse returns, on every exit path.
        let directories = match self.parser.parse(stream) {
            Ok(directories) => directories,
            Err(source) => return Err(self.fail(ErrorCode::MetadataRead, record, source)),
        };

        for directory in directories {
            let mut tags = IndexMap::new();
            for tag in directory.tags {
                // Duplicate tag names: last write wins, position kept.
                tags.insert(tag.name, Field::Str(tag.description));
            }

            for warning in &directory.warnings {
                self.diag.emit(
                    Level::Info,
                    &format!("metadata warning in {}: {warning}", directory.name),
                );
            }

            // A later directory with the same name overwrites, no merge.
            let path = format!("/{}", directory.name);
            if let Err(source) = record.set(&path, Field::Map(tags)) {
                return Err(self.fail(ErrorCode::MetadataRead, record, anyhow::Error::new(source)));
            }
        }

        self.diag.emit(Level::Debug, &format!("output record: {record:?}"));
        Ok(record)
    }

    fn teardown(&mut self) {
        // Nothing acquired at start-up; stays safe to call repeatedly.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::MemorySink;
    use crate::metadata::{MetadataDirectory, MetadataParser, MetadataTag};
    use crate::record::{ByteSource, BytesFileRef, FieldKind};
    use anyhow::anyhow;

    /// Parser returning a canned result, ignoring the stream.
    struct StubParser {
        directories: Vec<MetadataDirectory>,
    }

    impl MetadataParser for StubParser {
        fn name(&self) -> &str {
            "stub"
        }

        fn parse(&self, _stream: Box<dyn ByteSource>) -> anyhow::Result<Vec<MetadataDirectory>> {
            Ok(self.directories.clone())
        }
    }

    /// Parser that always fails.
    struct FailingParser;

    impl MetadataParser for FailingParser {
        fn name(&self) -> &str {
            "failing"
        }

        fn parse(&self, _stream: Box<dyn ByteSource>) -> anyhow::Result<Vec<MetadataDirectory>> {
            Err(anyhow!("malformed metadata segment"))
        }
    }

    fn directory(name: &str, tags: &[(&str, &str)]) -> MetadataDirectory {
        let mut dir = MetadataDirectory::new(name);
        for (tag_name, description) in tags {
            dir.tags.push(MetadataTag::new(*tag_name, *description));
        }
        dir
    }

    fn input_record(id: &str) -> Record {
        let mut record = Record::new(id);
        record
            .set(FILE_REF_PATH, Field::file_ref(BytesFileRef::new(b"payload".to_vec())))
            .unwrap();
        record.set(FILENAME_PATH, Field::string(format!("{id}.jpg"))).unwrap();
        record
    }

    fn enricher_with(directories: Vec<MetadataDirectory>) -> MetadataEnricher {
        MetadataEnricher::with_parser("value", Box::new(StubParser { directories }))
    }

    // ── start-up validation ──────────────────────────────────────────

    #[test]
    fn any_config_but_the_sentinel_is_accepted() {
        for config in ["value", "", "other", "invalidvalue", "INVALIDVALUE"] {
            let mut enricher = MetadataEnricher::new(config);
            assert!(enricher.initialize().is_empty(), "config {config:?} should pass");
        }
    }

    #[test]
    fn sentinel_config_yields_exactly_one_issue() {
        let mut enricher = MetadataEnricher::new(INVALID_CONFIG);
        let issues = enricher.initialize();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ErrorCode::InvalidConfig);
        assert_eq!(issues[0].group, "ENRICH");
        assert_eq!(issues[0].option, "config");
    }

    // ── enrichment ───────────────────────────────────────────────────

    #[test]
    fn one_field_per_directory_with_tags_in_order() {
        let mut enricher = enricher_with(vec![
            directory("Exif IFD0", &[("Make", "Canon"), ("Model", "EOS R5")]),
            directory("Exif IFD1", &[("Compression", "JPEG")]),
        ]);
        let record = enricher.process(input_record("r-1")).unwrap();

        let ifd0 = record.get("/Exif IFD0").unwrap().as_map().unwrap();
        let names: Vec<&str> = ifd0.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Make", "Model"]);
        assert_eq!(ifd0["Make"], Field::string("Canon"));
        assert_eq!(ifd0["Model"], Field::string("EOS R5"));

        let ifd1 = record.get("/Exif IFD1").unwrap().as_map().unwrap();
        assert_eq!(ifd1["Compression"], Field::string("JPEG"));
    }

    #[test]
    fn orientation_scenario_leaves_rest_of_record_unchanged() {
        let mut enricher =
            enricher_with(vec![directory("Exif IFD0", &[("Orientation", "Top-left")])]);
        let record = enricher.process(input_record("photo")).unwrap();

        let ifd0 = record.get("/Exif IFD0").unwrap().as_map().unwrap();
        assert_eq!(ifd0.len(), 1);
        assert_eq!(ifd0["Orientation"], Field::string("Top-left"));

        // Original fields forwarded untouched.
        assert_eq!(record.get_str(FILENAME_PATH).unwrap(), "photo.jpg");
        assert_eq!(record.get(FILE_REF_PATH).unwrap().kind(), FieldKind::FileRef);
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn later_directory_with_same_name_overwrites() {
        let mut enricher = enricher_with(vec![
            directory("Exif IFD0", &[("Make", "Canon")]),
            directory("Exif IFD0", &[("Model", "EOS R5")]),
        ]);
        let record = enricher.process(input_record("r-1")).unwrap();

        let ifd0 = record.get("/Exif IFD0").unwrap().as_map().unwrap();
        assert_eq!(ifd0.len(), 1, "overwrite, not merge");
        assert!(ifd0.contains_key("Model"));
        assert!(!ifd0.contains_key("Make"));
    }

    #[test]
    fn duplicate_tag_names_keep_last_description_and_first_position() {
        let mut enricher = enricher_with(vec![directory(
            "Exif IFD0",
            &[("Make", "Canon"), ("Model", "EOS R5"), ("Make", "Nikon")],
        )]);
        let record = enricher.process(input_record("r-1")).unwrap();

        let ifd0 = record.get("/Exif IFD0").unwrap().as_map().unwrap();
        let names: Vec<&str> = ifd0.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Make", "Model"]);
        assert_eq!(ifd0["Make"], Field::string("Nikon"));
    }

    // ── warnings ─────────────────────────────────────────────────────

    #[test]
    fn warnings_are_logged_but_never_surfaced() {
        let mut dir = directory("Exif IFD0", &[("Make", "Canon")]);
        dir.warnings.push("bad thumbnail offset".to_string());

        let sink = Arc::new(MemorySink::new());
        let mut enricher = enricher_with(vec![dir]).with_diagnostics(sink.clone());
        let record = enricher.process(input_record("r-1")).unwrap();

        let ifd0 = record.get("/Exif IFD0").unwrap().as_map().unwrap();
        assert_eq!(ifd0.len(), 1, "warnings must not become fields");

        let infos = sink.messages_at(Level::Info);
        assert!(infos.iter().any(|m| m.contains("bad thumbnail offset")));
    }

    // ── failure paths ────────────────────────────────────────────────

    #[test]
    fn parse_failure_fails_the_record_with_its_cause() {
        let mut enricher = MetadataEnricher::with_parser("value", Box::new(FailingParser));
        let err = enricher.process(input_record("r-9")).unwrap_err();

        assert_eq!(err.code, ErrorCode::MetadataRead);
        assert_eq!(err.record.id(), "r-9");
        assert!(err.source.to_string().contains("malformed metadata segment"));
    }

    #[test]
    fn parse_failure_logs_the_filename() {
        let sink = Arc::new(MemorySink::new());
        let mut enricher = MetadataEnricher::with_parser("value", Box::new(FailingParser))
            .with_diagnostics(sink.clone());
        enricher.process(input_record("r-9")).unwrap_err();

        let infos = sink.messages_at(Level::Info);
        assert!(infos.iter().any(|m| m.contains("r-9.jpg")));
    }

    #[test]
    fn missing_file_ref_is_a_stream_error() {
        let mut enricher = enricher_with(vec![]);
        let mut record = Record::new("r-2");
        record.set(FILENAME_PATH, Field::string("r-2.jpg")).unwrap();

        let err = enricher.process(record).unwrap_err();
        assert_eq!(err.code, ErrorCode::StreamUnavailable);
        assert_eq!(err.record.id(), "r-2");
    }

    #[test]
    fn missing_filename_does_not_mask_the_failure() {
        let sink = Arc::new(MemorySink::new());
        let mut enricher = MetadataEnricher::with_parser("value", Box::new(FailingParser))
            .with_diagnostics(sink.clone());
        let mut record = Record::new("r-3");
        record
            .set(FILE_REF_PATH, Field::file_ref(BytesFileRef::new(Vec::new())))
            .unwrap();

        let err = enricher.process(record).unwrap_err();
        assert_eq!(err.code, ErrorCode::MetadataRead);
        let infos = sink.messages_at(Level::Info);
        assert!(infos.iter().any(|m| m.contains("<unknown>")));
    }

    #[test]
    fn empty_stream_fails_with_the_real_parser() {
        let mut enricher = MetadataEnricher::new("value");
        let mut record = Record::new("empty");
        record
            .set(FILE_REF_PATH, Field::file_ref(BytesFileRef::new(Vec::new())))
            .unwrap();
        record.set(FILENAME_PATH, Field::string("empty.jpg")).unwrap();

        let err = enricher.process(record).unwrap_err();
        assert_eq!(err.code, ErrorCode::MetadataRead);
        assert_eq!(err.record.id(), "empty");
    }

    // ── lifecycle ────────────────────────────────────────────────────

    #[test]
    fn teardown_is_idempotent() {
        let mut enricher = MetadataEnricher::new("value");
        enricher.initialize();
        enricher.teardown();
        enricher.teardown();
    }
}
