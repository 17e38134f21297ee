//! Metadata model and the parser seam.
//!
//! A parse produces a sequence of named *directories*, each an ordered list
//! of *tags* (name plus human-readable description) and an optional list of
//! non-fatal warnings. The result is transient: the stage converts it into
//! record fields within the same call and discards it.
//!
//! [`MetadataParser`] is the seam to the actual extraction library;
//! [`ExifMetadataParser`] is the production implementation.

mod exif;

pub use exif::ExifMetadataParser;

use anyhow::Result;

use crate::record::ByteSource;

/// A single metadata entry: a name and its human-readable description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTag {
    pub name: String,
    pub description: String,
}

impl MetadataTag {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into() }
    }
}

/// A named group of metadata tags (e.g. an EXIF image-file-directory block).
///
/// `warnings` carries non-fatal issues the parser hit inside this directory;
/// they are logged by the stage but never surface in the output record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDirectory {
    pub name: String,
    pub tags: Vec<MetadataTag>,
    pub warnings: Vec<String>,
}

impl MetadataDirectory {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), tags: Vec::new(), warnings: Vec::new() }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Parses embedded metadata out of a byte stream.
///
/// The parser consumes the stream, so it is dropped — and any underlying
/// descriptor released — before the call returns, on success and failure
/// alike. An `Err` means the stream was malformed or unreadable and becomes
/// the cause of a per-record error.
pub trait MetadataParser: Send + Sync {
    /// Short name for diagnostics (e.g. `"exif"`).
    fn name(&self) -> &str;

    fn parse(&self, stream: Box<dyn ByteSource>) -> Result<Vec<MetadataDirectory>>;
}
