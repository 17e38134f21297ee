//! Record and field model for the enrichment stage.
//!
//! A [`Record`] is an insertion-ordered mapping from top-level field names to
//! [`Field`] values, addressed through `/`-separated path strings
//! (e.g. `/fileInfo/filename`). Path lookups fail explicitly with a
//! [`FieldPathError`] — there is no reflective "maybe" access.
//!
//! Binary payloads are attached through the [`FileRef`] trait, which hands out
//! a fresh readable byte stream per call. Streams are plain owned values, so
//! they are released on every exit path simply by being dropped.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::FieldPathError;

/// A readable, seekable byte stream produced by a [`FileRef`].
pub trait ByteSource: Read + Seek + Send {}

impl<T: Read + Seek + Send> ByteSource for T {}

/// A record-attached binary payload that can be opened as a byte stream.
///
/// Every call to [`open`](FileRef::open) yields an independent stream
/// positioned at the start of the payload. Opening may fail (e.g. the backing
/// file disappeared), and that failure is treated by the stage exactly like a
/// parse failure: the record goes to the error path.
pub trait FileRef: Send + Sync {
    fn open(&self) -> Result<Box<dyn ByteSource>>;
}

/// A [`FileRef`] backed by a file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileRef {
    path: PathBuf,
}

impl LocalFileRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileRef for LocalFileRef {
    fn open(&self) -> Result<Box<dyn ByteSource>> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        Ok(Box::new(file))
    }
}

/// A [`FileRef`] holding its payload in memory.
///
/// Useful for tests and for records whose payload was already buffered by the
/// host. Opening never fails; the stream reads over a shared copy of the
/// bytes.
#[derive(Debug, Clone)]
pub struct BytesFileRef {
    bytes: Arc<[u8]>,
}

impl BytesFileRef {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into().into() }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl FileRef for BytesFileRef {
    fn open(&self) -> Result<Box<dyn ByteSource>> {
        Ok(Box::new(Cursor::new(Arc::clone(&self.bytes))))
    }
}

/// The kind of a [`Field`], used in path-lookup error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Str,
    List,
    Map,
    FileRef,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Bool => "bool",
            FieldKind::Str => "string",
            FieldKind::List => "list",
            FieldKind::Map => "map",
            FieldKind::FileRef => "fileRef",
        };
        f.write_str(name)
    }
}

/// A typed record field value.
///
/// `Map` preserves insertion order, and re-inserting an existing key replaces
/// the value while keeping the key's original position — the same semantics a
/// linked hash map gives a last-write-wins update.
#[derive(Clone)]
pub enum Field {
    Bool(bool),
    Str(String),
    List(Vec<Field>),
    Map(IndexMap<String, Field>),
    FileRef(Arc<dyn FileRef>),
}

impl Field {
    /// Convenience constructor for string fields.
    pub fn string(value: impl Into<String>) -> Self {
        Field::Str(value.into())
    }

    /// Wrap a [`FileRef`] implementation as a field value.
    pub fn file_ref(file_ref: impl FileRef + 'static) -> Self {
        Field::FileRef(Arc::new(file_ref))
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::Bool(_) => FieldKind::Bool,
            Field::Str(_) => FieldKind::Str,
            Field::List(_) => FieldKind::List,
            Field::Map(_) => FieldKind::Map,
            Field::FileRef(_) => FieldKind::FileRef,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Field::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Field]> {
        match self {
            Field::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Field>> {
        match self {
            Field::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_file_ref(&self) -> Option<&Arc<dyn FileRef>> {
        match self {
            Field::FileRef(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Field::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Field::List(v) => f.debug_tuple("List").field(v).finish(),
            Field::Map(v) => f.debug_tuple("Map").field(v).finish(),
            Field::FileRef(_) => f.write_str("FileRef(..)"),
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Bool(a), Field::Bool(b)) => a == b,
            (Field::Str(a), Field::Str(b)) => a == b,
            (Field::List(a), Field::List(b)) => a == b,
            (Field::Map(a), Field::Map(b)) => a == b,
            // File references have no value identity; compare by handle.
            (Field::FileRef(a), Field::FileRef(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Field::Bool(v) => serializer.serialize_bool(*v),
            Field::Str(v) => serializer.serialize_str(v),
            Field::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Field::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, value) in entries {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            // Opaque stream handle; render a marker instead of the payload.
            Field::FileRef(_) => serializer.serialize_str("<fileRef>"),
        }
    }
}

/// A pipeline record: an id (diagnostics only) plus insertion-ordered
/// top-level fields.
///
/// # Example
///
/// ```rust
/// use exif_enrich::record::{Field, Record};
///
/// let mut record = Record::new("r-1");
/// record.set("/fileInfo/filename", Field::string("photo.jpg")).unwrap();
/// assert_eq!(record.get_str("/fileInfo/filename").unwrap(), "photo.jpg");
/// assert!(record.get("/missing").is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    fields: IndexMap<String, Field>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), fields: IndexMap::new() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate top-level fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_ok()
    }

    /// Look up the field at an absolute `/`-separated path.
    ///
    /// Intermediate segments must resolve to `Map` fields; anything else is a
    /// [`FieldPathError::WrongKind`], and an absent segment is
    /// [`FieldPathError::Missing`].
    pub fn get(&self, path: &str) -> std::result::Result<&Field, FieldPathError> {
        let segments = split_path(path)?;
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => return Err(FieldPathError::Invalid { path: path.to_string() }),
        };

        let mut map = &self.fields;
        for (depth, segment) in parents.iter().enumerate() {
            match map.get(*segment) {
                Some(Field::Map(inner)) => map = inner,
                Some(other) => {
                    return Err(FieldPathError::WrongKind {
                        path: joined(&segments[..=depth]),
                        expected: FieldKind::Map,
                        actual: other.kind(),
                    });
                }
                None => return Err(FieldPathError::Missing { path: path.to_string() }),
            }
        }

        map.get(*last)
            .ok_or_else(|| FieldPathError::Missing { path: path.to_string() })
    }

    /// Look up a string field.
    pub fn get_str(&self, path: &str) -> std::result::Result<&str, FieldPathError> {
        match self.get(path)? {
            Field::Str(value) => Ok(value),
            other => Err(FieldPathError::WrongKind {
                path: path.to_string(),
                expected: FieldKind::Str,
                actual: other.kind(),
            }),
        }
    }

    /// Look up a file-reference field.
    pub fn get_file_ref(
        &self,
        path: &str,
    ) -> std::result::Result<&Arc<dyn FileRef>, FieldPathError> {
        match self.get(path)? {
            Field::FileRef(value) => Ok(value),
            other => Err(FieldPathError::WrongKind {
                path: path.to_string(),
                expected: FieldKind::FileRef,
                actual: other.kind(),
            }),
        }
    }

    /// Set the field at an absolute path, creating intermediate maps as
    /// needed.
    ///
    /// An existing field at the target path is overwritten in place (no
    /// merge), keeping its position among its siblings. Fails if an
    /// intermediate segment already holds a non-map field.
    pub fn set(&mut self, path: &str, field: Field) -> std::result::Result<(), FieldPathError> {
        let segments = split_path(path)?;
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => return Err(FieldPathError::Invalid { path: path.to_string() }),
        };

        let mut map = &mut self.fields;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = map
                .entry((*segment).to_string())
                .or_insert_with(|| Field::Map(IndexMap::new()));
            map = match entry {
                Field::Map(inner) => inner,
                other => {
                    return Err(FieldPathError::WrongKind {
                        path: joined(&segments[..=depth]),
                        expected: FieldKind::Map,
                        actual: other.kind(),
                    });
                }
            };
        }

        map.insert((*last).to_string(), field);
        Ok(())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, field) in &self.fields {
            map.serialize_entry(name, field)?;
        }
        map.end()
    }
}

fn split_path(path: &str) -> std::result::Result<Vec<&str>, FieldPathError> {
    let invalid = || FieldPathError::Invalid { path: path.to_string() };
    let rest = path.strip_prefix('/').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }
    let segments: Vec<&str> = rest.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(invalid());
    }
    Ok(segments)
}

fn joined(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}
