use anyhow::{Context, Result};
use nom_exif::*;

use super::{MetadataDirectory, MetadataParser, MetadataTag};
use crate::record::ByteSource;

/// EXIF-backed [`MetadataParser`] using `nom-exif`.
///
/// `nom-exif` flattens EXIF data into a sequence of entries carrying an IFD
/// index; entries are regrouped here into directories named after that index
/// (`Exif IFD0` for the primary image, `Exif IFD1` for the thumbnail), in
/// first-appearance order. Entries whose value cannot be decoded become
/// directory warnings instead of failing the parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadataParser;

impl ExifMetadataParser {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataParser for ExifMetadataParser {
    fn name(&self) -> &str {
        "exif"
    }

    fn parse(&self, stream: Box<dyn ByteSource>) -> Result<Vec<MetadataDirectory>> {
        let mut parser = MediaParser::new();
        let ms = MediaSource::seekable(stream).context("failed to probe byte stream")?;
        let iter: ExifIter = parser.parse(ms).context("failed to parse EXIF metadata")?;

        let mut directories: Vec<MetadataDirectory> = Vec::new();
        for mut entry in iter {
            let dir_name = ifd_name(entry.ifd_index());
            let index = match directories.iter().position(|dir| dir.name == dir_name) {
                Some(index) => index,
                None => {
                    directories.push(MetadataDirectory::new(dir_name));
                    directories.len() - 1
                }
            };
            let directory = &mut directories[index];

            let tag_name = match entry.tag() {
                Some(tag) => tag.to_string(),
                None => format!("Unknown(0x{:04x})", entry.tag_code()),
            };
            match entry.take_value() {
                Some(value) => {
                    directory.tags.push(MetadataTag::new(tag_name, value.to_string()));
                }
                None => {
                    directory.warnings.push(format!("{tag_name}: value could not be decoded"));
                }
            }
        }

        Ok(directories)
    }
}

/// Directory name synthesized from a `nom-exif` IFD index.
fn ifd_name(index: usize) -> String {
    format!("Exif IFD{index}")
}
