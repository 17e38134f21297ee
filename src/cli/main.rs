use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use exif_enrich::config::Config;
use exif_enrich::enrich::{FILE_REF_PATH, FILENAME_PATH, MetadataEnricher};
use exif_enrich::error::FieldPathError;
use exif_enrich::record::{Field, LocalFileRef, Record};
use exif_enrich::runner::StageRunner;

/// Extensions the EXIF parser yields directory/tag output for.
const IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "tif", "tiff", "heic", "heif", "avif"];

#[derive(Parser, Debug)]
#[command(
    name = "exif-enrich",
    version,
    about = "Enrich pipeline records with EXIF metadata extracted from their attached image files"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Pretty-print enriched records
    #[arg(long)]
    pretty: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = Config::default();
        config.save(cli.config.as_deref())?;
        println!("Default config written");
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;

    if cli.paths.is_empty() {
        anyhow::bail!("no input paths given; pass image files or directories");
    }
    let images = collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("no supported image files found");
    }

    let enricher = MetadataEnricher::new(config.config.clone());
    let mut runner = StageRunner::new(enricher).with_policy(config.on_record_error);
    if let Err(err) = runner.start() {
        for issue in &err.issues {
            eprintln!("{issue}");
        }
        return Err(err.into());
    }

    let records = images
        .iter()
        .map(|path| make_record(path))
        .collect::<Result<Vec<_>, FieldPathError>>()?;

    let batch = match runner.process_batch(records) {
        Ok(batch) => batch,
        Err(err) => {
            runner.stop();
            return Err(err.into());
        }
    };

    let pretty = cli.pretty || config.output.pretty;
    for record in &batch.output {
        let json = if pretty {
            serde_json::to_string_pretty(record)?
        } else {
            serde_json::to_string(record)?
        };
        println!("{json}");
    }
    for err in &batch.error_records {
        log::error!("{err}: {}", err.source);
    }

    runner.stop();
    Ok(())
}

/// Build the input record for one image file.
fn make_record(path: &Path) -> Result<Record, FieldPathError> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let mut record = Record::new(filename.clone());
    record.set(FILE_REF_PATH, Field::file_ref(LocalFileRef::new(path)))?;
    record.set(FILENAME_PATH, Field::string(filename))?;
    record.set("/fileInfo/path", Field::string(path.display().to_string()))?;
    Ok(record)
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks); only files with supported image
/// extensions are included.
fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // ── is_supported_image ───────────────────────────────────────────

    #[test]
    fn supported_image_extensions() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.heic")));
    }

    #[test]
    fn unsupported_image_extensions() {
        assert!(!is_supported_image(Path::new("doc.pdf")));
        assert!(!is_supported_image(Path::new("video.mp4")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    // ── collect_images ───────────────────────────────────────────────

    #[test]
    fn collect_images_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let images = collect_images(&[jpg.clone()]);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0], jpg);
    }

    #[test]
    fn collect_images_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.png"), b"fake").unwrap();
        fs::write(sub.join("c.txt"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn collect_images_nonexistent_path() {
        let images = collect_images(&[PathBuf::from("/nonexistent/path")]);
        assert!(images.is_empty());
    }

    // ── make_record ──────────────────────────────────────────────────

    #[test]
    fn record_carries_file_ref_and_filename() {
        let record = make_record(Path::new("/photos/holiday.jpg")).unwrap();
        assert_eq!(record.id(), "holiday.jpg");
        assert_eq!(record.get_str(FILENAME_PATH).unwrap(), "holiday.jpg");
        assert_eq!(record.get_str("/fileInfo/path").unwrap(), "/photos/holiday.jpg");
        assert!(record.get_file_ref(FILE_REF_PATH).is_ok());
    }
}
