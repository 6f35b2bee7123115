// blob_backup/src/backup/archive.rs
use crate::config::ArchiveFormat;
use crate::errors::{BackupError, Result};
use chrono::{DateTime, Local};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::FileOptions;

const ARCHIVE_PREFIX: &str = "backup";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Builds `backup-YYYYMMDD-HHMMSS.<ext>` for the given instant.
pub fn archive_file_name(timestamp: &DateTime<Local>, format: ArchiveFormat) -> String {
    format!(
        "{}-{}.{}",
        ARCHIVE_PREFIX,
        timestamp.format(TIMESTAMP_FORMAT),
        format.extension()
    )
}

/// Archives every regular file under `source_dir` into a new timestamped file in `output_dir`.
///
/// Paths inside the archive are relative to `source_dir`. `output_dir` is created if missing.
pub fn create_backup(source_dir: &Path, output_dir: &Path, format: ArchiveFormat) -> Result<PathBuf> {
    create_backup_at(source_dir, output_dir, format, Local::now())
}

pub fn create_backup_at(
    source_dir: &Path,
    output_dir: &Path,
    format: ArchiveFormat,
    timestamp: DateTime<Local>,
) -> Result<PathBuf> {
    if !source_dir.is_dir() {
        return Err(BackupError::SourceIo {
            message: format!(
                "Source for archival is not a directory: {}",
                source_dir.display()
            ),
            source: None,
        });
    }

    fs::create_dir_all(output_dir).map_err(|e| {
        BackupError::source_io(
            format!("Failed to create output directory {}", output_dir.display()),
            e,
        )
    })?;

    let archive_path = output_dir.join(archive_file_name(&timestamp, format));
    let files = collect_files(source_dir)?;
    // Resolved up front so an unrepresentable name fails before the archive file exists.
    let zip_entries = match format {
        ArchiveFormat::Zip => files
            .iter()
            .map(|f| zip_entry_name(&f.relative).map(|name| (name, f)))
            .collect::<Result<Vec<_>>>()?,
        ArchiveFormat::TarGz => Vec::new(),
    };

    let archive_file = File::create(&archive_path).map_err(|e| {
        BackupError::source_io(
            format!("Failed to create archive file {}", archive_path.display()),
            e,
        )
    })?;

    match format {
        ArchiveFormat::Zip => write_zip(archive_file, &zip_entries)?,
        ArchiveFormat::TarGz => write_tar_gz(archive_file, &files)?,
    }

    info!("Created archive: {}", archive_path.display());
    Ok(archive_path)
}

/// A regular file found under the source root.
struct SourceFile {
    path: PathBuf,
    relative: PathBuf,
}

fn collect_files(source_dir: &Path) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_symlink() {
            // File links are stored with the target's bytes; directory links are not descended.
            match fs::metadata(path) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!("Skipping dangling link {}: {}", path.display(), e);
                    continue;
                }
            }
        } else if !entry.file_type().is_file() {
            continue;
        }
        let relative = path.strip_prefix(source_dir).map_err(|_| BackupError::SourceIo {
            message: format!(
                "Failed to strip prefix {} from {}",
                source_dir.display(),
                path.display()
            ),
            source: None,
        })?;
        files.push(SourceFile {
            path: path.to_path_buf(),
            relative: relative.to_path_buf(),
        });
    }
    Ok(files)
}

/// Zip entry names are UTF-8 with forward slashes; anything else is refused rather than mangled.
fn zip_entry_name(relative: &Path) -> Result<String> {
    relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| BackupError::SourceIo {
                message: format!(
                    "File name is not valid UTF-8 and cannot be stored in a zip archive: {}",
                    relative.display()
                ),
                source: None,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(|parts| parts.join("/"))
}

fn open_source(file: &SourceFile) -> Result<File> {
    File::open(&file.path)
        .map_err(|e| BackupError::source_io(format!("Failed to read {}", file.path.display()), e))
}

fn write_zip(archive_file: File, files: &[(String, &SourceFile)]) -> Result<()> {
    let mut zip = ZipWriter::new(BufWriter::new(archive_file));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, file) in files {
        let mut source = open_source(file)?;
        zip.start_file(name.as_str(), options)?;
        std::io::copy(&mut source, &mut zip).map_err(|e| {
            BackupError::source_io(format!("Failed to add {} to zip archive", name), e)
        })?;
    }

    let mut writer = zip.finish()?;
    writer
        .flush()
        .map_err(|e| BackupError::source_io("Failed to flush zip archive", e))
}

fn write_tar_gz(archive_file: File, files: &[SourceFile]) -> Result<()> {
    let enc = GzEncoder::new(BufWriter::new(archive_file), Compression::default());
    let mut tar_builder = Builder::new(enc);

    for file in files {
        let mut source = open_source(file)?;
        tar_builder
            .append_file(&file.relative, &mut source)
            .map_err(|e| {
                BackupError::source_io(
                    format!("Failed to add {} to tar archive", file.relative.display()),
                    e,
                )
            })?;
    }

    let encoder = tar_builder
        .into_inner()
        .map_err(|e| BackupError::source_io("Failed to finish tar stream", e))?;
    let mut writer = encoder
        .finish()
        .map_err(|e| BackupError::source_io("Failed to finish gzip encoding", e))?;
    writer
        .flush()
        .map_err(|e| BackupError::source_io("Failed to flush tar.gz archive", e))
}
