//! Extraction of downloaded platform archives.
//!
//! Picks the platform's `.zip` from the download directory and unpacks it
//! into a freshly cleaned directory with path traversal protection to
//! prevent zip-slip attacks.

use std::io;
use std::path::{Component, Path};

use camino::{Utf8Path, Utf8PathBuf};

/// Trait for extracting archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use blobfetch::extract::ZipExtractor;
///
/// let extractor = ZipExtractor;
/// // Use extractor.extract(archive_path, dest_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`.
    ///
    /// Returns the archive-relative names of the extracted files.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape the destination directory, [`ExtractionError::EmptyArchive`]
    /// if no files are found, and [`ExtractionError::Io`] or
    /// [`ExtractionError::Archive`] on read failures.
    fn extract(
        &self,
        archive_path: &Utf8Path,
        dest_dir: &Utf8Path,
    ) -> Result<Vec<String>, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive could not be decoded.
    #[error("invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no files.
    #[error("archive contains no files")]
    EmptyArchive,

    /// No downloaded archive matches the platform.
    #[error("no {platform} zip archive found in {dir}")]
    NoArchive {
        /// The platform token searched for.
        platform: String,
        /// The directory that was searched.
        dir: Utf8PathBuf,
    },
}

/// Default extractor backed by the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(
        &self,
        archive_path: &Utf8Path,
        dest_dir: &Utf8Path,
    ) -> Result<Vec<String>, ExtractionError> {
        let file = std::fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let mut extracted = Vec::new();

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let entry_name = entry.name().to_owned();
            validate_entry_path(Path::new(&entry_name))?;

            let dest_path = dest_dir.join(&entry_name);
            if entry.is_dir() {
                std::fs::create_dir_all(&dest_path)?;
                continue;
            }
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut output = std::fs::File::create(&dest_path)?;
            io::copy(&mut entry, &mut output)?;
            extracted.push(entry_name);
        }

        if extracted.is_empty() {
            return Err(ExtractionError::EmptyArchive);
        }

        Ok(extracted)
    }
}

/// Validate that an entry path does not escape the destination
/// directory via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path.has_root()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// An archive unpacked into the extraction directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArchive {
    /// The archive that was selected.
    pub archive: Utf8PathBuf,
    /// Where its contents were written.
    pub destination: Utf8PathBuf,
    /// Archive-relative names of the extracted files.
    pub files: Vec<String>,
}

/// Unpack the platform archive from `download_dir` into `extracted_dir`.
///
/// The archive is the first `.zip` file, in file name order, whose name
/// contains `platform` case-insensitively. `extracted_dir` is emptied only
/// once an archive has been selected, so a failed lookup leaves it as is.
///
/// # Errors
///
/// Returns [`ExtractionError::NoArchive`] when nothing matches and
/// propagates extractor and filesystem failures.
pub fn extract_platform_archive(
    extractor: &dyn ArchiveExtractor,
    download_dir: &Utf8Path,
    extracted_dir: &Utf8Path,
    platform: &str,
) -> Result<ExtractedArchive, ExtractionError> {
    let archive = find_platform_archive(download_dir, platform)?;
    reset_dir(extracted_dir)?;
    let files = extractor.extract(&archive, extracted_dir)?;
    Ok(ExtractedArchive {
        archive,
        destination: extracted_dir.to_owned(),
        files,
    })
}

fn find_platform_archive(
    download_dir: &Utf8Path,
    platform: &str,
) -> Result<Utf8PathBuf, ExtractionError> {
    let not_found = || ExtractionError::NoArchive {
        platform: platform.to_owned(),
        dir: download_dir.to_owned(),
    };
    let entries = match download_dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    let token = platform.to_lowercase();
    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_lowercase();
        if entry.file_type()?.is_file()
            && Utf8Path::new(&name).extension() == Some("zip")
            && name.contains(&token)
        {
            candidates.push(entry.into_path());
        }
    }
    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    candidates.into_iter().next().ok_or_else(not_found)
}

fn reset_dir(dir: &Utf8Path) -> io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::fs::create_dir_all(dir)
}
