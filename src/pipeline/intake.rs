//! File intake: classify a user-supplied spreadsheet and enforce size ceilings.
//!
//! Validation happens before any network traffic so the user gets an
//! immediate answer for the two cheap-to-detect problems: a format the
//! backend cannot parse, and a file over the class-specific upload ceiling.
//! Only metadata is inspected here; the bytes are read when the upload is
//! actually sent.

use crate::error::{RejectReason, Sheet2DeckError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Upload ceiling for csv-like files (15 MiB).
pub const CSV_MAX_BYTES: u64 = 15 * 1024 * 1024;

/// Upload ceiling for excel-like files (8 MiB).
pub const EXCEL_MAX_BYTES: u64 = 8 * 1024 * 1024;

/// The two extension classes the backend distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileClass {
    /// `csv`, `tsv`, `txt`
    CsvLike,
    /// `xlsx`, `xls`
    ExcelLike,
}

impl FileClass {
    /// Classify a lower-cased extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "csv" | "tsv" | "txt" => Some(FileClass::CsvLike),
            "xlsx" | "xls" => Some(FileClass::ExcelLike),
            _ => None,
        }
    }

    /// Maximum accepted size in bytes (inclusive).
    pub fn max_bytes(self) -> u64 {
        match self {
            FileClass::CsvLike => CSV_MAX_BYTES,
            FileClass::ExcelLike => EXCEL_MAX_BYTES,
        }
    }
}

impl fmt::Display for FileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileClass::CsvLike => f.write_str("CSV/TSV/TXT"),
            FileClass::ExcelLike => f.write_str("Excel"),
        }
    }
}

/// Where the file bytes live until upload.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on disk, read lazily at upload time.
    Path(PathBuf),
    /// An in-memory buffer (drag-and-drop, tests, piped input).
    Memory(Bytes),
}

impl FileSource {
    /// Read the full contents for upload.
    pub async fn read(&self) -> Result<Vec<u8>, Sheet2DeckError> {
        match self {
            FileSource::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| Sheet2DeckError::Io {
                        path: path.clone(),
                        source,
                    })
            }
            FileSource::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }
}

/// A file offered for intake, not yet validated.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub size: u64,
    pub source: FileSource,
}

impl FileCandidate {
    /// Describe a local file. Reads metadata only.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Sheet2DeckError> {
        let path = path.as_ref().to_path_buf();

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(Sheet2DeckError::PermissionDenied { path });
            }
            Err(_) => return Err(Sheet2DeckError::FileNotFound { path }),
        };
        if !metadata.is_file() {
            return Err(Sheet2DeckError::FileNotFound { path });
        }

        // Opening catches unreadable files before the user waits on an upload.
        if let Err(e) = std::fs::File::open(&path) {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                return Err(Sheet2DeckError::PermissionDenied { path });
            }
            return Err(Sheet2DeckError::Io { path, source: e });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name,
            size: metadata.len(),
            source: FileSource::Path(path),
        })
    }

    /// Wrap an in-memory buffer under the given file name.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }
}

/// A validated file waiting to be submitted.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub name: String,
    pub byte_size: u64,
    pub class: FileClass,
    pub extension: String,
    pub source: FileSource,
}

impl PendingFile {
    /// MIME type sent with the multipart part.
    pub fn mime_type(&self) -> &'static str {
        match self.extension.as_str() {
            "csv" => "text/csv",
            "tsv" => "text/tab-separated-values",
            "txt" => "text/plain",
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "xls" => "application/vnd.ms-excel",
            _ => "application/octet-stream",
        }
    }
}

/// Lower-cased substring after the final `.`, or `""` when there is none.
pub fn extension_of(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Validate a candidate against the format allow-set and its size ceiling.
pub fn validate(candidate: FileCandidate) -> Result<PendingFile, RejectReason> {
    let extension = extension_of(&candidate.name);
    let class = FileClass::from_extension(&extension).ok_or_else(|| {
        RejectReason::UnsupportedFormat {
            extension: extension.clone(),
        }
    })?;

    let limit = class.max_bytes();
    if candidate.size > limit {
        return Err(RejectReason::TooLarge {
            size: candidate.size,
            limit,
            class,
        });
    }

    debug!(
        "Accepted '{}' ({} bytes, {:?})",
        candidate.name, candidate.size, class
    );

    Ok(PendingFile {
        name: candidate.name,
        byte_size: candidate.size,
        class,
        extension,
        source: candidate.source,
    })
}
