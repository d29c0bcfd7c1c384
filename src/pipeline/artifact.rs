//! The generated deck, materialised on disk until it is released.
//!
//! An [`Artifact`] owns a private temporary directory holding exactly one
//! file. Dropping the artifact deletes the directory, which is how the
//! workflow releases the previous result before starting a new submission.
//! Callers that want to keep the deck copy it out with [`Artifact::save_to`].

use crate::error::Sheet2DeckError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// A downloadable deck plus the warnings the backend attached to it.
#[derive(Debug)]
pub struct Artifact {
    filename: String,
    warnings: Vec<String>,
    size: u64,
    path: PathBuf,
    _dir: TempDir,
}

impl Artifact {
    /// Write `bytes` to a fresh temporary location under `filename`.
    pub async fn create(
        filename: impl Into<String>,
        bytes: &[u8],
        warnings: Vec<String>,
    ) -> Result<Self, Sheet2DeckError> {
        let filename = filename.into();
        let dir = tempfile::Builder::new()
            .prefix("sheet2deck-")
            .tempdir()
            .map_err(|e| Sheet2DeckError::Internal(format!("Failed to create temp dir: {e}")))?;
        let path = dir.path().join(&filename);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| Sheet2DeckError::Io {
                path: path.clone(),
                source,
            })?;

        debug!("Artifact '{}' live at {}", filename, path.display());

        Ok(Self {
            filename,
            warnings,
            size: bytes.len() as u64,
            path,
            _dir: dir,
        })
    }

    /// Suggested download filename, e.g. `performance-q4.pptx`.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Location of the live file. Invalid once the artifact is dropped.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file://` URL of the live file.
    pub fn url(&self) -> String {
        format!("file://{}", self.path.display())
    }

    /// Copy the deck to `dest`. A directory destination receives
    /// `dest/<filename>`. Returns the final path.
    pub async fn save_to(&self, dest: impl AsRef<Path>) -> Result<PathBuf, Sheet2DeckError> {
        copy_out(&self.path, &self.filename, dest.as_ref()).await
    }

    /// Owned, serialisable view for callers that outlive the artifact.
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            filename: self.filename.clone(),
            warnings: self.warnings.clone(),
            size: self.size,
            path: self.path.clone(),
        }
    }
}

/// Copy a live artifact file to `dest` (a file path, or a directory that
/// receives `dest/<filename>`).
pub(crate) async fn copy_out(
    src: &Path,
    filename: &str,
    dest: &Path,
) -> Result<PathBuf, Sheet2DeckError> {
    let target = if dest.is_dir() {
        dest.join(filename)
    } else {
        dest.to_path_buf()
    };

    tokio::fs::copy(src, &target)
        .await
        .map_err(|source| Sheet2DeckError::Io {
            path: target.clone(),
            source,
        })?;
    Ok(target)
}

impl Drop for Artifact {
    fn drop(&mut self) {
        debug!("Releasing artifact '{}'", self.filename);
    }
}

/// Snapshot of an [`Artifact`] taken at success time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub filename: String,
    pub warnings: Vec<String>,
    pub size: u64,
    pub path: PathBuf,
}
