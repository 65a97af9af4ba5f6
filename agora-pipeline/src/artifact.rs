//! Persisted generated artifacts.
//!
//! An artifact is immutable once written; a regenerated piece of code is a
//! new artifact with a later timestamp, and "current" always means the most
//! recently created one of a kind. The store is namespaced per run id so
//! concurrent runs never collide.

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::error::PipelineError;
use crate::error::PipelineResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Source,
    Test,
}

impl ArtifactKind {
    /// Filename prefix, matching the `code_*/test_*` scheme of the store.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Source => "code",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub text: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

/// Directory-backed artifact storage for a single workflow run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `<base>/<run_id>`. The directory is created lazily on
    /// first write.
    pub fn new(base: impl Into<PathBuf>, run_id: impl AsRef<str>) -> Self {
        let root = base.into().join(run_id.as_ref());
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a new artifact. Filenames embed a millisecond timestamp so that
    /// lexical order equals creation order within the run.
    pub fn persist(&self, kind: ArtifactKind, text: &str) -> PipelineResult<Artifact> {
        let created_at = Utc::now();
        let filename = format!(
            "{}_{}.py",
            kind.prefix(),
            created_at.format("%Y%m%d_%H%M%S_%3f")
        );

        fs::create_dir_all(&self.root).map_err(|e| PipelineError::io(&self.root, e))?;
        let path = self.root.join(&filename);
        fs::write(&path, text).map_err(|e| PipelineError::io(&path, e))?;
        debug!(path = %path.display(), "persisted artifact");

        Ok(Artifact {
            kind,
            text: text.to_string(),
            filename,
            created_at,
        })
    }

    /// Most recently created artifact of `kind`, if any. Creation order is
    /// recovered from the timestamped filename rather than filesystem mtime.
    pub fn latest(&self, kind: ArtifactKind) -> PipelineResult<Option<Artifact>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(PipelineError::io(&self.root, err)),
        };

        let prefix = format!("{}_", kind.prefix());
        let mut newest: Option<String> = None;
        for entry in entries {
            let entry = entry.map_err(|e| PipelineError::io(&self.root, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) || !name.ends_with(".py") {
                continue;
            }
            if newest.as_deref().is_none_or(|current| name.as_str() > current) {
                newest = Some(name);
            }
        }

        let Some(filename) = newest else {
            return Ok(None);
        };
        let path = self.root.join(&filename);
        let text = fs::read_to_string(&path).map_err(|e| PipelineError::io(&path, e))?;
        let created_at = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(Artifact {
            kind,
            text,
            filename,
            created_at,
        }))
    }
}
