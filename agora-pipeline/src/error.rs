use std::path::PathBuf;

use thiserror::Error;

pub type PipelineResult<T, E = PipelineError> = Result<T, E>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error while accessing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
