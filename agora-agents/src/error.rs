use thiserror::Error;

/// Failure while asking the generation backend for text.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Transport(String),

    #[error("generation response was malformed: {0}")]
    Malformed(String),
}

/// Failure inside an agent's handler. These never cross the bus boundary
/// as panics; the agent converts them into error messages.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("missing metadata key `{key}` on incoming message")]
    MissingMetadata { key: String },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Pipeline(#[from] agora_pipeline::PipelineError),
}

impl AgentError {
    pub fn missing_metadata(key: impl Into<String>) -> Self {
        Self::MissingMetadata { key: key.into() }
    }
}
