use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to run child process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("sandbox setup failed: {0}")]
    Setup(String),
}

impl SandboxError {
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup(message.into())
    }
}
