use thiserror::Error;

pub type AudienceResult<T> = Result<T, AudienceError>;

#[derive(Error, Debug)]
pub enum AudienceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request validation error: {0}")]
    Validation(String),

    #[error("Client population error: {0}")]
    Population(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AudienceError {
    /// Whether the error was caused by the caller's input rather than by
    /// the engine or one of its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AudienceError::Validation(_) | AudienceError::ToolNotFound(_)
        )
    }
}
