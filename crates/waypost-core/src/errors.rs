/// Errors surfaced by directory operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Directory unreachable: {0}")]
    Transport(String),

    #[error("Directory returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl RegistryError {
    /// True for failures talking to the directory, including error statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self, RegistryError::Transport(_) | RegistryError::Status { .. })
    }
}
