use thiserror::Error;

#[derive(Error, Debug)]
pub enum PushLensError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("API request failed with status {status} after {retries} retries")]
    ApiErrorAfterRetries { status: u16, retries: u32 },

    #[error("No decision task found for {branch}:{revision}")]
    DecisionTaskNotFound { branch: String, revision: String },

    #[error("Artifact '{name}' not found for revision {revision}")]
    ArtifactNotFound { name: String, revision: String },

    #[error("Malformed artifact '{name}': {reason}")]
    MalformedArtifact { name: String, reason: String },

    #[error("Ancestry of {revision} revisits {repeated}; parent walk cannot make progress")]
    AncestryCycle { revision: String, repeated: String },
}

pub type Result<T> = std::result::Result<T, PushLensError>;
