use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to read token storage {path}: {source}")]
    TokenStorage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed token storage {path}: {reason}")]
    MalformedTokens { path: String, reason: String },
}
