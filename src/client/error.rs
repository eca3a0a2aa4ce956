use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the coordinator, or the connection dropped.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("client session is closed")]
    Closed,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
