//! Gateway error types.

/// A specialized Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} failed: {message} (code {code}) {data}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
        data: String,
    },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("host not found: {0}")]
    HostNotFound(String),

    #[error("host {0} has no network interface to attach a check to")]
    NoInterface(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
