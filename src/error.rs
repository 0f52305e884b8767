//! Error handling for the parkgate agent

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Camera device could not be acquired (missing source, probe failure).
    /// Fatal to capture; the operator must re-activate manually.
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// A frame was requested without an active camera session
    #[error("No active camera session")]
    NoActiveSession,

    /// Operator identity missing; the request was never sent
    #[error("Missing operator identity")]
    Unauthenticated,

    /// Recognition backend returned a non-success response
    #[error("API error: {0}")]
    Api(String),

    /// Frame capture failed (ffmpeg / snapshot fetch)
    #[error("Capture error: {0}")]
    Capture(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
