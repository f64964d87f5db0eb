use thiserror::Error;

/// Errors surfaced by the MyMentor API client.
///
/// `SessionExpired`, `Connectivity` and `RequestSetup` are only constructed
/// after the session has been torn down, so a caller receiving one of them
/// can assume local credentials are already gone.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Login rejected: {0}")]
    Auth(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Connection failed: {0}")]
    Connectivity(String),

    #[error("Malformed request: {0}")]
    RequestSetup(String),

    #[error("API error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Unexpected response shape: {0}")]
    InvalidResponse(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Credential storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ApiError {
    /// True when the error forced a session teardown before propagating.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            ApiError::SessionExpired | ApiError::Connectivity(_) | ApiError::RequestSetup(_)
        )
    }
}
