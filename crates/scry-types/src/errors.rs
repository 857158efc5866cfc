use thiserror::Error;

pub type Result<T, E = ScryError> = std::result::Result<T, E>;

/// Classified failure from the remote analysis backend.
///
/// Expected HTTP error statuses (4xx/5xx) arrive as `Status` values
/// distinguishable by code; failures below the HTTP layer (connect errors,
/// timeouts, undecodable bodies) are `Transport` and carry no status code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

impl FetchError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        FetchError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        FetchError::Transport(message.into())
    }

    /// Definitive negative: the resource does not exist right now.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }

    /// Failures expected to heal on their own: network trouble, upstream
    /// 5xx, or rate limiting.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum ScryError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
