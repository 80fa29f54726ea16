use std::fmt;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, RodinError>;

/// Represents the possible errors that can occur while generating a model.
#[derive(Debug, thiserror::Error)]
pub enum RodinError {
    /// The request was rejected locally or by the API as malformed.
    #[error("invalid request: {0}")]
    Validation(String),
    /// The API key is missing or was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The API does not know the task.
    #[error("task not found: {0}")]
    NotFound(String),
    /// An operation was invoked in the wrong task lifecycle state.
    #[error("invalid task state: {0}")]
    State(String),
    /// Network request failed.
    #[error("network request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The retry budget ran out before the task reached a terminal state.
    #[error("task did not finish after {attempts} status checks{}", last_error_suffix(.last_error))]
    Timeout {
        attempts: u32,
        last_error: Option<String>,
    },
    /// The download link's validity window has elapsed.
    #[error("download link expired: {0}")]
    ExpiredLink(String),
    /// The remote service reported that generation failed.
    #[error("generation failed: {reason}")]
    GenerationFailed { reason: String },
    /// File I/O error.
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The API answered with a status or body we do not handle.
    #[error("API request failed ({status}): {message}")]
    Api { status: u16, message: String },
    /// The response body could not be decoded.
    #[error("failed to parse API response: {0}")]
    Decode(#[from] serde_json::Error),
    /// URL parsing failed.
    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),
    /// A download completed without writing any bytes.
    #[error("downloaded artifact is empty: {0}")]
    EmptyArtifact(String),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {e})"),
        None => String::new(),
    }
}

/// The broad category of a [`RodinError`], used for reporting and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    State,
    Transport,
    Timeout,
    ExpiredLink,
    GenerationFailed,
    Io,
    Api,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Auth => "AuthError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::State => "StateError",
            ErrorKind::Transport => "TransportError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::ExpiredLink => "ExpiredLinkError",
            ErrorKind::GenerationFailed => "GenerationFailedError",
            ErrorKind::Io => "IOError",
            ErrorKind::Api => "ApiError",
        };
        f.write_str(name)
    }
}

impl ErrorKind {
    /// Process exit code reported by the CLI for this kind of failure.
    ///
    /// Codes start at 3: 1 is a generic failure and 2 is a usage error.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Api => 3,
            ErrorKind::Validation => 4,
            ErrorKind::Auth => 5,
            ErrorKind::NotFound => 6,
            ErrorKind::State => 7,
            ErrorKind::Transport => 8,
            ErrorKind::Timeout => 9,
            ErrorKind::ExpiredLink => 10,
            ErrorKind::GenerationFailed => 11,
            ErrorKind::Io => 12,
        }
    }
}

impl RodinError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RodinError::Validation(_) => ErrorKind::Validation,
            RodinError::Auth(_) => ErrorKind::Auth,
            RodinError::NotFound(_) => ErrorKind::NotFound,
            RodinError::State(_) => ErrorKind::State,
            RodinError::Transport(_) => ErrorKind::Transport,
            RodinError::Timeout { .. } => ErrorKind::Timeout,
            RodinError::ExpiredLink(_) => ErrorKind::ExpiredLink,
            RodinError::GenerationFailed { .. } => ErrorKind::GenerationFailed,
            RodinError::Io(_) | RodinError::EmptyArtifact(_) => ErrorKind::Io,
            RodinError::Api { .. } | RodinError::Decode(_) | RodinError::Url(_) => ErrorKind::Api,
        }
    }

    /// Whether a status check that failed with this error may be attempted again.
    ///
    /// Network faults, rate limiting and server-side errors are transient. Anything
    /// that points at the request or the credentials is not.
    pub fn is_transient(&self) -> bool {
        match self {
            RodinError::Transport(_) => true,
            RodinError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
