use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Unavailable,
    Aborted,
    Internal,
}

impl ErrorCode {
    /// Whether a fresh attempt can reasonably succeed without any input changing.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorCode::Unavailable | ErrorCode::Aborted)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::Aborted => "ABORTED",
            ErrorCode::Internal => "INTERNAL",
        };
        write!(f, "{}", s)
    }
}

pub trait Classify: std::error::Error {
    fn error_code(&self) -> ErrorCode;

    fn is_retryable(&self) -> bool {
        self.error_code().is_transient()
    }
}
