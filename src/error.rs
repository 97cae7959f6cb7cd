use crate::lifecycle::RequestState;

/// Stable tag carried by every [`RequestError`], independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    MalformedIdentifier,
    NotFound,
    Forbidden,
    InvalidTransition,
    Conflict,
    StoreUnavailable,
}

#[derive(thiserror::Error, Debug)]
pub enum RequestError {
    #[error("invalid `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("`{0}` is not a well-formed request identifier")]
    MalformedIdentifier(String),
    #[error("no request matches {0}")]
    NotFound(String),
    #[error("operation `{0}` is not permitted for this caller")]
    Forbidden(&'static str),
    #[error("cannot move a request from {from} to {to}")]
    InvalidTransition {
        from: RequestState,
        to: RequestState,
    },
    #[error("request `{0}` changed state while it was being updated")]
    Conflict(String),
    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),
}

impl RequestError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::MalformedIdentifier(_) => ErrorKind::MalformedIdentifier,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// HTTP status class a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::ValidationError
            | ErrorKind::MalformedIdentifier
            | ErrorKind::InvalidTransition => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::StoreUnavailable => 503,
        }
    }

    /// Only collaborator failures are worth retrying; the core itself never retries.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StoreUnavailable
    }
}
