use std::fmt;

use thiserror::Error;

/// Raised while building a client. The only error kind a caller ever sees.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("client secret is missing")]
    MissingCredential,

    #[error("client secret is malformed: {0}")]
    MalformedCredential(String),

    #[error("unknown region '{0}', expected one of: eu, us, global")]
    UnknownRegion(String),

    #[error("invalid setting {name}: {message}")]
    InvalidSetting { name: String, message: String },

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failure talking to the flag backend. Never leaves the crate through
/// the `resolve_*` functions, it is folded into the default value instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode backend payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("resolve timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Failure delivering tracked events. Logged by the publisher, never returned to callers of `track`.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("events endpoint answered {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    FlagNotFound,
    ParseError,
    TypeMismatch,
    TargetingKeyMissing,
    InvalidContext,
    General,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::FlagNotFound => "FLAG_NOT_FOUND",
            Self::ParseError => "PARSE_ERROR",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::TargetingKeyMissing => "TARGETING_KEY_MISSING",
            Self::InvalidContext => "INVALID_CONTEXT",
            Self::General => "GENERAL",
        };
        f.write_str(code)
    }
}

/// Why a flag evaluation fell back to the caller's default.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{code}: {message}")]
pub struct EvaluationError {
    pub code: ErrorCode,
    pub message: String,
}

impl EvaluationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn flag_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FlagNotFound, message)
    }

    pub fn type_mismatch(flag_key: &str) -> Self {
        Self::new(
            ErrorCode::TypeMismatch,
            format!("schema type is different for {}", flag_key),
        )
    }
}

impl From<ResolveError> for EvaluationError {
    fn from(error: ResolveError) -> Self {
        let code = match &error {
            ResolveError::Serialization(_) => ErrorCode::ParseError,
            ResolveError::Network(_) | ResolveError::Status { .. } | ResolveError::Timeout(_) => {
                ErrorCode::General
            }
        };
        Self::new(code, error.to_string())
    }
}
