use crate::config::ConfigError;
use std::{fmt, sync::Arc};
use thiserror::Error as ThisError;

///
/// LoadError
///
/// Failure of a `DataSource` to produce its records.
/// Cloneable because a store caches the failure and replays it to every
/// caller of the same instance.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum LoadError {
    #[error("failed to read '{path}': {message}")]
    Io { path: Arc<str>, message: Arc<str> },

    #[error("malformed row in '{path}' at line {line}: {message}")]
    Parse {
        path: Arc<str>,
        line: usize,
        message: Arc<str>,
    },

    #[error("duplicate id {id} in '{path}'")]
    DuplicateId { path: &'static str, id: String },

    #[error("data source failed: {message}")]
    Source { message: Arc<str> },
}

impl LoadError {
    pub fn io(path: impl AsRef<str>, message: impl fmt::Display) -> Self {
        Self::Io {
            path: Arc::from(path.as_ref()),
            message: Arc::from(message.to_string()),
        }
    }

    pub fn parse(path: impl AsRef<str>, line: usize, message: impl fmt::Display) -> Self {
        Self::Parse {
            path: Arc::from(path.as_ref()),
            line,
            message: Arc::from(message.to_string()),
        }
    }

    pub fn source(message: impl fmt::Display) -> Self {
        Self::Source {
            message: Arc::from(message.to_string()),
        }
    }
}

///
/// InternalError
///
/// Structured boundary error with a stable classification.
/// Domain errors convert into it at the CLI and config boundaries.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a query-origin unsupported error (bad arguments at the surface).
    pub fn query_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Query, message)
    }

    /// Construct a stream-origin internal error.
    pub fn stream_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Stream, message)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<LoadError> for InternalError {
    fn from(err: LoadError) -> Self {
        let class = match &err {
            LoadError::Io { .. } => ErrorClass::NotFound,
            LoadError::Parse { .. } | LoadError::DuplicateId { .. } => ErrorClass::Corruption,
            LoadError::Source { .. } => ErrorClass::Internal,
        };

        Self {
            class,
            origin: ErrorOrigin::Source,
            message: err.to_string(),
            detail: Some(ErrorDetail::Load(err)),
        }
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        let class = match &err {
            ConfigError::Read { .. } => ErrorClass::NotFound,
            ConfigError::Parse(_) => ErrorClass::Corruption,
            ConfigError::Invalid { .. } => ErrorClass::Unsupported,
        };

        Self {
            class,
            origin: ErrorOrigin::Config,
            message: err.to_string(),
            detail: Some(ErrorDetail::Config(err)),
        }
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Load(LoadError),
    #[error("{0}")]
    Config(ConfigError),
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Source,
    Config,
    Query,
    Stream,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Source => "source",
            Self::Config => "config",
            Self::Query => "query",
            Self::Stream => "stream",
        };
        write!(f, "{label}")
    }
}
