//! Error types module
//!
//! All failures raised by the variant tree, contexts, lookups and providers are
//! unified under [`MediaTreeError`]. Structural configuration errors carry the
//! offending names so an operator can fix the declarative configuration.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like rejected content
    Debug,
    /// Warning level - for configuration mistakes and recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Self-description of an error, used when logging and when deciding on retries.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UNKNOWN_PARENT")
    fn error_code(&self) -> &'static str;

    /// Whether re-running the same operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaTreeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Duplicate variant name \"{name}\"")]
    DuplicateName { name: String },

    #[error("Variant \"{second}\" has no parent but \"{first}\" is already the root")]
    MultipleRoots { first: String, second: String },

    #[error("Variant \"{variant}\" declares unknown parent \"{parent}\"")]
    UnknownParent { variant: String, parent: String },

    #[error("Cyclic variant dependency: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Processing error: {message}")]
    Processing {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl MediaTreeError {
    /// Wrap a provider failure with a short description of the step that failed.
    pub fn processing(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        MediaTreeError::Processing {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Whether this error comes from validating the variant tree structure
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            MediaTreeError::DuplicateName { .. }
                | MediaTreeError::MultipleRoots { .. }
                | MediaTreeError::UnknownParent { .. }
                | MediaTreeError::CyclicDependency { .. }
        )
    }
}

impl From<serde_json::Error> for MediaTreeError {
    fn from(err: serde_json::Error) -> Self {
        MediaTreeError::InvalidConfiguration(format!("JSON parsing error: {}", err))
    }
}

impl From<envy::Error> for MediaTreeError {
    fn from(err: envy::Error) -> Self {
        MediaTreeError::InvalidConfiguration(format!("Environment error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn static_metadata(err: &MediaTreeError) -> (&'static str, bool, LogLevel) {
    match err {
        MediaTreeError::NotFound(_) => ("NOT_FOUND", false, LogLevel::Warn),
        MediaTreeError::InvalidConfiguration(_) => {
            ("INVALID_CONFIGURATION", false, LogLevel::Warn)
        }
        MediaTreeError::DuplicateName { .. } => ("DUPLICATE_NAME", false, LogLevel::Warn),
        MediaTreeError::MultipleRoots { .. } => ("MULTIPLE_ROOTS", false, LogLevel::Warn),
        MediaTreeError::UnknownParent { .. } => ("UNKNOWN_PARENT", false, LogLevel::Warn),
        MediaTreeError::CyclicDependency { .. } => ("CYCLIC_DEPENDENCY", false, LogLevel::Warn),
        MediaTreeError::InvalidContent(_) => ("INVALID_CONTENT", false, LogLevel::Debug),
        MediaTreeError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
        MediaTreeError::Io(_) => ("IO_ERROR", true, LogLevel::Error),
        MediaTreeError::Processing { .. } => ("PROCESSING_ERROR", true, LogLevel::Error),
    }
}

impl ErrorMetadata for MediaTreeError {
    fn error_code(&self) -> &'static str {
        static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).2
    }
}

pub type Result<T, E = MediaTreeError> = std::result::Result<T, E>;
