//! Error taxonomy for the engine
//!
//! Each concern gets its own enum so callers can tell a retryable diagnostic
//! from a fatal backend failure without string matching:
//!
//! | Error             | Retried | Effect on a session                    |
//! |-------------------|---------|----------------------------------------|
//! | `IndexError`      | no      | fails before the loop starts           |
//! | `ParseFailure`    | no      | file skipped, build continues          |
//! | `BackendError`    | no      | session aborted, raw error surfaced    |
//! | `DiagnosticError` | yes     | enhance + regenerate until exhausted   |
//! | `ConfigError`     | no      | rejected before the session starts     |

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fix_loop::state::IllegalTransition;

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors raised by the structural indexer and its cache.
#[derive(Error, Debug)]
pub enum IndexError {
    /// No type with this name in the current snapshot
    #[error("Type not found in index: {name}")]
    NotFound { name: String },

    /// The type exists but declares no method with this name
    #[error("Method '{method}' not found on {type_name}")]
    MethodNotFound { type_name: String, method: String },

    /// Project root does not exist or is not a directory
    #[error("Project root not found: {path}")]
    RootNotFound { path: PathBuf },

    /// No index has been initialized on the handle yet
    #[error("Index not initialized; call init() first")]
    NotInitialized,

    /// Index cache could not be read or written
    #[error("Index cache error at {path}: {message}")]
    Cache { path: PathBuf, message: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn method_not_found(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            type_name: type_name.into(),
            method: method.into(),
        }
    }

    pub fn cache(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Cache {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A single source file that could not be indexed.
///
/// Never aborts a build: collected into the build report and logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("Failed to parse {file}: {reason}")]
pub struct ParseFailure {
    /// Path relative to the project root
    pub file: PathBuf,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

/// Failures of the generation or build/execution backend.
///
/// These are infrastructure failures, never diagnostics: a session that hits
/// one stops immediately and hands the error back unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend could not be reached or the tool could not be started
    #[error("{backend} backend unavailable: {message}")]
    Unavailable { backend: String, message: String },

    /// Backend did not answer within its deadline
    #[error("{backend} backend timed out after {}s", .after.as_secs())]
    Timeout { backend: String, after: Duration },

    /// Backend answered with something that is not a usable response
    #[error("{backend} backend protocol error: {message}")]
    Protocol { backend: String, message: String },
}

impl BackendError {
    pub fn unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn timeout(backend: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            backend: backend.into(),
            after,
        }
    }

    pub fn protocol(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

/// Verification failures that survived every repair attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticError {
    #[error("Generated test still fails to compile after {attempts} attempt(s): {message}")]
    CompileFailure { attempts: u32, message: String },

    #[error("Generated test still fails at runtime after {attempts} attempt(s): {message}")]
    RuntimeFailure { attempts: u32, message: String },
}

/// Invalid session or loader configuration. Raised before any work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid repair strategy '{value}' (expected compile-only, runtime-only or both)")]
    InvalidStrategy { value: String },

    #[error("Invalid attempt limit {value}: must be between 1 and {max}")]
    InvalidAttemptLimit { value: u32, max: u32 },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Everything that can end a repair session with an `Err`.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Controller bug: the state machine rejected an edge
    #[error(transparent)]
    Transition(#[from] IllegalTransition),

    /// Caller-imposed wall-clock limit elapsed; in-memory state discarded
    #[error("Session aborted after exceeding its {}s wall-clock limit", .limit.as_secs())]
    WallClockExceeded { limit: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::timeout("ollama", Duration::from_secs(90));
        assert_eq!(err.to_string(), "ollama backend timed out after 90s");

        let err = BackendError::unavailable("build", "mvn: not found");
        assert!(err.to_string().contains("mvn: not found"));
    }

    #[test]
    fn test_parse_failure_display() {
        let failure = ParseFailure::new("src/main/java/Broken.java", "syntax error at line 3");
        assert_eq!(
            failure.to_string(),
            "Failed to parse src/main/java/Broken.java: syntax error at line 3"
        );
    }

    #[test]
    fn test_session_error_is_transparent() {
        let err: SessionError = IndexError::not_found("com.example.Missing").into();
        assert_eq!(err.to_string(), "Type not found in index: com.example.Missing");
    }
}
