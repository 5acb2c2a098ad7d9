//! Error types shared across the rules crate.

/// Errors from rule loading, caching, and compilation.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Rule failed structural validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Shared cache store unreachable or failing.
    #[error("shared store error: {0}")]
    Shared(String),

    /// Shared cache store did not answer inside the read timeout.
    #[error("shared store timed out")]
    SharedTimeout,

    /// Compiled-set encode/decode failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// The persistent rule source failed.
    #[error("rule source error: {0}")]
    Source(String),

    /// Filesystem watcher error.
    #[error("watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;
