use std::io;

/// Errors that abort an interop invocation.
///
/// Per-run failures never show up here; they are recorded as `fail` runs in
/// the ledger instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("Invalid draft version: {0:?}")]
    VersionError(String),

    #[error("Ledger write failed for {path}: {source}")]
    LedgerError {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::ConfigError(message.into())
    }

    /// Whether this error was raised before any run could execute.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::ConfigError(_) | Error::RegistryError(_) | Error::VersionError(_)
        )
    }
}

/// Result type alias for interop-runner operations
pub type Result<T> = std::result::Result<T, Error>;
