//! Error types for osn
//!
//! Configuration failures surface before any I/O. Per-item transfer failures
//! are folded into a [`crate::report::Report`] by the sync engine instead of
//! being returned.

use thiserror::Error;

/// Result type alias for osn operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for osn operations
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing credentials, settings, or option values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote object or bucket does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend rejected the credentials or the request signature
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Backend or transport rejected the request (throttling, 5xx, network)
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Local I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Operation was cancelled before it could start
    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether the backend, rather than the local side, produced this error
    ///
    /// Backend errors are reported per item as `client_error`, everything else
    /// as `error`.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Auth(_) | Error::Transfer(_)
        )
    }

    /// Detail text without the variant prefix, as recorded in reports
    pub fn detail(&self) -> String {
        match self {
            Error::Config(msg)
            | Error::NotFound(msg)
            | Error::Auth(msg)
            | Error::Transfer(msg)
            | Error::General(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Process exit code for this error
    ///
    /// 2 usage/config, 3 network, 4 auth, 5 not found, 130 interrupted,
    /// 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::TomlParse(_) | Error::TomlSerialize(_) => 2,
            Error::Transfer(_) => 3,
            Error::Auth(_) => 4,
            Error::NotFound(_) => 5,
            Error::Cancelled => 130,
            Error::Io(_) | Error::Json(_) | Error::General(_) => 1,
        }
    }
}
