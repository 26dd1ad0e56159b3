//! Error types for obsweave

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// obsweave errors
///
/// A classifier that simply does not match returns `Ok(None)`; these
/// variants are reserved for genuine failures.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(e: std::fmt::Error) -> Self {
        Error::Render(e.to_string())
    }
}
