//! Crate-level error type.

use crate::config_compiler::CompileError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration compile failed: {0}")]
    Compile(#[from] CompileError),

    #[error("Invalid session configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Status endpoint returned {0}")]
    Status(reqwest::StatusCode),

    #[error("Session closed")]
    SessionClosed,

    #[error("Session inbox full")]
    InboxFull,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
