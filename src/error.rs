//! Error types for fovea operations.
//!
//! Only the shells around the engine (config loading, state files, selector
//! parsing) can fail. Engine operations on a document never return errors;
//! their outcomes are counted in a [`Report`](crate::Report).

use thiserror::Error;

/// Errors that can occur while configuring or persisting the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;
