use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tool not found: {0}")]
    ToolMissing(String),

    #[error("{tool} exited with code {code:?}: {stderr}")]
    NonZeroExit {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} did not finish within {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },

    #[error("Argument not found: {0}")]
    ArgumentNotFound(String),

    #[error("Invalid symbol file: {0}")]
    InvalidSymbolFile(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
