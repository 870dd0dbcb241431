//! Error types for textablelib

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or rendering a table
#[derive(Error, Debug)]
pub enum TexTableError {
    /// A cell was requested for a column the row has no value for
    #[error("missing column '{column}': no record field and no column function")]
    MissingColumn { column: String },

    /// A record key collides with another field or a reserved name
    #[error("attribute '{key}' is defined twice")]
    DuplicateAttribute { key: String },

    /// A CSV record does not fit the header
    #[error("invalid record on line {line}: {message}")]
    InvalidRecord { line: u64, message: String },

    /// Merge lists refer back to a column that is already being resolved
    #[error("merge cycle detected at column '{column}'")]
    MergeCycle { column: String },

    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse a config file
    #[error("failed to parse config '{path}': {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Config parsed but failed validation
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The document compiler exited with a nonzero status
    #[error("failed to compile '{path}' (exit status {status}):\n{stderr}{stdout}")]
    CompileError {
        path: PathBuf,
        status: String,
        stdout: String,
        stderr: String,
    },

    /// CSV parse error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
