use crate::config::ConfigValidationError;
use crate::retrieve::RetrieveError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Era5DlError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ConfigValidation(#[from] ConfigValidationError),

    #[error("Invalid command line arguments: {details}")]
    CliArgumentValidation { details: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output directory creation failed at {path}: {reason}")]
    OutputDirectoryCreation { path: PathBuf, reason: String },

    #[error("Failed to load API credentials: {details}")]
    Credentials { details: String },

    #[error("Retrieval client error: {0}")]
    Retrieve(#[from] RetrieveError),

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] eyre::Report),
}
