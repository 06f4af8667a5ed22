//! The remote retrieval operation the downloader depends on.
//!
//! A [`Retriever`] turns one [`RetrievalRequest`] into one file at the given
//! destination. Returning `Ok` means the file was written; the downloader does
//! not inspect anything else about the remote side.

mod cds;
mod credentials;
mod request;

pub use cds::CdsClient;
pub use credentials::{Credentials, DEFAULT_API_URL, RcFile, read_rc_file, resolve_credentials};
pub use request::RetrievalRequest;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrieveError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Job {job_id} ended with status {status}: {message}")]
    JobFailed {
        job_id: String,
        status: String,
        message: String,
    },

    #[error("Unexpected API response: {0}")]
    Protocol(String),

    #[error("Transferred {actual} bytes but the archive advertised {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Retrieval failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieves `request` from `dataset` and writes the result to `destination`.
    async fn retrieve(
        &self,
        dataset: &str,
        request: &RetrievalRequest,
        destination: &Path,
    ) -> Result<(), RetrieveError>;
}
