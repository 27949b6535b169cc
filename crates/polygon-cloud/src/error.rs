//! Cloud collaborator error types

use thiserror::Error;

/// Errors raised by instance queries and health probes
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
