//! Terraform orchestration error types

use crate::oplog::Phase;
use polygon_cloud::CloudError;
use polygon_core::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerraformError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to prepare working directory ({step}): {source}")]
    Materialization {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not perform Terraform operation {phase} (exit code {code})")]
    Process {
        phase: Phase,
        code: i32,
        stderr: String,
    },

    #[error(
        "Terraform {found} is not supported (requires {required}). \
         Try: tfenv install {suggested} && tfenv use {suggested}"
    )]
    VersionMismatch {
        found: semver::Version,
        required: semver::VersionReq,
        suggested: String,
    },

    #[error("Could not determine Terraform version: {0}")]
    VersionUnavailable(String),

    #[error("terraform binary not found. Please install: https://www.terraform.io/downloads")]
    BinaryNotFound,

    #[error("Terraform output missing: {0}")]
    MissingOutput(String),

    #[error("Invalid Terraform state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error(transparent)]
    Lifecycle(Box<LifecycleError>),
}

impl TerraformError {
    pub(crate) fn materialization(step: impl Into<String>, source: std::io::Error) -> Self {
        TerraformError::Materialization {
            step: step.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TerraformError>;

impl From<LifecycleError> for TerraformError {
    fn from(err: LifecycleError) -> Self {
        TerraformError::Lifecycle(Box::new(err))
    }
}

/// A failed create/destroy, tagged with the working directory so the
/// operator can inspect Terraform's own state there.
#[derive(Error, Debug)]
#[error("Terraform operation failed, working directory: {}", tf_path.display())]
pub struct LifecycleError {
    pub tf_path: PathBuf,
    #[source]
    pub cause: TerraformError,
}

impl LifecycleError {
    pub fn new(tf_path: impl Into<PathBuf>, cause: TerraformError) -> Self {
        Self {
            tf_path: tf_path.into(),
            cause,
        }
    }

    /// Stderr captured from the failed phase, if a subprocess failed
    pub fn stderr(&self) -> Option<&str> {
        match &self.cause {
            TerraformError::Process { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
