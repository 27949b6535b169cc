//! AWS provider error types

use polygon_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("EC2 API error: {0}")]
    Sdk(String),
}

pub type Result<T> = std::result::Result<T, AwsError>;

impl From<AwsError> for CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::Sdk(message) => CloudError::ApiError(message),
        }
    }
}
