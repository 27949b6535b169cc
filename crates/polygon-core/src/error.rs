//! Validation error types

use thiserror::Error;

/// Errors raised while validating a provisioning request.
///
/// All of these are detected synchronously, before Terraform or any cloud API
/// is invoked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid Orbs node address, required hex of 40 characters\nGot: {got} (Length: {len})")]
    InvalidAddressLength { got: String, len: usize },

    #[error("Invalid Orbs private key, required hex of 64 characters (Length: {len})")]
    InvalidPrivateKeyLength { len: usize },

    #[error("Invalid hex in {field}: {message}")]
    InvalidHex {
        field: &'static str,
        message: String,
    },

    #[error("Invalid secp256k1 private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Orbs node address {address} does not match the supplied private key")]
    KeyMismatch { address: String },

    #[error("The supplied IP address {0} is not a valid IPv4 address!")]
    InvalidIp(String),

    #[error("Invalid node name {0:?}: must be a single non-empty path segment")]
    InvalidName(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

pub type Result<T> = std::result::Result<T, ValidationError>;
