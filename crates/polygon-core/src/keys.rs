//! Orbs node identity keys
//!
//! A node is identified by a 20-byte address derived from its secp256k1
//! public key (Keccak-256 of the uncompressed point, last 20 bytes), written
//! as 40 hex characters. The private key is 32 bytes, 64 hex characters.

use crate::error::{Result, ValidationError};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

pub const ADDRESS_HEX_LEN: usize = 40;
pub const PRIVATE_KEY_HEX_LEN: usize = 64;

/// Validated node address and private key
#[derive(Clone, PartialEq, Eq)]
pub struct NodeKeys {
    address: String,
    private_key: String,
}

impl NodeKeys {
    /// Validate lengths and hex encoding of both halves.
    pub fn new(address: impl Into<String>, private_key: impl Into<String>) -> Result<Self> {
        let address = address.into();
        let private_key = private_key.into();

        if address.len() != ADDRESS_HEX_LEN {
            return Err(ValidationError::InvalidAddressLength {
                len: address.len(),
                got: address,
            });
        }

        if private_key.len() != PRIVATE_KEY_HEX_LEN {
            return Err(ValidationError::InvalidPrivateKeyLength {
                len: private_key.len(),
            });
        }

        hex::decode(&address).map_err(|e| ValidationError::InvalidHex {
            field: "node address",
            message: e.to_string(),
        })?;
        hex::decode(&private_key).map_err(|e| ValidationError::InvalidHex {
            field: "node private key",
            message: e.to_string(),
        })?;

        Ok(Self {
            address,
            private_key,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    /// Check that the address was derived from the private key.
    pub fn verify(&self) -> Result<bool> {
        let derived = address_from_private_key(&self.private_key)?;
        Ok(derived.eq_ignore_ascii_case(&self.address))
    }

    /// Like [`verify`](Self::verify), but a mismatch is an error.
    pub fn ensure_matching(&self) -> Result<()> {
        if self.verify()? {
            Ok(())
        } else {
            Err(ValidationError::KeyMismatch {
                address: self.address.clone(),
            })
        }
    }

    /// Key pair document handed to the node as the `node_key_pair` variable
    pub fn key_pair_json(&self) -> serde_json::Value {
        serde_json::json!({
            "node-address": self.address,
            "node-private-key": self.private_key,
        })
    }
}

impl std::fmt::Debug for NodeKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKeys")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Derive the lowercase hex node address for a hex private key.
pub fn address_from_private_key(private_key: &str) -> Result<String> {
    let bytes = hex::decode(private_key).map_err(|e| ValidationError::InvalidHex {
        field: "node private key",
        message: e.to_string(),
    })?;

    let secret = k256::SecretKey::from_slice(&bytes)
        .map_err(|e| ValidationError::InvalidPrivateKey(e.to_string()))?;
    let point = secret.public_key().to_encoded_point(false);

    // Skip the 0x04 uncompressed-point tag
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    Ok(hex::encode(&digest[12..]))
}
