//! Polygon core model
//!
//! Types shared by every Polygon crate: the provisioning request for a node
//! cluster ([`ClusterSpec`]), the credentials it is provisioned with
//! ([`CredentialBundle`]), node identity keys ([`NodeKeys`]) and the renderer
//! that turns both into a `terraform.tfvars` file.
//!
//! Nothing in this crate touches the network or spawns processes; validation
//! errors surface here, before any external call is made.

pub mod error;
pub mod keys;
pub mod model;
pub mod tfvars;

// Re-exports
pub use error::{Result, ValidationError};
pub use keys::{NodeKeys, address_from_private_key};
pub use model::{
    AwsCredentials, ClusterSpec, CredentialBundle, DEFAULT_INSTANCE_COUNT, EthereumSettings,
    ProviderKind, SshKeys, SslFiles, validate_ipv4, validate_name,
};
pub use tfvars::{VARIABLES_FILE, render_variables};
