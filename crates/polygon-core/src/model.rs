//! Cluster provisioning model
//!
//! A node cluster is a single manager instance plus `node_count` workers,
//! optionally bound to a pre-allocated static IP and to a shared storage
//! volume that outlives the cluster.

use crate::error::{Result, ValidationError};
use crate::keys::NodeKeys;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Worker count used when the request does not carry a usable integer
pub const DEFAULT_INSTANCE_COUNT: u32 = 2;

/// Cloud provider hosting the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Aws,
}

impl ProviderKind {
    /// Directory name of the provider's template tree
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Aws => "aws",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provisioning request for one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(rename = "type", default)]
    pub provider: ProviderKind,

    pub region: String,

    /// Instance size class (e.g. "m4.large")
    pub instance_type: String,

    /// Worker count; `None` falls back to [`DEFAULT_INSTANCE_COUNT`]
    #[serde(default)]
    pub node_count: Option<u32>,

    /// Working-directory key and remote-state name component
    pub name: String,

    /// Pre-allocated static public IP to bind the manager to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Skip persistent shared storage entirely
    #[serde(default)]
    pub ephemeral_storage: bool,

    /// Pre-existing shared storage volume to reuse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efs_id: Option<String>,

    /// Keep Terraform state in the remote backend
    #[serde(default)]
    pub backend: bool,

    /// Download URL of the node application binary
    pub boyar_target_url: String,

    #[serde(default)]
    pub boyar_auto_update: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_url: Option<String>,

    /// Opaque management configuration handed to the node application
    #[serde(default)]
    pub management_config: serde_json::Value,
}

impl ClusterSpec {
    /// Check the invariants the orchestration engine relies on.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if let Some(ip) = &self.ip {
            validate_ipv4(ip)?;
        }
        Ok(())
    }

    pub fn instance_count(&self) -> u32 {
        self.node_count.unwrap_or(DEFAULT_INSTANCE_COUNT)
    }

    /// Name substituted into the remote-state backend descriptor
    pub fn backend_state_name(&self) -> String {
        format!("orbs-{}-{}", self.region, self.name)
    }

    pub fn has_management_config(&self) -> bool {
        !is_empty_value(&self.management_config)
    }
}

/// Credentials and secrets used to provision a cluster
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialBundle {
    pub aws: AwsCredentials,
    pub ssh: SshKeys,
    /// Node identity; only `create` needs it
    pub node: Option<NodeKeys>,
    pub ethereum: EthereumSettings,
    pub ssl: SslFiles,
}

impl CredentialBundle {
    pub fn node_keys(&self) -> Result<&NodeKeys> {
        self.node
            .as_ref()
            .ok_or(ValidationError::MissingField("orbsAddress"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    /// Named profile from the shared AWS credentials file
    pub profile: String,
}

impl Default for AwsCredentials {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshKeys {
    /// Public key installed on every instance
    pub path: PathBuf,

    /// CIDR blocks allowed to reach port 22; empty means the template default
    pub cidr: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EthereumSettings {
    pub endpoint: Option<String>,
    pub topology_contract_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SslFiles {
    pub certificate_path: Option<PathBuf>,
    pub private_key_path: Option<PathBuf>,
}

/// A cluster name is used verbatim as a directory name.
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(&['/', '\\', '\0'][..]);

    if invalid {
        return Err(ValidationError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub fn validate_ipv4(ip: &str) -> Result<()> {
    ip.parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidIp(ip.to_string()))
}

pub(crate) fn is_empty_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> ClusterSpec {
        ClusterSpec {
            provider: ProviderKind::Aws,
            region: "us-east-1".to_string(),
            instance_type: "t2.medium".to_string(),
            node_count: None,
            name: name.to_string(),
            ip: None,
            ephemeral_storage: false,
            efs_id: None,
            backend: false,
            boyar_target_url: String::new(),
            boyar_auto_update: false,
            bootstrap_url: None,
            management_config: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_name_validation() {
        assert!(validate_name("mumbai-node4").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
    }

    #[test]
    fn test_ip_validation() {
        assert!(validate_ipv4("52.66.33.249").is_ok());
        assert_eq!(
            validate_ipv4("52.66.33"),
            Err(ValidationError::InvalidIp("52.66.33".to_string()))
        );
        assert!(validate_ipv4("256.1.1.1").is_err());
    }

    #[test]
    fn test_spec_validate_checks_ip() {
        let mut s = spec("node1");
        assert!(s.validate().is_ok());

        s.ip = Some("not-an-ip".to_string());
        assert!(matches!(s.validate(), Err(ValidationError::InvalidIp(_))));
    }

    #[test]
    fn test_instance_count_default() {
        let mut s = spec("node1");
        assert_eq!(s.instance_count(), DEFAULT_INSTANCE_COUNT);

        s.node_count = Some(0);
        assert_eq!(s.instance_count(), 0);
    }

    #[test]
    fn test_backend_state_name() {
        let s = spec("node1");
        assert_eq!(s.backend_state_name(), "orbs-us-east-1-node1");
    }

    #[test]
    fn test_management_config_emptiness() {
        let mut s = spec("node1");
        assert!(!s.has_management_config());

        s.management_config = serde_json::json!({});
        assert!(!s.has_management_config());

        s.management_config = serde_json::json!({"services": {}});
        assert!(s.has_management_config());
    }

    #[test]
    fn test_provider_serde() {
        let json = serde_json::to_string(&ProviderKind::Aws).unwrap();
        assert_eq!(json, "\"aws\"");
        assert_eq!(ProviderKind::Aws.to_string(), "aws");
    }
}
