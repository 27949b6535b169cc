//! Node requests
//!
//! A request arrives either as a camelCase JSON document (`polygon create -f
//! node.json`) or as command-line flags; both land in [`NodeRequest`].

use crate::boyar::boyar_target_url;
use crate::error::{ConfigError, Result};
use crate::{default_cache_root, resolve_path};
use polygon_core::{
    AwsCredentials, ClusterSpec, CredentialBundle, EthereumSettings, NodeKeys, ProviderKind,
    SshKeys, SslFiles,
};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// A node request before path resolution and validation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeRequest {
    pub name: String,
    pub aws_profile: String,
    /// `false` in a file means no static IP
    #[serde(deserialize_with = "string_or_false")]
    pub public_ip: Option<String>,
    pub orbs_address: String,
    pub orbs_private_key: String,
    /// Anything but a non-negative integer falls back to the default count
    pub node_count: serde_json::Value,
    pub node_size: String,
    pub region: String,
    pub ssh_public_key: String,
    pub incoming_ssh_cidr_blocks: Vec<String>,
    pub bootstrap_url: Option<String>,
    pub ssl_certificate_path: Option<String>,
    pub ssl_private_key_path: Option<String>,
    pub cache_path: Option<String>,
    pub backend: bool,
    pub ephemeral_storage: bool,
    pub efs_id: Option<String>,
    pub ethereum_endpoint: Option<String>,
    pub ethereum_topology_contract_address: Option<String>,
    pub management_config: serde_json::Value,
    pub boyar_version: Option<String>,
    pub boyar_url: Option<String>,
    pub boyar_commit: Option<String>,
    pub boyar_auto_update: bool,
}

impl Default for NodeRequest {
    fn default() -> Self {
        Self {
            name: String::new(),
            aws_profile: AwsCredentials::default().profile,
            public_ip: None,
            orbs_address: String::new(),
            orbs_private_key: String::new(),
            node_count: serde_json::Value::from(polygon_core::DEFAULT_INSTANCE_COUNT),
            node_size: "t2.medium".to_string(),
            region: "us-east-1".to_string(),
            ssh_public_key: "~/.ssh/id_rsa.pub".to_string(),
            incoming_ssh_cidr_blocks: Vec::new(),
            bootstrap_url: None,
            ssl_certificate_path: None,
            ssl_private_key_path: None,
            cache_path: None,
            backend: false,
            ephemeral_storage: false,
            efs_id: None,
            ethereum_endpoint: None,
            ethereum_topology_contract_address: None,
            management_config: serde_json::Value::Null,
            boyar_version: None,
            boyar_url: None,
            boyar_commit: None,
            boyar_auto_update: false,
        }
    }
}

fn string_or_false<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}

/// Validated inputs for one lifecycle operation
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub spec: ClusterSpec,
    pub credentials: CredentialBundle,
    pub cache_root: PathBuf,
}

/// Read a JSON document
pub fn load_json_file<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    if !path.exists() {
        return Err(ConfigError::RequestFileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ConfigError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

impl NodeRequest {
    /// Load a request file; relative paths in it resolve against its directory.
    pub fn from_file(path: &Path) -> Result<(Self, PathBuf)> {
        let request = load_json_file(path)?;
        let base = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        let base = resolve_path(&base.to_string_lossy(), &std::env::current_dir()?)?;
        tracing::debug!("Loaded request {} (base {})", path.display(), base.display());
        Ok((request, base))
    }

    pub fn node_count(&self) -> Option<u32> {
        self.node_count.as_u64().and_then(|n| u32::try_from(n).ok())
    }

    /// Without an explicit name, the cluster is named after the node address
    /// and region so reruns land in the same working directory.
    pub fn cluster_name(&self) -> String {
        let name = self.name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
        let prefix: String = self.orbs_address.chars().take(8).collect();
        format!("{}-{}", prefix.to_lowercase(), self.region)
    }

    /// Resolve paths against `base` and validate into lifecycle inputs.
    ///
    /// Node keys are optional here: `destroy` and `status` work from the name
    /// alone, and `create` rejects a request without them.
    pub fn prepare(&self, base: &Path) -> Result<PreparedRequest> {
        let node = match (self.orbs_address.trim(), self.orbs_private_key.trim()) {
            ("", "") => None,
            (address, private_key) => Some(NodeKeys::new(address, private_key)?),
        };

        let resolve_opt = |p: &Option<String>| -> Result<Option<PathBuf>> {
            match p.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                Some(p) => Ok(Some(resolve_path(p, base)?)),
                None => Ok(None),
            }
        };

        let cache_root = match resolve_opt(&self.cache_path)? {
            Some(path) => path,
            None => default_cache_root()?,
        };

        let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.trim().is_empty());

        let spec = ClusterSpec {
            provider: ProviderKind::Aws,
            region: self.region.clone(),
            instance_type: self.node_size.clone(),
            node_count: self.node_count(),
            name: self.cluster_name(),
            ip: non_empty(&self.public_ip),
            ephemeral_storage: self.ephemeral_storage,
            efs_id: non_empty(&self.efs_id),
            backend: self.backend,
            boyar_target_url: boyar_target_url(
                self.boyar_url.as_deref(),
                self.boyar_commit.as_deref(),
                self.boyar_version.as_deref(),
            ),
            boyar_auto_update: self.boyar_auto_update,
            bootstrap_url: non_empty(&self.bootstrap_url),
            management_config: self.management_config.clone(),
        };
        spec.validate()?;

        let credentials = CredentialBundle {
            aws: AwsCredentials {
                profile: self.aws_profile.clone(),
            },
            ssh: SshKeys {
                path: resolve_path(&self.ssh_public_key, base)?,
                cidr: self.incoming_ssh_cidr_blocks.clone(),
            },
            node,
            ethereum: EthereumSettings {
                endpoint: non_empty(&self.ethereum_endpoint),
                topology_contract_address: non_empty(&self.ethereum_topology_contract_address),
            },
            ssl: SslFiles {
                certificate_path: resolve_opt(&self.ssl_certificate_path)?,
                private_key_path: resolve_opt(&self.ssl_private_key_path)?,
            },
        };

        Ok(PreparedRequest {
            spec,
            credentials,
            cache_root,
        })
    }
}
