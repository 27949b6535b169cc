//! Terraform variable file rendering
//!
//! Produces the `terraform.tfvars` consumed by the provider templates. The
//! line order is fixed so that the same request always renders the same
//! bytes.

use crate::model::{ClusterSpec, CredentialBundle, is_empty_value};
use serde_json::Value;

pub const VARIABLES_FILE: &str = "terraform.tfvars";

/// One `key = value` row
enum VarValue {
    /// JSON-encoded scalar or list
    Json(Value),
    /// Raw `<<EOF` block, emitted without string escaping
    Heredoc(String),
}

struct Row {
    key: &'static str,
    value: VarValue,
}

impl Row {
    fn json(key: &'static str, value: impl Into<Value>) -> Self {
        Self {
            key,
            value: VarValue::Json(value.into()),
        }
    }

    fn render(&self) -> String {
        let value = match &self.value {
            VarValue::Json(v) => v.to_string(),
            VarValue::Heredoc(body) => format!("<<EOF\n{}\nEOF", body),
        };
        format!("{} = {}\n", self.key, value)
    }
}

/// Render the variables file for a cluster.
pub fn render_variables(spec: &ClusterSpec, credentials: &CredentialBundle) -> String {
    let mut rows = vec![Row::json(
        "path_to_ssh_pubkey",
        credentials.ssh.path.to_string_lossy().into_owned(),
    )];

    if !credentials.ssh.cidr.is_empty() {
        rows.push(Row::json(
            "incoming_ssh_cidr_blocks",
            credentials.ssh.cidr.clone(),
        ));
    }

    rows.push(Row::json("name", spec.name.as_str()));
    rows.push(Row::json("aws_profile", credentials.aws.profile.as_str()));
    rows.push(Row::json("region", spec.region.as_str()));
    rows.push(Row::json("boyarUrl", spec.boyar_target_url.as_str()));
    rows.push(Row::json("instance_type", spec.instance_type.as_str()));
    rows.push(Row::json("instance_count", spec.instance_count()));
    rows.push(Row::json(
        "bootstrap_url",
        spec.bootstrap_url.clone().unwrap_or_default(),
    ));

    if !is_empty_value(&spec.management_config) {
        rows.push(Row {
            key: "boyar_management_config",
            value: VarValue::Heredoc(spec.management_config.to_string()),
        });
    }

    if let Some(endpoint) = non_empty(&credentials.ethereum.endpoint) {
        rows.push(Row::json("ethereum_endpoint", endpoint));
    }

    if let Some(address) = non_empty(&credentials.ethereum.topology_contract_address) {
        rows.push(Row::json("ethereum_topology_contract_address", address));
    }

    rows.iter().map(Row::render).collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
