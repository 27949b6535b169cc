//! Status reconciliation
//!
//! Read-only: refreshes Terraform state, checks the outputs a healthy
//! cluster must have, then follows the manager instance from the cloud API
//! to the node application's health endpoint.

use crate::error::{Result, TerraformError};
use crate::lifecycle::{
    MANAGER_DNS_OUTPUT, MANAGER_IP_OUTPUT, SHARED_STORAGE_OUTPUT, Terraform, VPC_OUTPUT,
};
use crate::outputs::OutputSet;
use crate::runner::Invocation;
use chrono::{DateTime, Utc};
use polygon_cloud::{HealthPayload, HealthProbe, InstanceInfo, InstanceQuery, find_by_public_dns};
use polygon_core::{ClusterSpec, CredentialBundle};
use serde::Deserialize;
use std::fmt;

/// Outputs that must be present and non-empty in a provisioned cluster
pub const REQUIRED_STATE_OUTPUTS: [&str; 4] = [
    VPC_OUTPUT,
    MANAGER_DNS_OUTPUT,
    MANAGER_IP_OUTPUT,
    SHARED_STORAGE_OUTPUT,
];

/// Oldest health report still considered current
pub const MAX_HEALTH_AGE_SECS: i64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    /// No variables file: `create` never ran for this name
    NeverProvisioned,
    Unhealthy(StatusFailure),
    Healthy {
        instance: InstanceInfo,
        health: HealthPayload,
    },
}

impl StatusReport {
    pub fn is_healthy(&self) -> bool {
        matches!(self, StatusReport::Healthy { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFailure {
    MissingStateKeys(Vec<String>),
    InstanceQueryFailed(String),
    InstanceNotFound { dns: String },
    /// The manager DNS resolves to an instance with another public IP
    InstanceIpMismatch {
        expected: String,
        actual: Option<String>,
    },
    NotRunning { state: String },
    HealthUnreachable(String),
    Stale { age_secs: i64 },
    Unhealthy { error: String },
}

impl fmt::Display for StatusFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFailure::MissingStateKeys(keys) => write!(
                f,
                "Terraform state is missing required output(s): {}",
                keys.join(", ")
            ),
            StatusFailure::InstanceQueryFailed(e) => write!(f, "Could not list instances: {}", e),
            StatusFailure::InstanceNotFound { dns } => {
                write!(f, "No instance found for manager {}", dns)
            }
            StatusFailure::InstanceIpMismatch { expected, actual } => write!(
                f,
                "Manager instance has public IP {}, expected {}",
                actual.as_deref().unwrap_or("<none>"),
                expected
            ),
            StatusFailure::NotRunning { state } => write!(
                f,
                "Manager is not in a running state (actual state: {})",
                state
            ),
            StatusFailure::HealthUnreachable(e) => write!(f, "Health endpoint unreachable: {}", e),
            StatusFailure::Stale { age_secs } => {
                write!(f, "Health report is stale ({}s old)", age_secs)
            }
            StatusFailure::Unhealthy { error } => write!(f, "Node reports an error: {}", error),
        }
    }
}

/// `terraform show -json`
#[derive(Debug, Deserialize)]
struct ShowState {
    #[serde(default)]
    values: Option<StateValues>,
}

#[derive(Debug, Deserialize)]
struct StateValues {
    #[serde(default)]
    outputs: serde_json::Map<String, serde_json::Value>,
}

/// Root module outputs of a `terraform show -json` document, as strings.
pub fn parse_state_outputs(json: &str) -> Result<OutputSet> {
    let state: ShowState = serde_json::from_str(json)
        .map_err(|e| TerraformError::InvalidState(format!("terraform show: {}", e)))?;

    let outputs = state
        .values
        .map(|v| v.outputs)
        .unwrap_or_default()
        .into_iter()
        .map(|(key, output)| {
            let value = match output.get("value") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            (key, value)
        })
        .collect();

    Ok(outputs)
}

/// Required outputs that are absent or empty
pub fn missing_state_keys(outputs: &OutputSet) -> Vec<String> {
    REQUIRED_STATE_OUTPUTS
        .iter()
        .filter(|key| outputs.get(key).is_none_or(str::is_empty))
        .map(|key| key.to_string())
        .collect()
}

/// Judge a health payload reported at `now`.
pub fn evaluate_health(payload: &HealthPayload, now: DateTime<Utc>) -> Option<StatusFailure> {
    let age = payload.age(now);
    if age > chrono::Duration::seconds(MAX_HEALTH_AGE_SECS) {
        return Some(StatusFailure::Stale {
            age_secs: age.num_seconds(),
        });
    }

    payload.error_message().map(|error| StatusFailure::Unhealthy {
        error: error.to_string(),
    })
}

impl Terraform {
    /// Reconcile the cluster's recorded state with the live instance and
    /// the node's own health report.
    ///
    /// Tool failures are errors; an unhealthy cluster is a normal
    /// [`StatusReport::Unhealthy`] result.
    pub async fn status(
        &self,
        spec: &ClusterSpec,
        credentials: &CredentialBundle,
        instances: &dyn InstanceQuery,
        health: &dyn HealthProbe,
    ) -> Result<StatusReport> {
        spec.validate()?;
        let ctx = self.context(&spec.name)?;

        if !ctx.is_provisioned().await {
            return Ok(StatusReport::NeverProvisioned);
        }

        let name = ctx.name();
        tracing::info!("Reconciling Terraform state for {}", name);
        self.runner.run(name, &Invocation::refresh(), ctx.dir()).await?;
        let shown = self.runner.run(name, &Invocation::show_json(), ctx.dir()).await?;
        let outputs = parse_state_outputs(&shown.stdout)?;

        let missing = missing_state_keys(&outputs);
        if !missing.is_empty() {
            return Ok(unhealthy(StatusFailure::MissingStateKeys(missing)));
        }
        let manager_dns = outputs.require(MANAGER_DNS_OUTPUT)?;
        let manager_ip = outputs.require(MANAGER_IP_OUTPUT)?;

        tracing::info!("Looking for the manager instance {}", manager_dns);
        let listed = match instances
            .describe_instances(&credentials.aws.profile, &spec.region)
            .await
        {
            Ok(listed) => listed,
            Err(e) => return Ok(unhealthy(StatusFailure::InstanceQueryFailed(e.to_string()))),
        };

        let Some(instance) = find_by_public_dns(&listed, manager_dns) else {
            return Ok(unhealthy(StatusFailure::InstanceNotFound {
                dns: manager_dns.to_string(),
            }));
        };

        if instance.public_ip_address.as_deref() != Some(manager_ip) {
            return Ok(unhealthy(StatusFailure::InstanceIpMismatch {
                expected: manager_ip.to_string(),
                actual: instance.public_ip_address.clone(),
            }));
        }

        if !instance.state.is_running() {
            return Ok(unhealthy(StatusFailure::NotRunning {
                state: instance.state.to_string(),
            }));
        }

        let payload = match health.fetch_status(manager_ip).await {
            Ok(payload) => payload,
            Err(e) => return Ok(unhealthy(StatusFailure::HealthUnreachable(e.to_string()))),
        };

        Ok(match evaluate_health(&payload, Utc::now()) {
            Some(failure) => unhealthy(failure),
            None => StatusReport::Healthy {
                instance: instance.clone(),
                health: payload,
            },
        })
    }
}

fn unhealthy(failure: StatusFailure) -> StatusReport {
    tracing::warn!("{}", failure);
    StatusReport::Unhealthy(failure)
}
