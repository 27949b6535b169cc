//! EC2 instance listing

use crate::error::{AwsError, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::Instance;
use polygon_cloud::{InstanceInfo, InstanceQuery, InstanceState};

/// `DescribeInstances` scoped by profile and region
#[derive(Debug, Clone, Default)]
pub struct Ec2Instances;

impl Ec2Instances {
    pub fn new() -> Self {
        Self
    }

    async fn client(profile: &str, region: &str) -> Client {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Client::new(&config)
    }

    /// Every instance in every reservation, across all result pages
    pub async fn list(&self, profile: &str, region: &str) -> Result<Vec<InstanceInfo>> {
        tracing::debug!("DescribeInstances (profile {}, region {})", profile, region);
        let client = Self::client(profile, region).await;

        let mut pages = client.describe_instances().into_paginator().send();
        let mut instances = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| AwsError::Sdk(DisplayErrorContext(&e).to_string()))?;
            instances.extend(
                page.reservations()
                    .iter()
                    .flat_map(|r| r.instances())
                    .map(instance_info),
            );
        }

        tracing::debug!("{} instances in {}", instances.len(), region);
        Ok(instances)
    }
}

#[async_trait]
impl InstanceQuery for Ec2Instances {
    async fn describe_instances(
        &self,
        profile: &str,
        region: &str,
    ) -> polygon_cloud::Result<Vec<InstanceInfo>> {
        Ok(self.list(profile, region).await?)
    }
}

/// Terminated instances report an empty DNS name; that maps to `None`.
pub fn instance_info(instance: &Instance) -> InstanceInfo {
    let non_empty = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_string);

    let state = instance.state();
    InstanceInfo {
        instance_id: instance.instance_id().unwrap_or_default().to_string(),
        public_dns_name: non_empty(instance.public_dns_name()),
        public_ip_address: non_empty(instance.public_ip_address()),
        state: InstanceState {
            code: state.and_then(|s| s.code()).map(i64::from).unwrap_or_default(),
            name: state
                .and_then(|s| s.name())
                .map(|n| n.as_str().to_string())
                .unwrap_or_default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::types::{InstanceState as Ec2State, InstanceStateName};
    use polygon_cloud::find_by_public_dns;

    fn instance(id: &str, dns: &str, ip: Option<&str>, state: InstanceStateName, code: i32) -> Instance {
        Instance::builder()
            .instance_id(id)
            .public_dns_name(dns)
            .set_public_ip_address(ip.map(str::to_string))
            .state(Ec2State::builder().code(code).name(state).build())
            .build()
    }

    #[test]
    fn test_running_instance() {
        let info = instance_info(&instance(
            "i-manager",
            "ec2-52-66-33-249.compute.amazonaws.com",
            Some("52.66.33.249"),
            InstanceStateName::Running,
            16,
        ));

        assert_eq!(info.instance_id, "i-manager");
        assert_eq!(info.public_ip_address.as_deref(), Some("52.66.33.249"));
        assert!(info.state.is_running());
        assert_eq!(info.state.to_string(), "running - 16");
    }

    #[test]
    fn test_terminated_instance_without_address() {
        let info = instance_info(&instance("i-gone", "", None, InstanceStateName::Terminated, 48));

        assert_eq!(info.public_dns_name, None);
        assert_eq!(info.public_ip_address, None);
        assert!(!info.state.is_running());
    }

    #[test]
    fn test_missing_state() {
        let info = instance_info(&Instance::builder().instance_id("i-pending").build());
        assert_eq!(info.state.code, 0);
        assert!(!info.state.is_running());
    }

    #[test]
    fn test_lookup_by_dns_after_conversion() {
        let instances: Vec<InstanceInfo> = [
            instance("i-worker", "ec2-3-3-3-3.compute.amazonaws.com", Some("3.3.3.3"), InstanceStateName::Running, 16),
            instance("i-manager", "ec2-52-66-33-249.compute.amazonaws.com", Some("52.66.33.249"), InstanceStateName::Running, 16),
        ]
        .iter()
        .map(instance_info)
        .collect();

        let found = find_by_public_dns(&instances, "ec2-52-66-33-249.compute.amazonaws.com").unwrap();
        assert_eq!(found.instance_id, "i-manager");
    }
}
