//! Cloud instance lookup

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// EC2 state code for a running instance
pub const RUNNING_STATE_CODE: i64 = 16;

/// Live view of one compute instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceInfo {
    pub instance_id: String,

    #[serde(default)]
    pub public_dns_name: Option<String>,

    #[serde(default)]
    pub public_ip_address: Option<String>,

    pub state: InstanceState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceState {
    pub code: i64,
    pub name: String,
}

impl InstanceState {
    /// The high byte of the code is reserved for internal use; only the low
    /// byte carries the state.
    pub fn is_running(&self) -> bool {
        self.code & 0xff == RUNNING_STATE_CODE
    }
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.name, self.code)
    }
}

/// Instance listing scoped by credentials profile and region
#[async_trait]
pub trait InstanceQuery: Send + Sync {
    async fn describe_instances(&self, profile: &str, region: &str) -> Result<Vec<InstanceInfo>>;
}

/// Find the instance whose public DNS name equals `dns`.
pub fn find_by_public_dns<'a>(instances: &'a [InstanceInfo], dns: &str) -> Option<&'a InstanceInfo> {
    instances
        .iter()
        .find(|i| i.public_dns_name.as_deref() == Some(dns))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(dns: &str, code: i64) -> InstanceInfo {
        InstanceInfo {
            instance_id: format!("i-{}", code),
            public_dns_name: Some(dns.to_string()),
            public_ip_address: Some("1.2.3.4".to_string()),
            state: InstanceState {
                code,
                name: "running".to_string(),
            },
        }
    }

    #[test]
    fn test_running_state_masks_high_byte() {
        assert!(instance("a", 16).state.is_running());
        assert!(instance("a", 0x0110).state.is_running());
        assert!(!instance("a", 80).state.is_running());
    }

    #[test]
    fn test_find_by_public_dns() {
        let instances = vec![
            instance("ec2-1.compute.amazonaws.com", 16),
            instance("ec2-2.compute.amazonaws.com", 80),
        ];

        let found = find_by_public_dns(&instances, "ec2-2.compute.amazonaws.com").unwrap();
        assert_eq!(found.state.code, 80);
        assert!(find_by_public_dns(&instances, "missing").is_none());
    }

    #[test]
    fn test_deserialize_ec2_shape() {
        let json = r#"{
            "InstanceId": "i-0abc",
            "PublicDnsName": "ec2-52-66-33-249.ap-south-1.compute.amazonaws.com",
            "PublicIpAddress": "52.66.33.249",
            "State": { "Code": 16, "Name": "running" },
            "InstanceType": "m4.large"
        }"#;

        let info: InstanceInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.instance_id, "i-0abc");
        assert_eq!(info.public_ip_address.as_deref(), Some("52.66.33.249"));
        assert!(info.state.is_running());
        assert_eq!(info.state.to_string(), "running - 16");
    }
}
