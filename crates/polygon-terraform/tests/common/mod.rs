//! A fake `terraform` executable and canned collaborators.
//!
//! The fake records each argv line to `argv.log`, prints `apply.out` on
//! `apply`, `show.json` on `show`, and fails any subcommand for which a
//! `fail-<subcommand>` file exists.

use async_trait::async_trait;
use chrono::Utc;
use polygon_cloud::{
    CloudError, HealthPayload, HealthProbe, InstanceInfo, InstanceQuery, InstanceState,
};
use polygon_core::{
    AwsCredentials, ClusterSpec, CredentialBundle, EthereumSettings, NodeKeys, ProviderKind,
    SshKeys, SslFiles,
};
use polygon_terraform::{Terraform, TerraformConfig};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const APPLY_OUTPUT: &str = "\
aws_vpc.main: Creating...
aws_vpc.main: Creation complete after 2s [id=vpc-1234]

Apply complete! Resources: 12 added, 0 changed, 0 destroyed.

Outputs:

block_storage = fs-0a1b2c3d
main_vpc_id = vpc-1234
manager_dns = ec2-10-0-0-1.ap-south-1.compute.amazonaws.com
manager_ip = 10.0.0.1
";

pub const MANAGER_DNS: &str = "ec2-52-66-33-249.ap-south-1.compute.amazonaws.com";
pub const MANAGER_IP: &str = "52.66.33.249";

pub struct FakeTerraform {
    pub root: TempDir,
}

#[allow(dead_code)]
impl FakeTerraform {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let fake = root.path().join("fake");
        fs::create_dir_all(&fake).unwrap();
        fs::write(fake.join("apply.out"), APPLY_OUTPUT).unwrap();
        fs::write(fake.join("show.json"), r#"{"format_version":"0.1"}"#).unwrap();

        let script = format!(
            r#"#!/bin/sh
FAKE="{fake}"
echo "$*" >> "$FAKE/argv.log"
if [ -f "$FAKE/fail-$1" ]; then
  echo "Error: $1 failed" >&2
  exit 1
fi
case "$1" in
  -version) echo "Terraform v0.12.29" ;;
  apply) cat "$FAKE/apply.out" ;;
  show) cat "$FAKE/show.json" ;;
  init) echo "Terraform has been successfully initialized!" ;;
esac
exit 0
"#,
            fake = fake.display()
        );
        let binary = fake.join("terraform");
        fs::write(&binary, script).unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();

        Self { root }
    }

    fn fake_dir(&self) -> PathBuf {
        self.root.path().join("fake")
    }

    pub fn binary(&self) -> PathBuf {
        self.fake_dir().join("terraform")
    }

    pub fn cache_root(&self) -> PathBuf {
        self.root.path().join("cache")
    }

    pub fn working_dir(&self, name: &str) -> PathBuf {
        self.cache_root().join(name)
    }

    pub fn terraform(&self) -> Terraform {
        Terraform::new(TerraformConfig::new(self.cache_root()).with_binary(self.binary()))
    }

    /// Recorded argv lines, oldest first
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.fake_dir().join("argv.log"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn clear_calls(&self) {
        let _ = fs::remove_file(self.fake_dir().join("argv.log"));
    }

    pub fn fail(&self, subcommand: &str) {
        fs::write(self.fake_dir().join(format!("fail-{}", subcommand)), "").unwrap();
    }

    pub fn set_show_json(&self, json: &str) {
        fs::write(self.fake_dir().join("show.json"), json).unwrap();
    }
}

#[allow(dead_code)]
pub fn full_state_json() -> String {
    serde_json::json!({
        "format_version": "0.1",
        "terraform_version": "0.12.29",
        "values": {
            "outputs": {
                "main_vpc_id": { "sensitive": false, "value": "vpc-1234" },
                "manager_dns": { "sensitive": false, "value": MANAGER_DNS },
                "manager_ip": { "sensitive": false, "value": MANAGER_IP },
                "block_storage": { "sensitive": false, "value": "fs-0a1b2c3d" }
            },
            "root_module": {}
        }
    })
    .to_string()
}

pub fn spec(name: &str) -> ClusterSpec {
    ClusterSpec {
        provider: ProviderKind::Aws,
        region: "ap-south-1".to_string(),
        instance_type: "m4.large".to_string(),
        node_count: Some(0),
        name: name.to_string(),
        ip: None,
        ephemeral_storage: false,
        efs_id: None,
        backend: false,
        boyar_target_url:
            "https://github.com/orbs-network/boyarin/releases/download/v1.10.0/boyar-v1.10.0.bin"
                .to_string(),
        boyar_auto_update: false,
        bootstrap_url: None,
        management_config: serde_json::Value::Null,
    }
}

pub fn credentials() -> CredentialBundle {
    CredentialBundle {
        aws: AwsCredentials::default(),
        ssh: SshKeys {
            path: PathBuf::from("/home/ubuntu/.ssh/id_rsa.pub"),
            cidr: Vec::new(),
        },
        node: Some(NodeKeys::new(
            "d72db29e8511d94b016df341b8ee4d3809cf09ee",
            "933e098e851949bc34425af87ddeaf4ba959b029709a581b95d13982578b75ac",
        )
        .unwrap()),
        ethereum: EthereumSettings::default(),
        ssl: SslFiles::default(),
    }
}

#[allow(dead_code)]
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Canned instance listing
#[allow(dead_code)]
pub struct StaticInstances(pub Result<Vec<InstanceInfo>, String>);

#[async_trait]
impl InstanceQuery for StaticInstances {
    async fn describe_instances(
        &self,
        _profile: &str,
        _region: &str,
    ) -> polygon_cloud::Result<Vec<InstanceInfo>> {
        self.0.clone().map_err(CloudError::ApiError)
    }
}

#[allow(dead_code)]
pub fn manager_instance(ip: &str, code: i64, state: &str) -> InstanceInfo {
    InstanceInfo {
        instance_id: "i-0manager".to_string(),
        public_dns_name: Some(MANAGER_DNS.to_string()),
        public_ip_address: Some(ip.to_string()),
        state: InstanceState {
            code,
            name: state.to_string(),
        },
    }
}

/// Canned health payload, reported `age_secs` ago
#[allow(dead_code)]
pub struct StaticHealth {
    pub age_secs: i64,
    pub error: String,
}

#[async_trait]
impl HealthProbe for StaticHealth {
    async fn fetch_status(&self, _host: &str) -> polygon_cloud::Result<HealthPayload> {
        Ok(HealthPayload {
            status: "OK".to_string(),
            timestamp: Utc::now() - chrono::Duration::seconds(self.age_secs),
            error: Some(self.error.clone()),
            extra: serde_json::Map::new(),
        })
    }
}
