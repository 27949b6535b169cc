#![cfg(unix)]

mod common;

use common::{
    FakeTerraform, MANAGER_DNS, MANAGER_IP, StaticHealth, StaticInstances, credentials,
    full_state_json, manager_instance, spec,
};
use polygon_terraform::{StatusFailure, StatusReport, TerraformError};

fn healthy() -> StaticHealth {
    StaticHealth {
        age_secs: 10,
        error: String::new(),
    }
}

async fn provisioned() -> FakeTerraform {
    let fake = FakeTerraform::new();
    fake.terraform()
        .create(&spec("node1"), &credentials())
        .await
        .unwrap();
    fake.clear_calls();
    fake
}

#[tokio::test]
async fn test_never_provisioned() {
    let fake = FakeTerraform::new();
    let instances = StaticInstances(Ok(vec![]));

    let report = fake
        .terraform()
        .status(&spec("node1"), &credentials(), &instances, &healthy())
        .await
        .unwrap();

    assert_eq!(report, StatusReport::NeverProvisioned);
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_missing_state_keys() {
    let fake = provisioned().await;
    let instances = StaticInstances(Ok(vec![]));

    let report = fake
        .terraform()
        .status(&spec("node1"), &credentials(), &instances, &healthy())
        .await
        .unwrap();

    match report {
        StatusReport::Unhealthy(StatusFailure::MissingStateKeys(keys)) => assert_eq!(keys.len(), 4),
        other => panic!("unexpected report: {other:?}"),
    }
    assert_eq!(
        fake.calls(),
        vec!["refresh -var-file=terraform.tfvars", "show -json"]
    );
}

#[tokio::test]
async fn test_healthy() {
    let fake = provisioned().await;
    fake.set_show_json(&full_state_json());
    let instances = StaticInstances(Ok(vec![manager_instance(MANAGER_IP, 16, "running")]));

    let report = fake
        .terraform()
        .status(&spec("node1"), &credentials(), &instances, &healthy())
        .await
        .unwrap();

    match report {
        StatusReport::Healthy { instance, health } => {
            assert_eq!(instance.public_dns_name.as_deref(), Some(MANAGER_DNS));
            assert!(health.is_ok());
        }
        other => panic!("unexpected report: {other:?}"),
    }
}

#[tokio::test]
async fn test_instance_not_found() {
    let fake = provisioned().await;
    fake.set_show_json(&full_state_json());
    let instances = StaticInstances(Ok(vec![]));

    let report = fake
        .terraform()
        .status(&spec("node1"), &credentials(), &instances, &healthy())
        .await
        .unwrap();

    assert_eq!(
        report,
        StatusReport::Unhealthy(StatusFailure::InstanceNotFound {
            dns: MANAGER_DNS.to_string()
        })
    );
}

#[tokio::test]
async fn test_instance_ip_mismatch() {
    let fake = provisioned().await;
    fake.set_show_json(&full_state_json());
    let instances = StaticInstances(Ok(vec![manager_instance("3.3.3.3", 16, "running")]));

    let report = fake
        .terraform()
        .status(&spec("node1"), &credentials(), &instances, &healthy())
        .await
        .unwrap();

    assert_eq!(
        report,
        StatusReport::Unhealthy(StatusFailure::InstanceIpMismatch {
            expected: MANAGER_IP.to_string(),
            actual: Some("3.3.3.3".to_string()),
        })
    );
}

#[tokio::test]
async fn test_instance_not_running() {
    let fake = provisioned().await;
    fake.set_show_json(&full_state_json());
    let instances = StaticInstances(Ok(vec![manager_instance(MANAGER_IP, 80, "stopped")]));

    let report = fake
        .terraform()
        .status(&spec("node1"), &credentials(), &instances, &healthy())
        .await
        .unwrap();

    assert_eq!(
        report,
        StatusReport::Unhealthy(StatusFailure::NotRunning {
            state: "stopped - 80".to_string()
        })
    );
}

#[tokio::test]
async fn test_stale_and_unhealthy_reports() {
    let fake = provisioned().await;
    fake.set_show_json(&full_state_json());
    let instances = StaticInstances(Ok(vec![manager_instance(MANAGER_IP, 16, "running")]));
    let terraform = fake.terraform();

    let stale = StaticHealth {
        age_secs: 300,
        error: String::new(),
    };
    let report = terraform
        .status(&spec("node1"), &credentials(), &instances, &stale)
        .await
        .unwrap();
    assert!(matches!(
        report,
        StatusReport::Unhealthy(StatusFailure::Stale { .. })
    ));

    let failing = StaticHealth {
        age_secs: 5,
        error: "management service down".to_string(),
    };
    let report = terraform
        .status(&spec("node1"), &credentials(), &instances, &failing)
        .await
        .unwrap();
    assert_eq!(
        report,
        StatusReport::Unhealthy(StatusFailure::Unhealthy {
            error: "management service down".to_string()
        })
    );
}

#[tokio::test]
async fn test_instance_query_failure_is_a_status() {
    let fake = provisioned().await;
    fake.set_show_json(&full_state_json());
    let instances = StaticInstances(Err("expired token".to_string()));

    let report = fake
        .terraform()
        .status(&spec("node1"), &credentials(), &instances, &healthy())
        .await
        .unwrap();

    assert!(matches!(
        report,
        StatusReport::Unhealthy(StatusFailure::InstanceQueryFailed(ref e)) if e.contains("expired token")
    ));
}

#[tokio::test]
async fn test_refresh_failure_is_an_error() {
    let fake = provisioned().await;
    fake.fail("refresh");
    let instances = StaticInstances(Ok(vec![]));

    let err = fake
        .terraform()
        .status(&spec("node1"), &credentials(), &instances, &healthy())
        .await
        .unwrap_err();

    assert!(matches!(err, TerraformError::Process { .. }));
}
