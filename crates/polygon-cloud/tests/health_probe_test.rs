use polygon_cloud::{CloudError, HealthProbe, HttpHealthProbe};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn probe_for(server: &MockServer) -> HttpHealthProbe {
    HttpHealthProbe::default().with_port(server.address().port())
}

#[tokio::test]
async fn test_fetch_status_parses_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/boyar/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Status": "OK",
            "Timestamp": "2026-03-01T12:00:00Z",
            "Error": "",
            "Payload": { "Uptime": 3600 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let probe = probe_for(&server);
    let payload = probe.fetch_status("127.0.0.1").await.unwrap();

    assert!(payload.is_ok());
    assert_eq!(payload.error_message(), None);
    assert_eq!(payload.extra["Payload"]["Uptime"], 3600);
}

#[tokio::test]
async fn test_fetch_status_non_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/boyar/status"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let probe = probe_for(&server);
    let err = probe.fetch_status("127.0.0.1").await.unwrap_err();

    assert!(matches!(err, CloudError::ApiError(ref msg) if msg.contains("503")));
}

#[tokio::test]
async fn test_fetch_status_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/boyar/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let probe = probe_for(&server);
    let err = probe.fetch_status("127.0.0.1").await.unwrap_err();

    assert!(matches!(err, CloudError::Http(_)));
}
