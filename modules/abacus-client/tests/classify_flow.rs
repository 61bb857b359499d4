//! End-to-end tests for the classification retry loop against a mock
//! Abacus API. Mocks with a call budget are mounted before the fallback
//! response so the server steps through the scripted sequence.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use abacus_client::{AbacusClient, AbacusError, RetryPolicy};

/// Shrunk delays so a full retry budget runs in milliseconds.
fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        backoff_base: Duration::from_millis(5),
        conflict_cooldown: Duration::from_millis(10),
        readiness_timeout: Duration::from_millis(50),
        settle_delay: Duration::from_millis(5),
        poll_interval: Duration::from_millis(10),
        poll_retry_delay: Duration::from_millis(10),
    }
}

fn client_for(server: &MockServer) -> AbacusClient {
    AbacusClient::new("tok-123", "dep-456", "key-789")
        .with_base_url(&server.uri())
        .with_retry_policy(fast_policy())
}

fn agent_response(segment: &str) -> serde_json::Value {
    json!({"result": {"segments": [{"segment": segment}]}})
}

#[tokio::test]
async fn returns_labels_in_response_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute_agent"))
        .and(query_param("deploymentToken", "tok-123"))
        .and(query_param("deploymentId", "dep-456"))
        .and(body_json(json!({
            "arguments": null,
            "keywordArguments": {"page_content": "Quarterly earnings beat expectations."},
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(agent_response(r#"{"taxonomy_labels": ["Business", "Finance"]}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let labels = client_for(&server)
        .classify_page_content("Quarterly earnings beat expectations.")
        .await
        .unwrap();

    assert_eq!(labels, vec!["Business", "Finance"]);
}

#[tokio::test]
async fn empty_label_list_is_ok_not_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute_agent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(agent_response(r#"{"taxonomy_labels": []}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let labels = client_for(&server)
        .classify_page_content("blank page")
        .await
        .unwrap();

    assert!(labels.is_empty());
}

#[tokio::test]
async fn malformed_segment_fails_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute_agent"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(agent_response("not valid json")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .classify_page_content("some text")
        .await
        .unwrap_err();

    assert!(matches!(err, AbacusError::Parse(_)));
}

#[tokio::test]
async fn recovers_after_service_unavailable() {
    let server = MockServer::start().await;

    // First call hits a cold deployment.
    Mock::given(method("POST"))
        .and(path("/execute_agent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("deployment not running"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/execute_agent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(agent_response(r#"{"taxonomy_labels": ["Travel"]}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/startDeployment"))
        .and(query_param("deploymentId", "dep-456"))
        .and(header("apiKey", "key-789"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/describeDeployment"))
        .and(header("apiKey", "key-789"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"deployment": {"status": "ACTIVE"}})),
        )
        .mount(&server)
        .await;

    let labels = client_for(&server)
        .classify_page_content("trip report")
        .await
        .unwrap();

    assert_eq!(labels, vec!["Travel"]);
}

#[tokio::test]
async fn conflict_cools_down_without_restart() {
    let server = MockServer::start().await;

    // 409 means a start is already in flight, so no start call may happen.
    Mock::given(method("POST"))
        .and(path("/execute_agent"))
        .respond_with(ResponseTemplate::new(409).set_body_string("deployment is starting"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/execute_agent"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(agent_response(r#"{"taxonomy_labels": ["Health"]}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/startDeployment"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let labels = client_for(&server)
        .classify_page_content("wellness article")
        .await
        .unwrap();

    assert_eq!(labels, vec!["Health"]);
}

#[tokio::test]
async fn exhausted_retries_with_cold_deployment_is_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute_agent"))
        .respond_with(ResponseTemplate::new(503).set_body_string("deployment not running"))
        .expect(4)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/startDeployment"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    // Never becomes active, so every warmup wait runs out its deadline.
    Mock::given(method("GET"))
        .and(path("/describeDeployment"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"deployment": {"status": "PENDING"}})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .classify_page_content("some text")
        .await
        .unwrap_err();

    assert!(matches!(err, AbacusError::DeploymentTimeout(_)));
}

#[tokio::test]
async fn client_error_fails_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/execute_agent"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/startDeployment"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .classify_page_content("some text")
        .await
        .unwrap_err();

    assert!(matches!(err, AbacusError::Api { status: 400, .. }));
}

#[tokio::test]
async fn transport_errors_exhaust_the_retry_budget() {
    // Nothing listens on the discard port, so every call is refused.
    let client = AbacusClient::new("tok-123", "dep-456", "key-789")
        .with_base_url("http://127.0.0.1:9")
        .with_retry_policy(fast_policy());

    let err = client.classify_page_content("some text").await.unwrap_err();

    assert!(matches!(err, AbacusError::Network(_)));
}

#[tokio::test]
async fn await_deployment_recovers_from_failed_polls() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/describeDeployment"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/describeDeployment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "active"})))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .await_deployment_active(Duration::from_millis(200))
        .await
        .unwrap();
}
