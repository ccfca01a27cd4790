//! Transport envelope against a fake GraphQL endpoint.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use serde_json::json;

use common::{closed_port_url, FakeGraphql, Reply};
use helio_client::operations::{RemoteOperation, QUERY_POLL_GCODE, QUERY_USER_QUOTA};
use helio_client::{HelioClient, HelioError, Transport};
use helio_core::config::ClientConfig;

fn client(url: &str) -> HelioClient {
    HelioClient::new(ClientConfig::new("test-token", url)).unwrap()
}

fn poll_gcode() -> RemoteOperation {
    RemoteOperation::new("GcodeV2", QUERY_POLL_GCODE, json!({ "id": "g-1" }))
}

// ---------------------------------------------------------------------------
// Test: request shape and identity headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sends_query_variables_and_identity_headers() {
    let fake = FakeGraphql::new([Reply::json(json!({ "data": { "gcodeV2": { "id": "g-1" } } }))]);
    let url = fake.start().await;

    let outcome = client(&url).execute(&poll_gcode()).await;
    assert!(outcome.is_success());
    assert_eq!(outcome.data, Some(json!({ "gcodeV2": { "id": "g-1" } })));

    let seen = fake.seen();
    assert_eq!(seen.len(), 1);
    let request = &seen[0];
    assert_eq!(request.headers["authorization"], "Bearer test-token");
    assert_eq!(request.headers["helioadditive-client-name"], "HelioRust");
    assert_eq!(request.headers["helioadditive-client-version"], "1.0.0");
    assert_eq!(request.headers["content-type"], "application/json");
    assert_eq!(request.body["variables"], json!({ "id": "g-1" }));
    assert!(request.body["query"].as_str().unwrap().contains("gcodeV2"));
}

#[tokio::test]
async fn bare_operation_omits_variables() {
    let fake = FakeGraphql::new([Reply::json(json!({ "data": { "user": {} } }))]);
    let url = fake.start().await;

    client(&url)
        .execute(&RemoteOperation::bare("GetUserRemainingOpts", QUERY_USER_QUOTA))
        .await;

    assert!(fake.seen()[0].body.get("variables").is_none());
}

#[tokio::test]
async fn shared_http_client_carries_the_configured_identity() {
    let fake = FakeGraphql::new([Reply::json(json!({ "data": { "gcodeV2": { "id": "g-1" } } }))]);
    let url = fake.start().await;

    let mut config = ClientConfig::new("shared-token", url.clone());
    config.client_name = "PrintFarm".into();
    let client = HelioClient::with_client(reqwest::Client::new(), config);
    assert_eq!(client.api_url(), url);
    assert_eq!(client.config().token, "shared-token");

    let outcome = client.execute(&poll_gcode()).await;
    assert!(outcome.is_success());
    let seen = fake.seen();
    assert_eq!(seen[0].headers["authorization"], "Bearer shared-token");
    assert_eq!(seen[0].headers["helioadditive-client-name"], "PrintFarm");
}

// ---------------------------------------------------------------------------
// Test: HTTP-layer classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_maps_to_credential_hint() {
    let fake =
        FakeGraphql::new([Reply::status(StatusCode::UNAUTHORIZED, "nope").with_trace("t-401")]);
    let url = fake.start().await;

    let outcome = client(&url).execute(&poll_gcode()).await;
    assert_eq!(
        outcome.errors,
        Some(vec!["HTTP 401 Unauthorized - check your access credential.".to_string()])
    );
    assert!(outcome.data.is_none());
    assert_eq!(outcome.correlation_id, "t-401");
}

#[tokio::test]
async fn rate_limit_maps_to_quota_message() {
    let fake = FakeGraphql::new([Reply::status(StatusCode::TOO_MANY_REQUESTS, "")]);
    let url = fake.start().await;

    let outcome = client(&url).execute(&poll_gcode()).await;
    assert_eq!(
        outcome.errors,
        Some(vec!["HTTP 429 - quota exceeded or rate limited.".to_string()])
    );
}

#[tokio::test]
async fn other_status_embeds_truncated_body() {
    let fake = FakeGraphql::new([Reply::status(StatusCode::BAD_GATEWAY, "x".repeat(2_000))]);
    let url = fake.start().await;

    let outcome = client(&url).execute(&poll_gcode()).await;
    let errors = outcome.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("HTTP 502: "));
    assert_eq!(errors[0].len(), "HTTP 502: ".len() + 500);
}

#[tokio::test]
async fn unparseable_body_is_reported() {
    let fake = FakeGraphql::new([Reply::status(StatusCode::OK, "<html>oops</html>")]);
    let url = fake.start().await;

    let outcome = client(&url).execute(&poll_gcode()).await;
    assert_eq!(outcome.errors, Some(vec!["Failed to parse JSON response.".to_string()]));
    assert!(outcome.transport_failure);
}

#[tokio::test]
async fn network_failure_has_no_payload() {
    let url = closed_port_url().await;

    let outcome = client(&url).execute(&poll_gcode()).await;
    let errors = outcome.errors.clone().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Network error: "));
    assert!(outcome.data.is_none());
    assert_eq!(outcome.correlation_id, "");
    assert_matches!(outcome.into_data("GcodeV2"), Err(HelioError::Transport { .. }));
}

// ---------------------------------------------------------------------------
// Test: GraphQL errors and correlation id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn service_errors_keep_count_and_trace_id() {
    let body = json!({
        "data": null,
        "errors": [
            { "message": "Simulation not found" },
            { "message": "Access denied", "path": ["simulation"] },
            { "message": "Try again" }
        ]
    });
    let fake = FakeGraphql::new([Reply::json(body).with_trace("abc-123")]);
    let url = fake.start().await;

    let outcome = client(&url).execute(&poll_gcode()).await;
    assert_eq!(outcome.errors.as_ref().map(Vec::len), Some(3));
    assert_eq!(outcome.correlation_id, "abc-123");

    let err = outcome.into_data("GcodeV2").unwrap_err();
    assert_eq!(err.correlation_id(), Some("abc-123"));
    assert!(err.to_string().contains("abc-123"));
    assert!(err.to_string().contains("Access denied"));
}
