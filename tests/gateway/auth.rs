use crate::receiver_harness::ReceiverTestServer;
use private_receiver::replay::now_ms;
use private_receiver::security::compute_signature;
use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;

const BODY: &str = r#"{"ticket":7,"log":"closed"}"#;

async fn post(
    server: &ReceiverTestServer,
    headers: &[(&str, String)],
    body: &str,
) -> (StatusCode, Value) {
    let mut request = reqwest::Client::new()
        .post(server.url("/hooks/tickets"))
        .header("content-type", "application/json")
        .body(body.to_string());
    for (name, value) in headers {
        request = request.header(*name, value);
    }
    let response = request.send().await.expect("delivery request should complete");
    let status = response.status();
    let json = response
        .json::<Value>()
        .await
        .expect("receiver should answer with JSON");
    (status, json)
}

#[tokio::test]
async fn token_gate_rejects_missing_and_wrong_bearer() {
    let tmp = TempDir::new().unwrap();
    let server = ReceiverTestServer::start(tmp.path(), |config| {
        config.token = Some("tok".into());
    })
    .await;

    let (status, body) = post(&server, &[], BODY).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized (token)");

    let (status, _) = post(&server, &[("authorization", "Bearer bad".into())], BODY).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post(&server, &[("authorization", "Bearer tok".into())], BODY).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn token_and_signature_are_both_required_when_configured() {
    let tmp = TempDir::new().unwrap();
    let server = ReceiverTestServer::start(tmp.path(), |config| {
        config.token = Some("tok".into());
        config.hmac_secret = Some("s3cret".into());
    })
    .await;

    let (status, body) = post(&server, &[("authorization", "Bearer tok".into())], BODY).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing signature header");

    let ts = now_ms().to_string();
    let signature = compute_signature("s3cret", Some(&ts), BODY.as_bytes());
    let (status, _) = post(
        &server,
        &[
            ("authorization", "Bearer tok".into()),
            ("x-signature-256", format!("sha256={signature}")),
            ("x-timestamp", ts),
        ],
        BODY,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signed_delivery_is_accepted_once() {
    let tmp = TempDir::new().unwrap();
    let server = ReceiverTestServer::start(tmp.path(), |config| {
        config.hmac_secret = Some("s3cret".into());
    })
    .await;

    let ts = now_ms().to_string();
    let headers = [
        (
            "x-signature",
            compute_signature("s3cret", Some(&ts), BODY.as_bytes()),
        ),
        ("x-timestamp", ts),
    ];

    let (status, first) = post(&server, &headers, BODY).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["ok"], true);

    let (status, second) = post(&server, &headers, BODY).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(second["message"], "Replay detected");
}

#[tokio::test]
async fn signature_for_a_different_timestamp_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let server = ReceiverTestServer::start(tmp.path(), |config| {
        config.hmac_secret = Some("s3cret".into());
    })
    .await;

    let now = now_ms();
    let signature = compute_signature("s3cret", Some(&now.to_string()), BODY.as_bytes());
    let (status, body) = post(
        &server,
        &[
            ("x-signature", signature),
            ("x-timestamp", (now + 1).to_string()),
        ],
        BODY,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid signature");
}
