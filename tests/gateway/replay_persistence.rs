use crate::receiver_harness::ReceiverTestServer;
use private_receiver::ReplayBackend;
use private_receiver::replay::now_ms;
use private_receiver::security::compute_signature;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use tempfile::TempDir;

const BODY: &str = r#"{"ticket":99}"#;

fn signed_request(server: &ReceiverTestServer, ts: &str) -> reqwest::RequestBuilder {
    reqwest::Client::new()
        .post(server.url("/hooks/tickets"))
        .header("x-signature", compute_signature("s3cret", Some(ts), BODY.as_bytes()))
        .header("x-timestamp", ts)
        .body(BODY)
}

async fn deliver_then_restart(backend: ReplayBackend) {
    let tmp = TempDir::new().unwrap();
    let configure = |config: &mut private_receiver::ReceiverConfig| {
        config.hmac_secret = Some("s3cret".into());
        config.replay_backend = backend;
        // Only the shutdown flush may persist within the test.
        config.flush_debounce_ms = 600_000;
    };
    let ts = now_ms().to_string();

    let mut first = ReceiverTestServer::start(tmp.path(), configure).await;
    let response = signed_request(&first, &ts).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    first.stop().await;

    let mut second = ReceiverTestServer::start(tmp.path(), configure).await;
    let response = signed_request(&second, &ts).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    second.stop().await;
}

#[tokio::test]
async fn json_backend_survives_restart() {
    deliver_then_restart(ReplayBackend::Json).await;
}

#[tokio::test]
async fn sqlite_backend_survives_restart() {
    deliver_then_restart(ReplayBackend::Sqlite).await;
}

#[tokio::test]
async fn shutdown_flush_writes_snapshot() {
    let tmp = TempDir::new().unwrap();
    let mut server = ReceiverTestServer::start(tmp.path(), |config| {
        config.hmac_secret = Some("s3cret".into());
        config.flush_debounce_ms = 600_000;
    })
    .await;

    let ts = now_ms().to_string();
    let signature = compute_signature("s3cret", Some(&ts), BODY.as_bytes());
    let response = signed_request(&server, &ts).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let snapshot_path = tmp.path().join("replay-cache.json");
    assert!(!snapshot_path.exists());

    server.stop().await;

    let snapshot: BTreeMap<String, i64> =
        serde_json::from_slice(&std::fs::read(&snapshot_path).unwrap()).unwrap();
    let expiry = snapshot[&signature];
    assert!(expiry > now_ms());
}
