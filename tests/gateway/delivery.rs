use crate::receiver_harness::ReceiverTestServer;
use reqwest::StatusCode;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;

#[tokio::test]
async fn root_reports_liveness() {
    let tmp = TempDir::new().unwrap();
    let server = ReceiverTestServer::start(tmp.path(), |_| {}).await;

    let response = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "Private receiver running");
}

#[tokio::test]
async fn unknown_routes_and_methods_are_404_json() {
    let tmp = TempDir::new().unwrap();
    let server = ReceiverTestServer::start(tmp.path(), |_| {}).await;
    let client = reqwest::Client::new();

    let cases = [
        client.get(server.url("/hooks/tickets")),
        client.post(server.url("/")),
        client.get(server.url("/nope")),
        client.put(server.url("/hooks/tickets")),
    ];
    for request in cases {
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, serde_json::json!({"ok": false, "message": "Not found"}));
    }
}

#[tokio::test]
async fn accepted_delivery_is_archived_under_received() {
    let tmp = TempDir::new().unwrap();
    let server = ReceiverTestServer::start(tmp.path(), |_| {}).await;

    let response = reqwest::Client::new()
        .post(server.url("/hooks/tickets"))
        .header("content-type", "application/json")
        .header("x-delivery", "abc")
        .body(r#"{"ticket":1,"messages":["hi"]}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["ok"], true);

    let path = PathBuf::from(ack["path"].as_str().unwrap());
    assert_eq!(path.parent().unwrap(), tmp.path().join("received"));
    let record: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(record["headers"]["x-delivery"], "abc");
    assert_eq!(record["data"]["messages"][0], "hi");
    assert!(record["receivedAt"].is_string());
}

#[tokio::test]
async fn invalid_json_is_400_and_not_archived() {
    let tmp = TempDir::new().unwrap();
    let server = ReceiverTestServer::start(tmp.path(), |_| {}).await;

    let response = reqwest::Client::new()
        .post(server.url("/hooks/tickets"))
        .body(r#"{"a":"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid JSON");
    assert!(!tmp.path().join("received").exists());
}

#[tokio::test]
async fn health_reports_backend() {
    let tmp = TempDir::new().unwrap();
    let server = ReceiverTestServer::start(tmp.path(), |config| {
        config.replay_backend = private_receiver::ReplayBackend::Sqlite;
    })
    .await;

    let body: Value = reqwest::get(server.url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["replay_backend"], "sqlite");
}
