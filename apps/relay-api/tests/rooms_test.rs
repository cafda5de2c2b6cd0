mod common;

use axum_test::TestServer;
use relay_api::gateway::session::Connection;
use serde_json::Value;

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn stats_start_at_zero() {
    let (app, _state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let body: Value = server.get("/api/v1/stats").await.json();
    assert_eq!(body["rooms"], 0);
    assert_eq!(body["members"], 0);
    assert_eq!(body["fanout"]["delivered"], 0);
    assert_eq!(body["fanout"]["dropped"], 0);
}

#[tokio::test]
async fn unknown_room_is_404() {
    let (app, _state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/api/v1/rooms/nope").await;
    resp.assert_status_not_found();
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn overlong_room_id_is_400() {
    let (app, _state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let long = "x".repeat(65);
    let resp = server.get(&format!("/api/v1/rooms/{long}")).await;
    resp.assert_status_bad_request();
}

#[tokio::test]
async fn populated_room_is_described() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let (mut a, _rx_a) = Connection::new(8);
    let (mut b, _rx_b) = Connection::new(8);
    state
        .relay
        .handle_text(&mut a, r#"{"type":"join","room":"lobby","name":"ann"}"#);
    state
        .relay
        .handle_text(&mut b, r#"{"type":"join","room":"lobby","name":"bob"}"#);

    let body: Value = server.get("/api/v1/rooms/lobby").await.json();
    assert_eq!(body["id"], "lobby");
    assert_eq!(body["capacity"], common::TEST_CAPACITY);
    assert_eq!(body["revision"], 2);
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["name"], "ann");
    assert_eq!(members[0]["isHost"], true);
    assert_eq!(body["hostId"], members[0]["id"]);

    let stats: Value = server.get("/api/v1/stats").await.json();
    assert_eq!(stats["rooms"], 1);
    assert_eq!(stats["members"], 2);

    state.relay.disconnect(&mut a);
    state.relay.disconnect(&mut b);
    server.get("/api/v1/rooms/lobby").await.assert_status_not_found();
}
