#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;

use relay_api::config::Config;
use relay_api::AppState;

/// Room capacity used by every test server.
pub const TEST_CAPACITY: usize = 4;

/// Build an `AppState` with small, predictable limits.
pub fn test_state() -> AppState {
    let config = Config {
        port: 0,
        room_capacity: TEST_CAPACITY,
        outbound_buffer: 32,
        ..Config::default()
    };
    AppState::new(config)
}

/// Build a router wired to a fresh state. Returns (router, state).
pub fn test_app() -> (Router, AppState) {
    let state = test_state();
    let app = relay_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Start an actual TCP server for WebSocket testing.
/// The server runs in the background for the rest of the test.
pub async fn start_ws_server() -> (SocketAddr, AppState) {
    let (app, state) = test_app();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}
