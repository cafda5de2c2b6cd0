//! WebSocket upgrade handler and per-connection event loop.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::error::RelayError;
use crate::AppState;

use super::session::{Connection, Frame};

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Run one connection: a writer task drains the outbound queue into the
/// socket while this task reads frames and feeds them to the session manager.
async fn handle_connection(socket: WebSocket, state: AppState) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (mut conn, outbound_rx) = Connection::new(state.config.outbound_buffer);
    let conn_id = conn.id.clone();
    tracing::info!(%conn_id, "gateway connection opened");

    let writer = tokio::spawn(write_outbound(ws_tx, outbound_rx, conn_id.clone()));
    let relay = &state.relay;

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => relay.handle_text(&mut conn, &text),
            Ok(Message::Binary(_)) => relay.reject(
                &conn,
                &RelayError::MalformedInput("binary frames are not supported".into()),
            ),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!(?e, %conn_id, "ws read error");
                break;
            }
        }
        // Explicit leave closes the connection from our side.
        if conn.is_closed() {
            break;
        }
    }

    // No-op if an explicit leave already ran.
    relay.disconnect(&mut conn);

    // Dropping the connection releases the only strong sender; the writer
    // flushes whatever is queued and exits.
    drop(conn);
    if let Err(e) = writer.await {
        tracing::warn!(?e, %conn_id, "gateway writer task failed");
    }

    tracing::info!(%conn_id, "gateway connection closed");
}

async fn write_outbound(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Frame>,
    conn_id: String,
) {
    while let Some(frame) = outbound_rx.recv().await {
        if ws_tx
            .send(Message::Text(String::from(&*frame).into()))
            .await
            .is_err()
        {
            tracing::debug!(%conn_id, "ws write failed, dropping outbound queue");
            return;
        }
    }
    let _ = send_close(&mut ws_tx, close_code::NORMAL, "bye").await;
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
