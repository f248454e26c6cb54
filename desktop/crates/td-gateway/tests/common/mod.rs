//! Fake backend progress socket for relay tests.

#![allow(dead_code)]

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Task id that makes the server emit a malformed frame before progress.
pub const MALFORMED_TASK_ID: &str = "malformed";

pub const PROGRESS_STEPS: u32 = 5;

#[derive(Clone)]
struct ServerState {
    received: mpsc::UnboundedSender<String>,
}

pub struct ProgressServer {
    pub url: String,
    /// Every text frame the server received, in arrival order
    pub received: mpsc::UnboundedReceiver<String>,
}

/// Spawn a `/ws` endpoint that answers each `start_task` with progress
/// 20, 40, ... 100 for that task id.
pub async fn spawn_progress_server() -> ProgressServer {
    let (received_tx, received_rx) = mpsc::unbounded_channel();
    let state = ServerState {
        received: received_tx,
    };

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    ProgressServer {
        url: format!("ws://{addr}/ws"),
        received: received_rx,
    }
}

/// A ws:// URL on a port nobody is listening on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}/ws")
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: ServerState) {
    while let Some(Ok(message)) = socket.recv().await {
        let text = match message {
            Message::Text(text) => text.as_str().to_owned(),
            Message::Close(_) => break,
            _ => continue,
        };
        let _ = state.received.send(text.clone());

        let Ok(command) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        if command["type"] != "start_task" {
            continue;
        }
        let task_id = command["task_id"].clone();

        if task_id == MALFORMED_TASK_ID
            && socket
                .send(Message::Text("{not valid json".into()))
                .await
                .is_err()
        {
            return;
        }

        for step in 1..=PROGRESS_STEPS {
            let record = json!({
                "task_id": task_id,
                "progress": step * 100 / PROGRESS_STEPS,
            });
            if socket
                .send(Message::Text(record.to_string().into()))
                .await
                .is_err()
            {
                return;
            }
        }
    }
}
