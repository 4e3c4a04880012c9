//! WebSocket handler for live samples and alert transitions

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::state::ApiState;

/// WebSocket upgrade handler
///
/// GET /api/v1/stream
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: ApiState) {
    info!("WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();

    let mut sample_rx = state.monitor.subscribe_samples();
    let mut alert_rx = state.monitor.subscribe_alerts();

    let mut send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                event = sample_rx.recv() => match event {
                    Ok(event) => json!({
                        "type": "sample",
                        "sample": event.sample,
                    }),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("WebSocket client lagged, skipped {skipped} samples");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },

                transition = alert_rx.recv() => match transition {
                    Ok(transition) => json!({
                        "type": "alert",
                        "transition": transition,
                    }),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("WebSocket client lagged, skipped {skipped} transitions");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            if sender.send(Message::Text(message.to_string())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    // clients only ever close the socket
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    info!("WebSocket client disconnected");
}
