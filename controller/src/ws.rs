//! Single-client WebSocket endpoint.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::handler::RequestHandler;

#[derive(Clone)]
pub struct WsState {
    handler: Arc<RequestHandler>,
    slot: Arc<Semaphore>,
}

impl WsState {
    pub fn new(handler: RequestHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    /// Claims the only client slot. The slot frees when the permit drops.
    fn claim(&self) -> Option<OwnedSemaphorePermit> {
        self.slot.clone().try_acquire_owned().ok()
    }
}

pub fn router(state: WsState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> Response {
    let Some(permit) = state.claim() else {
        warn!("refusing connection, a client is already connected");
        return (StatusCode::CONFLICT, "another client is connected").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state.handler, permit))
}

async fn handle_socket(
    socket: WebSocket,
    handler: Arc<RequestHandler>,
    _permit: OwnedSemaphorePermit,
) {
    let (mut sender, mut receiver) = socket.split();
    info!("client connected");

    while let Some(result) = receiver.next().await {
        let raw = match result {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => text.to_owned(),
                Err(_) => {
                    warn!("dropping binary frame that is not UTF-8");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                warn!("receive error: {err}");
                break;
            }
        };

        let Some(snapshot) = handler.handle(&raw).await else {
            continue;
        };

        let json = match serde_json::to_string(&snapshot) {
            Ok(json) => json,
            Err(err) => {
                warn!("failed to serialize state: {err}");
                continue;
            }
        };
        debug!("sending state ({} bytes)", json.len());

        if sender.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }

    info!("client disconnected");
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::fixture;

    #[test]
    fn only_one_client_at_a_time() {
        let fixture = fixture(json!({}), 20.0);
        let state = WsState::new(RequestHandler::new(fixture.state.clone()));

        let first = state.claim();
        assert!(first.is_some());
        assert!(state.claim().is_none());

        drop(first);
        assert!(state.claim().is_some());
    }
}
