//! WebSocket upgrade and per-connection handler. Inbound frames mutate the
//! session; outbound messages are queued by the aggregator and drained here.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::proto::{self, ServerMessage};
use crate::registry;
use crate::session;
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    upgrade(ws, state)
}

pub(crate) fn upgrade(ws: WebSocketUpgrade, state: AppState) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (outbox, mut queued) = registry::outbox();
    let (id, shared) = state.registry.register(outbox.clone()).await;
    let connected = state.registry.count().await;
    info!("connection established to {id} ({connected} connected)");
    let _ = outbox.try_send(ServerMessage::welcome(id));
    // The registry now holds the only sender; once it lets go the writer
    // closes the socket.
    drop(outbox);

    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = queued.recv().await {
            let text = match proto::encode(&msg) {
                Ok(t) => t,
                Err(e) => {
                    warn!("dropping unencodable message for {id}: {e}");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match proto::decode(&text) {
                    Some(msg) => session::lock(&shared).apply(msg),
                    None => debug!("{id}: ignoring malformed message {text:?}"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!("{id}: transport error: {e}");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }

    state.registry.unregister(id).await;
    let connected = state.registry.count().await;
    info!("connection {id} closed ({connected} connected)");
}
