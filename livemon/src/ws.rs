//! Minimal WebSocket client helpers for talking to the agent.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::types::{ClientMessage, ServerMessage};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Connect to the agent and return the WS stream
pub async fn connect(url: &str) -> anyhow::Result<WsStream> {
    let (ws, _) = connect_async(url).await?;
    Ok(ws)
}

pub async fn send(ws: &mut WsStream, msg: &ClientMessage) -> anyhow::Result<()> {
    let text = serde_json::to_string(msg)?;
    ws.send(Message::Text(text)).await?;
    Ok(())
}

/// Next message the agent sends. Non-text frames and text we cannot parse
/// are skipped; `None` once the connection is gone.
pub async fn next_message(ws: &mut WsStream) -> Option<ServerMessage> {
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(json)) => {
                if let Ok(msg) = serde_json::from_str::<ServerMessage>(&json) {
                    return Some(msg);
                }
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}
