//! Per-relay subscription worker.
//!
//! Each worker owns exactly one WebSocket connection for its whole
//! lifetime: connect, send REQ, then read frames until the relay closes,
//! the transport fails, or the worker is cancelled. Failures here are
//! confined to this worker; sibling relays never observe them.

use std::collections::HashSet;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use nostr::Event;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;
use uuid::Uuid;

use crate::error::{validate_relay_url, ClientError, Result};
use crate::message::{ClientMessage, Filter, RelayMessage};

/// An event received from a subscription, tagged with the relay that
/// delivered it (used as the relay hint in reply tags).
#[derive(Debug, Clone)]
pub struct RelayEvent {
    pub event: Event,
    pub relay_url: String,
}

/// Event ids already delivered to the consumer. Scoped to one
/// aggregator call, shared by its workers only.
pub(crate) type SeenSet = Arc<Mutex<HashSet<String>>>;

/// Generate a unique subscription ID.
pub fn generate_subscription_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// Run one relay subscription to completion.
///
/// Never returns an error to the caller: the outcome of a worker is
/// only visible through its task finishing and its sender dropping.
pub(crate) async fn run_subscriber(
    url: String,
    filters: Vec<Filter>,
    since_cutoff: u64,
    seen: SeenSet,
    tx: mpsc::UnboundedSender<RelayEvent>,
) {
    match subscribe_loop(&url, filters, since_cutoff, seen, tx).await {
        Ok(()) => debug!("subscription to {} ended", url),
        Err(e) => debug!("subscription to {} failed: {}", url, e),
    }
}

async fn subscribe_loop(
    url: &str,
    filters: Vec<Filter>,
    since_cutoff: u64,
    seen: SeenSet,
    tx: mpsc::UnboundedSender<RelayEvent>,
) -> Result<()> {
    validate_relay_url(url)?;
    let (mut ws, _) = connect_async(url)
        .await
        .map_err(|e| ClientError::WebSocket(e.to_string()))?;
    debug!("connected to relay {}", url);

    let req = ClientMessage::Req {
        subscription_id: generate_subscription_id(),
        filters,
    }
    .to_json()?;
    if let Err(e) = ws.send(Message::Text(req.into())).await {
        let _ = ws.close(None).await;
        return Err(ClientError::WebSocket(e.to_string()));
    }

    let result = read_events(&mut ws, url, since_cutoff, &seen, &tx).await;
    // The connection is closed on every exit path.
    let _ = ws.close(None).await;
    result
}

async fn read_events<S>(
    ws: &mut tokio_tungstenite::WebSocketStream<S>,
    url: &str,
    since_cutoff: u64,
    seen: &SeenSet,
    tx: &mpsc::UnboundedSender<RelayEvent>,
) -> Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    while let Some(frame) = ws.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Ping(data)) => {
                let _ = ws.send(Message::Pong(data)).await;
                continue;
            }
            Ok(Message::Close(_)) => {
                debug!("relay {} closed the connection", url);
                return Ok(());
            }
            Ok(_) => continue,
            Err(e) => return Err(ClientError::WebSocket(e.to_string())),
        };

        // Protocol noise is skipped, not an error.
        let Some(RelayMessage::Event { event, .. }) = RelayMessage::parse(text.as_str()) else {
            continue;
        };

        // Relays are not trusted to honor the since filter.
        if event.created_at < since_cutoff {
            continue;
        }

        {
            let mut seen = seen.lock().await;
            if !seen.insert(event.id.clone()) {
                continue;
            }
        }

        let delivered = RelayEvent {
            event,
            relay_url: url.to_string(),
        };
        if tx.send(delivered).is_err() {
            // Consumer is gone; nothing left to do.
            return Ok(());
        }
    }
    Err(ClientError::ConnectionClosed(url.to_string()))
}
