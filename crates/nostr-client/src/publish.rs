//! Event publishing with per-relay acknowledgment tracking.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use futures::{SinkExt, StreamExt};
use nostr::{Event, EventTemplate, Keys, KIND_SHORT_TEXT_NOTE};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

use crate::error::{validate_relay_url, ClientError, Result};
use crate::message::{ClientMessage, RelayMessage};
use crate::relay::RelayEvent;

/// How long to wait for a relay to acknowledge a published event.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Publish `event` to every relay concurrently.
///
/// Returns one entry per relay URL: `true` if that relay acknowledged
/// the event within [`ACK_TIMEOUT`], `false` for a rejection, timeout,
/// or any transport failure.
pub async fn publish_event(event: &Event, relays: &[String]) -> HashMap<String, bool> {
    publish_event_with_timeout(event, relays, ACK_TIMEOUT).await
}

/// [`publish_event`] with an explicit acknowledgment deadline.
pub async fn publish_event_with_timeout(
    event: &Event,
    relays: &[String],
    ack_timeout: Duration,
) -> HashMap<String, bool> {
    let attempts = relays.iter().map(|url| async move {
        let accepted = match try_publish(url, event, ack_timeout).await {
            Ok(accepted) => accepted,
            Err(e) => {
                debug!("publish to {} failed: {}", url, e);
                false
            }
        };
        (url.clone(), accepted)
    });
    join_all(attempts).await.into_iter().collect()
}

async fn try_publish(url: &str, event: &Event, ack_timeout: Duration) -> Result<bool> {
    validate_relay_url(url)?;
    let (mut ws, _) = connect_async(url)
        .await
        .map_err(|e| ClientError::WebSocket(e.to_string()))?;

    let json = ClientMessage::Event(event.clone()).to_json()?;
    if let Err(e) = ws.send(Message::Text(json.into())).await {
        let _ = ws.close(None).await;
        return Err(ClientError::WebSocket(e.to_string()));
    }

    let accepted = tokio::time::timeout(ack_timeout, wait_for_ack(&mut ws, url, &event.id))
        .await
        .unwrap_or_else(|_| {
            debug!("no ack from {} within {:?}", url, ack_timeout);
            Ok(false)
        });
    let _ = ws.close(None).await;
    accepted
}

/// Read frames until the relay acknowledges `event_id`.
///
/// Relays may interleave other traffic before the OK, so anything that
/// is not an OK for this event is skipped.
async fn wait_for_ack<S>(
    ws: &mut tokio_tungstenite::WebSocketStream<S>,
    url: &str,
    event_id: &str,
) -> Result<bool>
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
            Ok(Message::Close(_)) => return Ok(false),
            Ok(_) => continue,
            Err(e) => return Err(ClientError::WebSocket(e.to_string())),
        };
        if let Some(RelayMessage::Ok {
            event_id: acked,
            success,
            message,
        }) = RelayMessage::parse(text.as_str())
        {
            if acked == event_id {
                if !success {
                    debug!("relay {} rejected event: {}", url, message);
                }
                return Ok(success);
            }
        }
    }
    Ok(false)
}

/// Sign and publish a reply to an event received from a subscription.
///
/// Threads the reply under the original's root when the original is
/// itself part of a thread, and marks the original as the direct
/// parent. The relay the original arrived from is used as the relay
/// hint in both tags.
pub async fn reply_to(
    original: &RelayEvent,
    keys: &Keys,
    content: impl Into<String>,
    relays: &[String],
) -> Result<HashMap<String, bool>> {
    let tags = reply_tags(&original.event, &original.relay_url);
    let event = EventTemplate::new(KIND_SHORT_TEXT_NOTE, content)
        .tags(tags)
        .sign(keys)?;
    Ok(publish_event(&event, relays).await)
}

fn reply_tags(original: &Event, relay_hint: &str) -> Vec<Vec<String>> {
    let root = original
        .tags
        .iter()
        .find(|t| t.len() >= 4 && t[0] == "e" && t[3] == "root")
        .or_else(|| original.tags.iter().find(|t| t.len() >= 2 && t[0] == "e"))
        .map(|t| t[1].clone())
        .unwrap_or_else(|| original.id.clone());

    vec![
        vec![
            "e".to_string(),
            root,
            relay_hint.to_string(),
            "root".to_string(),
        ],
        vec![
            "e".to_string(),
            original.id.clone(),
            relay_hint.to_string(),
            "reply".to_string(),
        ],
        vec!["p".to_string(), original.pubkey.clone()],
    ]
}
