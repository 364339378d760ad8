//! In-process mock relays for integration tests.
#![allow(dead_code)]

use std::sync::Once;

use futures::{SinkExt, StreamExt};
use nostr::{unix_now, Event, KIND_SHORT_TEXT_NOTE};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

static INIT_TRACING: Once = Once::new();

pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "nostr_client=debug".into()),
            )
            .with_test_writer()
            .init();
    });
}

/// What a mock relay does with each incoming connection.
#[derive(Debug, Clone)]
pub enum RelayScript {
    /// Answer the first REQ with these events, then EOSE, then close.
    ServeEvents(Vec<Event>),
    /// Accept the connection but never send anything back.
    Silent,
    /// Acknowledge every published event with the given verdict.
    Ack(bool),
}

/// Start a mock relay and return its `ws://` URL.
///
/// The relay accepts connections until the test process exits.
pub async fn start_relay(script: RelayScript) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock relay");
    let addr = listener.local_addr().expect("mock relay addr");
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(handle_connection(stream, script.clone()));
        }
    });
    format!("ws://{}", addr)
}

async fn handle_connection(stream: TcpStream, script: RelayScript) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };
    match script {
        RelayScript::ServeEvents(events) => serve_events(&mut ws, events).await,
        RelayScript::Silent => {
            // Drain frames so pings get consumed, but never reply.
            while let Some(Ok(_)) = ws.next().await {}
        }
        RelayScript::Ack(verdict) => ack_events(&mut ws, verdict).await,
    }
}

async fn serve_events(ws: &mut WebSocketStream<TcpStream>, events: Vec<Event>) {
    // The subscription id must be echoed back in EVENT frames.
    let sub_id = loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                let Ok(frame) = serde_json::from_str::<serde_json::Value>(text.as_str()) else {
                    continue;
                };
                if frame[0] == "REQ" {
                    break frame[1].as_str().unwrap_or("sub").to_string();
                }
            }
            Some(Ok(_)) => continue,
            _ => return,
        }
    };
    for event in events {
        let frame = serde_json::json!(["EVENT", sub_id, event]).to_string();
        if ws.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }
    let eose = serde_json::json!(["EOSE", sub_id]).to_string();
    let _ = ws.send(Message::Text(eose.into())).await;
    let _ = ws.close(None).await;
}

async fn ack_events(ws: &mut WebSocketStream<TcpStream>, verdict: bool) {
    while let Some(Ok(frame)) = ws.next().await {
        let Message::Text(text) = frame else {
            continue;
        };
        let Ok(frame) = serde_json::from_str::<serde_json::Value>(text.as_str()) else {
            continue;
        };
        if frame[0] != "EVENT" {
            continue;
        }
        let Some(id) = frame[1]["id"].as_str() else {
            continue;
        };
        let ok = serde_json::json!(["OK", id, verdict, ""]).to_string();
        if ws.send(Message::Text(ok.into())).await.is_err() {
            return;
        }
    }
}

/// A syntactically valid event with a fixed id; signatures are not
/// checked by the client, so these are never actually signed.
pub fn test_event(id: &str, created_at: u64) -> Event {
    Event {
        id: id.to_string(),
        pubkey: "a".repeat(64),
        created_at,
        kind: KIND_SHORT_TEXT_NOTE,
        tags: vec![],
        content: format!("note {}", id),
        sig: "b".repeat(128),
    }
}

pub fn fresh_event(id: &str) -> Event {
    test_event(id, unix_now())
}
