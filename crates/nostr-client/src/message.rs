//! Nostr relay message types (NIP-01 wire protocol).
//!
//! Client to relay: EVENT, REQ, CLOSE.
//! Relay to client: EVENT, OK, EOSE, CLOSED, NOTICE.
//!
//! Inbound parsing is deliberately forgiving: relays emit frames we
//! don't understand, and a malformed frame must degrade to a skipped
//! frame, never a connection fault. [`RelayMessage::parse`] therefore
//! returns `None` for anything it can't interpret.

use nostr::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Messages sent from client to relay.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    /// Publish an event: `["EVENT", <event>]`
    Event(Event),

    /// Open a subscription: `["REQ", <subscription_id>, <filter>, ...]`
    Req {
        subscription_id: String,
        filters: Vec<Filter>,
    },

    /// Close a subscription: `["CLOSE", <subscription_id>]`
    Close { subscription_id: String },
}

impl ClientMessage {
    /// Serialize to a JSON array for sending to a relay.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let value = match self {
            ClientMessage::Event(event) => serde_json::json!(["EVENT", event]),
            ClientMessage::Req {
                subscription_id,
                filters,
            } => {
                let mut arr: Vec<Value> = vec![
                    Value::String("REQ".to_string()),
                    Value::String(subscription_id.clone()),
                ];
                for filter in filters {
                    arr.push(serde_json::to_value(filter)?);
                }
                Value::Array(arr)
            }
            ClientMessage::Close { subscription_id } => {
                serde_json::json!(["CLOSE", subscription_id])
            }
        };
        Ok(value.to_string())
    }
}

/// Messages received from a relay.
#[derive(Debug, Clone)]
pub enum RelayMessage {
    /// Event matching a subscription: `["EVENT", <subscription_id>, <event>]`
    Event {
        subscription_id: String,
        event: Event,
    },

    /// Command result: `["OK", <event_id>, <true|false>, <message>]`
    Ok {
        event_id: String,
        success: bool,
        message: String,
    },

    /// End of stored events: `["EOSE", <subscription_id>]`
    Eose { subscription_id: String },

    /// Subscription closed by the relay: `["CLOSED", <subscription_id>, <message>]`
    Closed {
        subscription_id: String,
        message: String,
    },

    /// Human-readable notice: `["NOTICE", <message>]`
    Notice { message: String },
}

impl RelayMessage {
    /// Parse a raw relay frame.
    ///
    /// Returns `None` for non-JSON input, non-array shapes, unknown
    /// message tags, and recognized tags with malformed payloads.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        let arr = value.as_array()?;
        let tag = arr.first()?.as_str()?;

        match tag {
            "EVENT" => {
                let subscription_id = arr.get(1)?.as_str()?.to_string();
                let event: Event = serde_json::from_value(arr.get(2)?.clone()).ok()?;
                Some(RelayMessage::Event {
                    subscription_id,
                    event,
                })
            }
            "OK" => {
                let event_id = arr.get(1)?.as_str()?.to_string();
                let success = arr.get(2)?.as_bool()?;
                let message = arr.get(3).and_then(|v| v.as_str()).unwrap_or("").to_string();
                Some(RelayMessage::Ok {
                    event_id,
                    success,
                    message,
                })
            }
            "EOSE" => {
                let subscription_id = arr.get(1)?.as_str()?.to_string();
                Some(RelayMessage::Eose { subscription_id })
            }
            "CLOSED" => {
                let subscription_id = arr.get(1)?.as_str()?.to_string();
                let message = arr.get(2).and_then(|v| v.as_str()).unwrap_or("").to_string();
                Some(RelayMessage::Closed {
                    subscription_id,
                    message,
                })
            }
            "NOTICE" => {
                let message = arr.get(1)?.as_str()?.to_string();
                Some(RelayMessage::Notice { message })
            }
            _ => None,
        }
    }
}

/// Filter for subscription requests.
///
/// The client treats filters as caller-owned: the only field the engine
/// itself ever writes is `since`, when it applies the subscription
/// cutoff.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter {
    /// Event IDs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,

    /// Authors (pubkeys)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    /// Event kinds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u16>>,

    /// Events since timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,

    /// Events until timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,

    /// Maximum number of events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Generic tag queries keyed as `#e`, `#p`, ...
    #[serde(flatten, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, Vec<String>>,
}

impl Filter {
    /// Create a new empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by event IDs.
    pub fn ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Filter by authors.
    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.authors = Some(authors);
        self
    }

    /// Filter by kinds.
    pub fn kinds(mut self, kinds: Vec<u16>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    /// Filter by events since timestamp.
    pub fn since(mut self, timestamp: u64) -> Self {
        self.since = Some(timestamp);
        self
    }

    /// Filter by events until timestamp.
    pub fn until(mut self, timestamp: u64) -> Self {
        self.until = Some(timestamp);
        self
    }

    /// Limit number of results.
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Add a tag filter. The key is the tag letter, e.g. "e" or "p".
    pub fn tag(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.tags.insert(format!("#{}", key.into()), values);
        self
    }
}
