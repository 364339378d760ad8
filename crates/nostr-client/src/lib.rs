//! Async Nostr relay client.
//!
//! Connects to relays over WebSocket and provides the two halves of a
//! client: [`subscribe`] merges matching events from many relays into
//! one deduplicated stream, and [`publish_event`] / [`reply_to`] send
//! signed events out and report which relays accepted them.
//!
//! # Example
//!
//! ```no_run
//! use nostr_client::{subscribe, Filter, SubscribeOptions};
//!
//! # async fn run() {
//! let relays = vec!["wss://relay.damus.io".to_string()];
//! let filters = vec![Filter::new().kinds(vec![1])];
//! let mut stream = subscribe(&relays, filters, SubscribeOptions::default());
//! while let Some(received) = stream.next().await {
//!     println!("{} from {}", received.event.content, received.relay_url);
//! }
//! # }
//! ```

mod error;
mod message;
mod publish;
mod relay;
mod stream;

pub use error::{ClientError, Result};
pub use message::{ClientMessage, Filter, RelayMessage};
pub use publish::{publish_event, publish_event_with_timeout, reply_to, ACK_TIMEOUT};
pub use relay::{generate_subscription_id, RelayEvent};
pub use stream::{subscribe, EventStream, SubscribeOptions};
