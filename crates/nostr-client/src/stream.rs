//! Multi-relay event aggregation.
//!
//! [`subscribe`] fans one subscription out across a set of relays and
//! merges the results into a single deduplicated stream. Each relay
//! gets its own worker task; a dead or misbehaving relay only silences
//! itself.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use nostr::unix_now;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::message::Filter;
use crate::relay::{run_subscriber, RelayEvent};

/// How long a receive poll waits before re-checking the deadline.
const POLL_WINDOW: Duration = Duration::from_millis(50);

/// Options controlling a [`subscribe`] call.
#[derive(Debug, Clone)]
pub struct SubscribeOptions {
    /// Stop the stream after this long, even if relays are still
    /// connected. `None` streams until every relay disconnects.
    pub timeout: Option<Duration>,
    /// Ignore events created more than this long before the call.
    pub since: Duration,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        SubscribeOptions {
            timeout: None,
            since: Duration::from_secs(1),
        }
    }
}

/// Subscribe to `filters` on every relay in `relays` at once.
///
/// An empty filter list is treated as a single match-everything filter.
/// Events older than the `since` cutoff are dropped, and each event id
/// is delivered at most once no matter how many relays carry it.
pub fn subscribe(relays: &[String], filters: Vec<Filter>, opts: SubscribeOptions) -> EventStream {
    let cutoff = unix_now().saturating_sub(opts.since.as_secs());
    let mut filters = if filters.is_empty() {
        vec![Filter::new()]
    } else {
        filters
    };
    for filter in &mut filters {
        filter.since = Some(cutoff);
    }

    let seen = Arc::new(Mutex::new(HashSet::new()));
    let (tx, rx) = mpsc::unbounded_channel();
    let workers = relays
        .iter()
        .map(|url| {
            tokio::spawn(run_subscriber(
                url.clone(),
                filters.clone(),
                cutoff,
                Arc::clone(&seen),
                tx.clone(),
            ))
        })
        .collect();
    // Workers hold the only senders, so the channel closes naturally
    // once the last relay connection ends.
    drop(tx);

    EventStream {
        rx,
        workers,
        deadline: opts.timeout.map(|t| Instant::now() + t),
    }
}

/// A merged stream of events from many relays.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<RelayEvent>,
    workers: Vec<JoinHandle<()>>,
    deadline: Option<Instant>,
}

impl EventStream {
    /// Receive the next event, or `None` when the stream has ended
    /// (every relay disconnected, or the timeout elapsed).
    pub async fn next(&mut self) -> Option<RelayEvent> {
        loop {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    debug!("subscription timeout reached");
                    self.shutdown().await;
                    return None;
                }
            }
            match tokio::time::timeout(self.poll_window(), self.rx.recv()).await {
                Ok(Some(event)) => return Some(event),
                Ok(None) => {
                    self.shutdown().await;
                    return None;
                }
                // Window expired; loop to re-check the deadline.
                Err(_) => continue,
            }
        }
    }

    /// End the subscription early and tear down all relay connections.
    pub async fn close(mut self) {
        self.shutdown().await;
    }

    fn poll_window(&self) -> Duration {
        match self.deadline {
            Some(deadline) => POLL_WINDOW.min(deadline.saturating_duration_since(Instant::now())),
            None => POLL_WINDOW,
        }
    }

    async fn shutdown(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
        for worker in self.workers.drain(..) {
            // Cancelled tasks surface a JoinError we do not care about.
            let _ = worker.await;
        }
        self.rx.close();
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        for worker in &self.workers {
            worker.abort();
        }
    }
}
