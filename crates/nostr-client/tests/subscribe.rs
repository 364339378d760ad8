//! Subscription aggregation against in-process mock relays.

mod support;

use std::collections::HashMap;
use std::time::Duration;

use nostr::unix_now;
use nostr_client::{subscribe, Filter, SubscribeOptions};
use support::{fresh_event, init_tracing, start_relay, test_event, RelayScript};

async fn collect_all(
    relays: &[String],
    opts: SubscribeOptions,
) -> HashMap<String, String> {
    let mut stream = subscribe(relays, vec![Filter::new().kinds(vec![1])], opts);
    let mut seen = HashMap::new();
    while let Some(received) = stream.next().await {
        let previous = seen.insert(received.event.id.clone(), received.relay_url);
        assert!(previous.is_none(), "event delivered twice");
    }
    seen
}

#[tokio::test]
async fn deduplicates_events_across_relays() {
    init_tracing();
    let (e1, e2, e3) = (fresh_event("e1"), fresh_event("e2"), fresh_event("e3"));
    let relays = vec![
        start_relay(RelayScript::ServeEvents(vec![e1.clone(), e2.clone()])).await,
        start_relay(RelayScript::ServeEvents(vec![e2.clone(), e3.clone()])).await,
        start_relay(RelayScript::ServeEvents(vec![e3, e1])).await,
    ];

    // All relays close after serving, so the stream ends on its own.
    let seen = collect_all(&relays, SubscribeOptions::default()).await;
    let mut ids: Vec<_> = seen.keys().cloned().collect();
    ids.sort();
    assert_eq!(ids, ["e1", "e2", "e3"]);
}

#[tokio::test]
async fn drops_events_older_than_cutoff() {
    init_tracing();
    let stale = test_event("stale", unix_now() - 3600);
    let fresh = fresh_event("fresh");
    let relays = vec![start_relay(RelayScript::ServeEvents(vec![stale, fresh])).await];

    let opts = SubscribeOptions {
        since: Duration::from_secs(60),
        ..Default::default()
    };
    let seen = collect_all(&relays, opts).await;
    assert!(seen.contains_key("fresh"));
    assert!(!seen.contains_key("stale"));
}

#[tokio::test]
async fn unreachable_relay_does_not_poison_the_stream() {
    init_tracing();
    let good = start_relay(RelayScript::ServeEvents(vec![fresh_event("e1")])).await;
    // Nothing is listening on this port.
    let relays = vec![good, "ws://127.0.0.1:1".to_string()];

    let seen = collect_all(&relays, SubscribeOptions::default()).await;
    assert_eq!(seen.len(), 1);
    assert!(seen.contains_key("e1"));
}

#[tokio::test]
async fn events_carry_their_relay_url() {
    init_tracing();
    let relay = start_relay(RelayScript::ServeEvents(vec![fresh_event("e1")])).await;
    let relays = vec![relay.clone()];

    let seen = collect_all(&relays, SubscribeOptions::default()).await;
    assert_eq!(seen.get("e1"), Some(&relay));
}

#[tokio::test]
async fn timeout_ends_a_stream_with_live_relays() {
    init_tracing();
    let relays = vec![start_relay(RelayScript::Silent).await];

    let opts = SubscribeOptions {
        timeout: Some(Duration::from_millis(300)),
        ..Default::default()
    };
    let start = std::time::Instant::now();
    let seen = collect_all(&relays, opts).await;
    assert!(seen.is_empty());
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn close_tears_down_early() {
    init_tracing();
    let relays = vec![start_relay(RelayScript::Silent).await];
    let stream = subscribe(&relays, vec![], SubscribeOptions::default());
    stream.close().await;
}
