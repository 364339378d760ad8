//! A Nostr reply bot: watches relays for notes containing an
//! activation command and answers them with generated replies.

mod config;
mod responder;

use anyhow::{Context, Result};
use nostr::Keys;
use nostr_client::{reply_to, subscribe, Filter, SubscribeOptions};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use responder::Responder;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ostrich=info,nostr_client=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let keys = match &config.nsec {
        Some(nsec) => Keys::parse(nsec).context("invalid NSEC")?,
        None => Keys::generate(),
    };
    info!("bot started with identity: {}", keys.npub());
    info!("watching {} relays", config.relays.len());

    let responder = Responder::new(config.llm.clone());
    tokio::select! {
        result = run(&config, &keys, &responder) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }
    }
}

async fn run(config: &Config, keys: &Keys, responder: &Responder) -> Result<()> {
    let opts = SubscribeOptions {
        since: Duration::from_secs(60 * 10),
        ..Default::default()
    };
    let mut stream = subscribe(&config.relays, vec![Filter::new().kinds(vec![1])], opts);

    while let Some(received) = stream.next().await {
        if !received.event.content.contains(&config.activation_cmd) {
            continue;
        }
        // The bot must not answer itself.
        if received.event.pubkey == keys.public_key() {
            continue;
        }
        info!(
            "processing note {} from {}",
            received.event.id, received.event.pubkey
        );

        let response = match responder.generate(&received.event.content).await {
            Ok(response) => response,
            Err(e) => {
                error!("response generation failed: {:#}", e);
                continue;
            }
        };

        match reply_to(&received, keys, response, &config.relays).await {
            Ok(results) => {
                let accepted = results.values().filter(|ok| **ok).count();
                info!("reply accepted by {}/{} relays", accepted, results.len());
            }
            Err(e) => error!("failed to publish reply: {}", e),
        }
    }

    warn!("all relay connections ended, shutting down");
    Ok(())
}
