//! Environment-driven configuration.

use anyhow::{Context, Result};

pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://relay.primal.net",
    "wss://nos.lol",
    "wss://offchain.pub",
    "wss://nostr21.com",
    "wss://pyramid.fiatjaf.com/",
    "wss://relay.sig.fun",
];

const DEFAULT_BASE_URL: &str = "https://api.routstr.com/v1";
const DEFAULT_MODEL: &str = "deepcogito/cogito-v2-preview-llama-109b-moe";
const DEFAULT_PROMPT: &str = "You are a nostr meme robot! Keep responses under 512 chars. \
     Be funny but not cringe. Shitpost.";
const DEFAULT_ACTIVATION_CMD: &str = "!robot";

#[derive(Debug, Clone)]
pub struct Config {
    /// Bot identity as an nsec or hex secret key; a fresh ephemeral
    /// identity is generated when unset.
    pub nsec: Option<String>,
    pub relays: Vec<String>,
    /// Substring that triggers a reply when found in a note.
    pub activation_cmd: String,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub token: String,
    pub base_url: String,
    pub model: String,
    pub prompt: String,
}

impl Config {
    /// Load configuration from the environment, after `.env` has been
    /// merged in by the caller.
    pub fn from_env() -> Result<Self> {
        let relays = match std::env::var("RELAYS") {
            Ok(list) => list
                .split(',')
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect(),
            Err(_) => DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Config {
            nsec: std::env::var("NSEC").ok(),
            relays,
            activation_cmd: env_or("ACTIVATION_CMD", DEFAULT_ACTIVATION_CMD),
            llm: LlmConfig {
                token: std::env::var("TOKEN").context("TOKEN must be set")?,
                base_url: env_or("BASE_URL", DEFAULT_BASE_URL),
                model: env_or("MODEL", DEFAULT_MODEL),
                prompt: env_or("PROMPT", DEFAULT_PROMPT),
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
