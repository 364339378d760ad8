//! Client error types

use thiserror::Error;

/// Client error type.
///
/// Per-relay transport failures are isolated inside the worker that hit
/// them and surface to callers as boolean outcomes or closed workers,
/// never as errors crossing relay boundaries.
#[derive(Error, Debug)]
pub enum ClientError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Event construction/signing error
    #[error("Event error: {0}")]
    Event(#[from] nostr::EventError),

    /// Relay closed the connection
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),
}

/// Client result type
pub type Result<T> = std::result::Result<T, ClientError>;

/// Validate that a relay URL uses a WebSocket scheme.
pub(crate) fn validate_relay_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url)?;
    if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
        return Err(ClientError::InvalidUrl(format!(
            "URL must use ws:// or wss:// scheme, got: {}",
            parsed.scheme()
        )));
    }
    Ok(parsed)
}
