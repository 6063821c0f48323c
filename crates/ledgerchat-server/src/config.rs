//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration
//! for local development. Without a publisher key the stream endpoints stay
//! disabled.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ledgerchat_shared::constants::{
    CHAT_SCHEMA, DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_HTTP_PORT, DEFAULT_POLL_INTERVAL_MS,
};
use ledgerchat_shared::identity::PublisherIdentity;
use ledgerchat_shared::types::SchemaId;
use ledgerchat_stream::SyncOptions;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:3001`
    pub http_addr: SocketAddr,

    /// JSON file holding the room registry.
    /// Env: `ROOMS_FILE`
    /// Default: `./data/rooms.json`
    pub rooms_file: PathBuf,

    /// Comma-separated `type name` list of the chat schema.
    /// Env: `CHAT_SCHEMA`
    pub chat_schema: String,

    /// Schema id used when a stream request does not name one.
    /// Env: `CHAT_SCHEMA_ID`
    /// Default: all-zeros.
    pub chat_schema_id: SchemaId,

    /// Signing identity for ledger writes, from a 64-char hex secret.
    /// Env: `PUBLISHER_SECRET_KEY`
    /// Default: none (stream endpoints answer 503).
    pub publisher: Option<PublisherIdentity>,

    /// Env: `CONFIRMATION_TIMEOUT_SECS`
    pub confirmation_timeout: Duration,

    /// Env: `POLL_INTERVAL_MS`
    pub poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            rooms_file: PathBuf::from("./data/rooms.json"),
            chat_schema: CHAT_SCHEMA.to_string(),
            chat_schema_id: SchemaId::ZERO,
            publisher: None,
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("ROOMS_FILE").filter(|p| !p.is_empty()) {
            config.rooms_file = PathBuf::from(path);
        }

        if let Some(schema) = lookup("CHAT_SCHEMA").filter(|s| !s.trim().is_empty()) {
            config.chat_schema = schema;
        }

        if let Some(id) = lookup("CHAT_SCHEMA_ID") {
            match SchemaId::parse(id.trim()) {
                Ok(parsed) => config.chat_schema_id = parsed,
                Err(e) => tracing::warn!(error = %e, "Invalid CHAT_SCHEMA_ID, using zero id"),
            }
        }

        if let Some(secret) = lookup("PUBLISHER_SECRET_KEY").filter(|s| !s.is_empty()) {
            match PublisherIdentity::from_secret_hex(&secret) {
                Ok(identity) => config.publisher = Some(identity),
                Err(e) => tracing::warn!(
                    error = %e,
                    "Invalid PUBLISHER_SECRET_KEY, ledger gateway disabled"
                ),
            }
        }

        if let Some(val) = lookup("CONFIRMATION_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.confirmation_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid CONFIRMATION_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(val) = lookup("POLL_INTERVAL_MS") {
            match val.parse::<u64>() {
                Ok(ms) if ms > 0 => config.poll_interval = Duration::from_millis(ms),
                _ => tracing::warn!(value = %val, "Invalid POLL_INTERVAL_MS, using default"),
            }
        }

        config
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            poll_interval: self.poll_interval,
            confirmation_timeout: self.confirmation_timeout,
            ..SyncOptions::default()
        }
    }
}
