//! # ledgerchat-server
//!
//! HTTP front for the ledger chat core.
//!
//! This binary provides:
//! - **Room registry** endpoints backed by a JSON file with atomic rewrites
//! - **Stream** endpoints to register the chat schema, publish messages, and
//!   read a room's messages from the ledger
//! - A **health** endpoint reporting whether the ledger gateway is up

mod api;
mod config;
mod error;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ledgerchat_shared::codec::ChatCodec;
use ledgerchat_store::{RoomRegistry, RoomStore};
use ledgerchat_stream::{LocalLedger, StreamSync};

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "info,ledgerchat_server=debug,ledgerchat_stream=debug,ledgerchat_store=info",
            )
        }))
        .init();

    info!("Starting ledgerchat server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Room registry (creates the file and its directory if missing)
    let rooms = Arc::new(RoomRegistry::new(
        RoomStore::open(config.rooms_file.clone()).await?,
    ));

    // Ledger gateway and stream service; the server runs without them
    let streams = init_streams(&config);

    let app_state = AppState {
        rooms,
        streams,
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

fn init_streams(config: &ServerConfig) -> Option<Arc<StreamSync>> {
    let Some(identity) = config.publisher.clone() else {
        warn!("PUBLISHER_SECRET_KEY not set, stream endpoints disabled");
        return None;
    };

    let codec = match ChatCodec::new(&config.chat_schema) {
        Ok(codec) => codec,
        Err(e) => {
            warn!(error = %e, "CHAT_SCHEMA rejected, stream endpoints disabled");
            return None;
        }
    };

    let publisher = identity.address();
    let gateway = LocalLedger::new().gateway(Some(identity));
    info!(publisher = %publisher, schema = %config.chat_schema_id, "Ledger gateway initialized");

    Some(Arc::new(StreamSync::for_gateway(
        Arc::new(gateway),
        Arc::new(codec),
        config.sync_options(),
    )))
}
