//! # ledgerchat-stream
//!
//! Turns an append-only, poll-only ledger stream into a live chat feed.
//!
//! - [`gateway`]: the ledger primitives the feed depends on
//! - [`local`]: a process-local ledger implementing them
//! - [`service`]: schema registration, publishing, and the polling
//!   subscription with dedup and self/other attribution
//! - [`registration`]: per-room schema registration gate
//! - [`feed`]: caller-side merge of delivered batches

pub mod feed;
pub mod gateway;
pub mod local;
pub mod registration;
pub mod service;

mod error;

pub use error::{GatewayError, StreamError};
pub use feed::merge_feed;
pub use gateway::LedgerGateway;
pub use local::{LocalGateway, LocalLedger};
pub use registration::{RegistrationState, SchemaGate};
pub use service::{Published, StreamSync, SyncOptions, SyncState, Viewer};
