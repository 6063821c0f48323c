use std::time::Duration;

use thiserror::Error;

use ledgerchat_shared::error::CodecError;
use ledgerchat_shared::types::{SchemaId, TxHash};

/// Failures reported by a [`LedgerGateway`](crate::gateway::LedgerGateway).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Another registrant got there first. Callers treat this as success.
    #[error("Schema {0} is already registered")]
    AlreadyRegistered(SchemaId),

    #[error("Schema {0} is not registered")]
    UnknownSchema(SchemaId),

    #[error("Unknown transaction {0}")]
    UnknownTransaction(TxHash),

    #[error("No signing identity bound to the gateway")]
    NoSigner,

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the stream synchronization service.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Malformed caller input. Raised before any ledger I/O.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No signing identity is bound")]
    Unauthenticated,

    #[error("Encoding error: {0}")]
    Encoding(#[from] CodecError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The gateway accepted the call but produced no write handle.
    #[error("Failed to publish message")]
    NotPublished,

    #[error("Ledger confirmation timed out after {0:?}")]
    ConfirmationTimeout(Duration),

    #[error("Subscriptions require a running tokio runtime")]
    NoRuntime,
}
