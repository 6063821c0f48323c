//! The ledger primitives the chat feed is built on.
//!
//! A gateway is bound to at most one signing identity, the publisher. Reads
//! are always scoped to a schema and a publisher address.

use async_trait::async_trait;
use bytes::Bytes;

use ledgerchat_shared::codec::RowField;
use ledgerchat_shared::types::{Address, DataId, SchemaId, TxHash};

use crate::error::GatewayError;

/// Opaque access to an append-only, schema-typed data ledger.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Address of the signing identity bound to this gateway, if any.
    fn publisher(&self) -> Option<Address>;

    async fn is_schema_registered(&self, schema_id: &SchemaId) -> Result<bool, GatewayError>;

    /// Register a schema. `Ok(None)` means the ledger skipped the write.
    async fn register_schema(
        &self,
        schema_id: &SchemaId,
        definition: &str,
        parent: &SchemaId,
    ) -> Result<Option<TxHash>, GatewayError>;

    /// Append a payload under `id`. `Ok(None)` means nothing was written.
    async fn publish_data(
        &self,
        id: &DataId,
        schema_id: &SchemaId,
        payload: Bytes,
    ) -> Result<Option<TxHash>, GatewayError>;

    /// Block until the write behind `tx` is final.
    async fn wait_for_confirmation(&self, tx: &TxHash) -> Result<(), GatewayError>;

    /// Every row currently visible for a schema and publisher, in ledger
    /// order. Each row lists fields in schema order.
    async fn get_all_data_for_schema(
        &self,
        schema_id: &SchemaId,
        publisher: &Address,
    ) -> Result<Vec<Vec<RowField>>, GatewayError>;
}
