//! Process-local ledger.
//!
//! Keeps registered schemas and per-(schema, publisher) append-only records
//! in memory. Writes are final as soon as they are accepted, payloads are
//! signed by the publishing identity and checked again on read, and reads
//! return fields in the nested `{ value: { value } }` shape.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use ed25519_dalek::{Signature, VerifyingKey};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use ledgerchat_shared::codec::{RowField, Schema, SchemaEncoder};
use ledgerchat_shared::identity::{verify_signature, PublisherIdentity};
use ledgerchat_shared::types::{Address, DataId, SchemaId, TxHash};

use crate::error::GatewayError;
use crate::gateway::LedgerGateway;

#[derive(Debug, Clone)]
struct Record {
    id: DataId,
    payload: Bytes,
    signer: VerifyingKey,
    signature: Signature,
}

#[derive(Debug, Default)]
struct LedgerState {
    schemas: HashMap<SchemaId, SchemaEncoder>,
    streams: HashMap<(SchemaId, Address), Vec<Record>>,
    confirmed: HashSet<TxHash>,
    nonce: u64,
}

impl LedgerState {
    fn next_tx(&mut self, kind: &str, subject: &[u8]) -> TxHash {
        self.nonce += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.nonce.to_be_bytes());
        hasher.update(kind.as_bytes());
        hasher.update(subject);
        let tx = TxHash(*hasher.finalize().as_bytes());
        self.confirmed.insert(tx);
        tx
    }
}

/// Shared ledger state. Cloning yields another handle to the same ledger.
#[derive(Debug, Clone, Default)]
pub struct LocalLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl LocalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway handle writing as `signer`. Without a signer the handle is
    /// read-only.
    pub fn gateway(&self, signer: Option<PublisherIdentity>) -> LocalGateway {
        LocalGateway {
            ledger: self.clone(),
            publisher: signer.as_ref().map(PublisherIdentity::address),
            signer,
        }
    }

    /// Number of records stored for a schema and publisher.
    pub async fn record_count(&self, schema_id: &SchemaId, publisher: &Address) -> usize {
        self.state
            .read()
            .await
            .streams
            .get(&(*schema_id, publisher.clone()))
            .map_or(0, Vec::len)
    }
}

/// [`LedgerGateway`] over a [`LocalLedger`].
#[derive(Debug, Clone)]
pub struct LocalGateway {
    ledger: LocalLedger,
    signer: Option<PublisherIdentity>,
    publisher: Option<Address>,
}

#[async_trait]
impl LedgerGateway for LocalGateway {
    fn publisher(&self) -> Option<Address> {
        self.publisher.clone()
    }

    async fn is_schema_registered(&self, schema_id: &SchemaId) -> Result<bool, GatewayError> {
        Ok(self.ledger.state.read().await.schemas.contains_key(schema_id))
    }

    async fn register_schema(
        &self,
        schema_id: &SchemaId,
        definition: &str,
        parent: &SchemaId,
    ) -> Result<Option<TxHash>, GatewayError> {
        if self.signer.is_none() {
            return Err(GatewayError::NoSigner);
        }
        let schema = Schema::parse(definition)
            .map_err(|e| GatewayError::Rejected(format!("invalid schema: {e}")))?;

        let mut state = self.ledger.state.write().await;
        if *parent != SchemaId::ZERO && !state.schemas.contains_key(parent) {
            return Err(GatewayError::UnknownSchema(*parent));
        }
        if state.schemas.contains_key(schema_id) {
            return Err(GatewayError::AlreadyRegistered(*schema_id));
        }
        state.schemas.insert(*schema_id, SchemaEncoder::new(schema));
        let tx = state.next_tx("register", &schema_id.0);

        info!(schema = %schema_id, "Schema registered on local ledger");
        Ok(Some(tx))
    }

    async fn publish_data(
        &self,
        id: &DataId,
        schema_id: &SchemaId,
        payload: Bytes,
    ) -> Result<Option<TxHash>, GatewayError> {
        let signer = self.signer.as_ref().ok_or(GatewayError::NoSigner)?;
        let publisher = signer.address();

        let mut state = self.ledger.state.write().await;
        let encoder = state
            .schemas
            .get(schema_id)
            .ok_or(GatewayError::UnknownSchema(*schema_id))?;
        encoder
            .decode(&payload)
            .map_err(|e| GatewayError::Rejected(format!("payload does not match schema: {e}")))?;

        let record = Record {
            id: *id,
            signature: signer.sign(&payload),
            signer: signer.verifying_key(),
            payload,
        };

        let stream = state.streams.entry((*schema_id, publisher)).or_default();
        // The data id is the idempotency key: re-publishing replaces in place.
        match stream.iter_mut().find(|r| r.id == *id) {
            Some(existing) => *existing = record,
            None => stream.push(record),
        }
        let tx = state.next_tx("publish", &id.0);

        debug!(schema = %schema_id, id = %id, "Data published on local ledger");
        Ok(Some(tx))
    }

    async fn wait_for_confirmation(&self, tx: &TxHash) -> Result<(), GatewayError> {
        if self.ledger.state.read().await.confirmed.contains(tx) {
            Ok(())
        } else {
            Err(GatewayError::UnknownTransaction(*tx))
        }
    }

    async fn get_all_data_for_schema(
        &self,
        schema_id: &SchemaId,
        publisher: &Address,
    ) -> Result<Vec<Vec<RowField>>, GatewayError> {
        let state = self.ledger.state.read().await;
        let encoder = state
            .schemas
            .get(schema_id)
            .ok_or(GatewayError::UnknownSchema(*schema_id))?;
        let Some(records) = state.streams.get(&(*schema_id, publisher.clone())) else {
            return Ok(Vec::new());
        };

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            if verify_signature(&record.signer, &record.payload, &record.signature).is_err() {
                warn!(id = %record.id, "Skipping record with invalid signature");
                continue;
            }
            match encoder.decode(&record.payload) {
                Ok(fields) => rows.push(
                    fields
                        .into_iter()
                        .map(|f| {
                            let value = f.scalar().clone();
                            RowField::nested(f.name, f.kind, value)
                        })
                        .collect(),
                ),
                Err(e) => warn!(id = %record.id, error = %e, "Skipping undecodable record"),
            }
        }
        Ok(rows)
    }
}
