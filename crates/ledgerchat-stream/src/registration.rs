//! Per-room schema registration gate.
//!
//! Entering a room or publishing to it must not proceed before the room's
//! schema is known to the ledger. The gate tracks `(room, schema)` pairs
//! through `Unregistered -> Registering -> Registered` and serialises
//! attempts so two callers using the same room do not both hit the ledger.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use tracing::{debug, error};

use ledgerchat_shared::types::{SchemaId, TxHash};

use crate::error::StreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registering,
    Registered,
}

#[derive(Debug, Default)]
pub struct SchemaGate {
    states: Mutex<HashMap<(String, SchemaId), RegistrationState>>,
    serial: tokio::sync::Mutex<()>,
}

impl SchemaGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, room_id: &str, schema_id: &SchemaId) -> RegistrationState {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(room_id.to_string(), *schema_id))
            .copied()
            .unwrap_or(RegistrationState::Unregistered)
    }

    fn set(&self, room_id: &str, schema_id: &SchemaId, state: RegistrationState) {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((room_id.to_string(), *schema_id), state);
    }

    /// Run `register` unless the pair is already registered.
    ///
    /// A failed registration is logged and the pair is still marked
    /// registered, so the room stays usable against a flaky ledger. With
    /// `strict` set the pair falls back to `Unregistered` and the error is
    /// returned instead.
    pub async fn ensure<F, Fut>(
        &self,
        room_id: &str,
        schema_id: &SchemaId,
        strict: bool,
        register: F,
    ) -> Result<RegistrationState, StreamError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<TxHash>, StreamError>>,
    {
        if self.state(room_id, schema_id) == RegistrationState::Registered {
            return Ok(RegistrationState::Registered);
        }

        let _guard = self.serial.lock().await;
        if self.state(room_id, schema_id) == RegistrationState::Registered {
            return Ok(RegistrationState::Registered);
        }

        self.set(room_id, schema_id, RegistrationState::Registering);
        match register().await {
            Ok(tx) => {
                debug!(room = room_id, schema = %schema_id, tx = ?tx, "Schema ready");
            }
            Err(e) if strict => {
                self.set(room_id, schema_id, RegistrationState::Unregistered);
                return Err(e);
            }
            Err(e) => {
                error!(
                    room = room_id,
                    schema = %schema_id,
                    error = %e,
                    "Schema registration failed, continuing as registered"
                );
            }
        }
        self.set(room_id, schema_id, RegistrationState::Registered);
        Ok(RegistrationState::Registered)
    }
}
