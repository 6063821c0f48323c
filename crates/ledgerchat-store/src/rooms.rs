//! Validated create/get/list operations over the [`RoomStore`].
//!
//! Upserts are a plain read-modify-write against the file. Two concurrent
//! updates of the same room name can lose one of the writes; room creation
//! is human-initiated and rare, so this is left unguarded.

use chrono::{DateTime, Utc};
use tracing::info;

use ledgerchat_shared::constants::ROOM_NAME_MAX;
use ledgerchat_shared::types::SchemaId;

use crate::error::{Result, StoreError};
use crate::models::{ChatRoom, CreateRoom};
use crate::store::RoomStore;

/// Trim, then strip angle brackets.
pub fn sanitize_room_name(raw: &str) -> String {
    raw.trim().replace(['<', '>'], "")
}

/// Validate a raw room name and return its sanitised form.
pub fn validate_room_name(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation(
            "Room name is required and must be a non-empty string".into(),
        ));
    }
    if trimmed.chars().count() > ROOM_NAME_MAX {
        return Err(StoreError::Validation(format!(
            "Room name cannot exceed {ROOM_NAME_MAX} characters"
        )));
    }
    let name = sanitize_room_name(trimmed);
    if name.trim().is_empty() {
        return Err(StoreError::Validation(
            "Room name must contain more than angle brackets".into(),
        ));
    }
    Ok(name)
}

/// Schema ids must be exactly `0x` followed by 64 hex chars.
pub fn validate_schema_id(raw: &str) -> Result<()> {
    if raw.len() != 66 || !raw.starts_with("0x") || SchemaId::parse(raw).is_err() {
        return Err(StoreError::Validation(
            "Invalid schemaId format. Must be 0x followed by 64 hex characters".into(),
        ));
    }
    Ok(())
}

/// The room registry service.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    store: RoomStore,
}

impl RoomRegistry {
    pub fn new(store: RoomStore) -> Self {
        Self { store }
    }

    /// Register a room, or update the mutable fields of an existing one.
    pub async fn create_or_update(&self, req: CreateRoom) -> Result<ChatRoom> {
        self.create_or_update_at(req, Utc::now()).await
    }

    /// As [`Self::create_or_update`], with an explicit clock reading.
    pub async fn create_or_update_at(
        &self,
        req: CreateRoom,
        now: DateTime<Utc>,
    ) -> Result<ChatRoom> {
        let room_name = validate_room_name(&req.room_name)?;
        validate_schema_id(&req.schema_id)?;

        let mut rooms = self.store.read().await;
        let existing = rooms.get(&room_name);

        let room = ChatRoom {
            room_name: room_name.clone(),
            schema_id: req.schema_id,
            owner_address: req
                .owner_address
                .or_else(|| existing.and_then(|r| r.owner_address.clone())),
            metadata: req
                .metadata
                .or_else(|| existing.and_then(|r| r.metadata.clone())),
            created_at: existing.map_or(now, |r| r.created_at),
            updated_at: now,
        };
        let created = existing.is_none();

        rooms.insert(room_name.clone(), room.clone());
        self.store.write(&rooms).await?;

        info!(
            room = %room_name,
            schema = %room.schema_id,
            created,
            "Room registered"
        );
        Ok(room)
    }

    pub async fn get(&self, room_name: &str) -> Result<ChatRoom> {
        let name = validate_room_name(room_name)?;
        self.store
            .read()
            .await
            .remove(&name)
            .ok_or(StoreError::NotFound(name))
    }

    /// All rooms, most recently updated first.
    pub async fn list(&self) -> Vec<ChatRoom> {
        let mut rooms: Vec<ChatRoom> = self.store.read().await.into_values().collect();
        rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        rooms
    }
}
