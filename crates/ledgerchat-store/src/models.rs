//! Records persisted in the room registry file.
//!
//! Field names serialise camelCase to match the HTTP surface.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named room bound to the schema its messages conform to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    /// Unique key, already trimmed and sanitised.
    pub room_name: String,
    /// `0x` + 64 hex chars.
    pub schema_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Set once, on first registration.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every create-or-update.
    pub updated_at: DateTime<Utc>,
}

/// Body of a create-or-update call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub schema_id: String,
    #[serde(default)]
    pub owner_address: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// On-disk shape of the registry: room name to record.
pub type RoomMap = BTreeMap<String, ChatRoom>;
