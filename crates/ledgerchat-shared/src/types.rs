use serde::{Deserialize, Serialize};

use crate::constants::{ADDRESS_SIZE, WORD_SIZE};
use crate::error::SharedError;

/// Parse `0x`-prefixed hex of an exact byte width.
fn parse_prefixed_hex<const N: usize>(s: &str) -> Option<[u8; N]> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if digits.len() != N * 2 {
        return None;
    }
    let bytes = hex::decode(digits).ok()?;
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Some(arr)
}

// Ledger account identifier: 20 bytes, written as `0x` + 40 hex chars.
// The caller's spelling (checksum casing) is kept for display; comparisons
// go through `eq_ignore_case`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self, SharedError> {
        let s = s.trim();
        parse_prefixed_hex::<ADDRESS_SIZE>(s)
            .map(|_| Self(s.to_string()))
            .ok_or_else(|| SharedError::InvalidAddress(s.to_string()))
    }

    pub fn from_bytes(bytes: [u8; ADDRESS_SIZE]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn to_bytes(&self) -> [u8; ADDRESS_SIZE] {
        // Validated at construction.
        parse_prefixed_hex::<ADDRESS_SIZE>(&self.0).unwrap_or([0u8; ADDRESS_SIZE])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against any address-like string.
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.eq_ignore_case(&other.0)
    }
}

impl Eq for Address {}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = SharedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

macro_rules! hash32_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub [u8; WORD_SIZE]);

        impl $name {
            pub const ZERO: Self = Self([0u8; WORD_SIZE]);

            pub fn parse(s: &str) -> Result<Self, SharedError> {
                parse_prefixed_hex::<WORD_SIZE>(s.trim())
                    .map(Self)
                    .ok_or_else(|| SharedError::InvalidHash32(s.to_string()))
            }

            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl TryFrom<String> for $name {
            type Error = SharedError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.to_hex()
            }
        }
    };
}

hash32_type!(
    /// Identifier of a registered data schema.
    SchemaId
);
hash32_type!(
    /// Ledger-side idempotency key of a published record.
    DataId
);
hash32_type!(
    /// Handle of a ledger write, used to await confirmation.
    TxHash
);

/// Whether a message was written by the current viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    #[serde(rename = "self")]
    Me,
    Other,
}

/// A chat message as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    /// Client-assigned publish time, milliseconds since the epoch.
    pub timestamp: u64,
    pub sender_name: String,
    pub sender_address: String,
    pub room_id: String,
}

/// Room ids travel in a `bytes32` slot, so they must fit in 32 UTF-8 bytes.
pub fn validate_room_id(room_id: &str) -> Result<(), SharedError> {
    if room_id.is_empty() {
        return Err(SharedError::InvalidRoomId("room id is empty".into()));
    }
    if room_id.len() > WORD_SIZE {
        return Err(SharedError::InvalidRoomId(format!(
            "`{room_id}` is {} bytes (max {WORD_SIZE})",
            room_id.len()
        )));
    }
    Ok(())
}
