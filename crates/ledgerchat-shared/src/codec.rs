//! Schema-typed payload codec.
//!
//! Chat messages are stored on the ledger as word-aligned payloads that
//! follow a schema string such as
//! `uint64 timestamp,bytes32 roomId,string content,string senderName,address sender`.
//! Every field takes one 32-byte head word. Static values sit in the head
//! directly. Strings store an offset there and are appended as a
//! length-prefixed, zero-padded tail.
//!
//! Reads come back from the ledger gateway as rows of [`RowField`], whose
//! value may be flat or wrapped one level deep; [`RowField::scalar`]
//! accepts both.

use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::WORD_SIZE;
use crate::error::CodecError;
use crate::types::{Address, DataId, Message, Sender};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A primitive type a schema field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned integer of the given bit width. Values are limited to 64 bits.
    Uint(u16),
    Bytes32,
    String,
    Address,
    Bool,
}

impl FieldKind {
    fn is_dynamic(self) -> bool {
        matches!(self, FieldKind::String)
    }
}

impl FromStr for FieldKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bytes32" => Ok(FieldKind::Bytes32),
            "string" => Ok(FieldKind::String),
            "address" => Ok(FieldKind::Address),
            "bool" => Ok(FieldKind::Bool),
            "uint" => Ok(FieldKind::Uint(256)),
            other => {
                let bits = other
                    .strip_prefix("uint")
                    .and_then(|b| b.parse::<u16>().ok())
                    .filter(|b| *b > 0 && *b <= 256 && b % 8 == 0)
                    .ok_or_else(|| CodecError::UnsupportedType(other.to_string()))?;
                Ok(FieldKind::Uint(bits))
            }
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Uint(bits) => write!(f, "uint{bits}"),
            FieldKind::Bytes32 => f.write_str("bytes32"),
            FieldKind::String => f.write_str("string"),
            FieldKind::Address => f.write_str("address"),
            FieldKind::Bool => f.write_str("bool"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub kind: FieldKind,
}

/// An ordered list of typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    /// Parse a comma-separated `type name` list.
    pub fn parse(definition: &str) -> Result<Self, CodecError> {
        let mut fields = Vec::new();
        for part in definition.split(',') {
            let mut tokens = part.split_whitespace();
            let (Some(kind), Some(name), None) = (tokens.next(), tokens.next(), tokens.next())
            else {
                return Err(CodecError::MalformedSchema(format!(
                    "expected `type name`, got `{}`",
                    part.trim()
                )));
            };
            fields.push(SchemaField {
                name: name.to_string(),
                kind: kind.parse()?,
            });
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Canonical definition string, as registered with the ledger.
    pub fn definition(&self) -> String {
        self.fields
            .iter()
            .map(|f| format!("{} {}", f.kind, f.name))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for Schema {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// One `{name, value, type}` entry handed to [`SchemaEncoder::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaItem {
    pub name: String,
    pub value: String,
    pub kind: String,
}

impl SchemaItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: kind.into(),
        }
    }
}

/// A decoded field as returned by the ledger gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: FieldValue,
}

/// Gateways disagree on whether the scalar sits at `field.value` or at
/// `field.value.value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Nested { value: Value },
    Flat(Value),
}

impl RowField {
    pub fn flat(name: impl Into<String>, kind: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            value: FieldValue::Flat(value),
        }
    }

    pub fn nested(name: impl Into<String>, kind: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            value: FieldValue::Nested { value },
        }
    }

    pub fn scalar(&self) -> &Value {
        match &self.value {
            FieldValue::Nested { value } => value,
            FieldValue::Flat(value) => value,
        }
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => parse_uint(s),
        _ => None,
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_uint(s: &str) -> Option<u64> {
    let s = s.trim();
    match s.strip_prefix("0x") {
        Some(hex_digits) => u64::from_str_radix(hex_digits, 16).ok(),
        None => s.parse().ok(),
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Encodes and decodes payloads for one schema.
#[derive(Debug, Clone)]
pub struct SchemaEncoder {
    schema: Schema,
}

impl SchemaEncoder {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Encode an ordered field list. Names and types must follow the schema.
    pub fn encode(&self, items: &[SchemaItem]) -> Result<Bytes, CodecError> {
        let fields = self.schema.fields();
        if items.len() != fields.len() {
            return Err(CodecError::FieldCount {
                expected: fields.len(),
                actual: items.len(),
            });
        }

        let head_len = fields.len() * WORD_SIZE;
        let mut head = BytesMut::with_capacity(head_len);
        let mut tail = BytesMut::new();

        for (index, (field, item)) in fields.iter().zip(items).enumerate() {
            let declared = field.kind.to_string();
            if item.name != field.name || item.kind != declared {
                return Err(CodecError::FieldMismatch {
                    index,
                    expected: format!("{declared} {}", field.name),
                    actual: format!("{} {}", item.kind, item.name),
                });
            }

            if field.kind.is_dynamic() {
                head.put_slice(&uint_word((head_len + tail.len()) as u64));
                let data = item.value.as_bytes();
                tail.put_slice(&uint_word(data.len() as u64));
                tail.put_slice(data);
                tail.put_bytes(0, padding(data.len()));
            } else {
                head.put_slice(&static_word(field, &item.value)?);
            }
        }

        head.unsplit(tail);
        Ok(head.freeze())
    }

    /// Decode a payload into rows of flat fields, in schema order.
    pub fn decode(&self, payload: &[u8]) -> Result<Vec<RowField>, CodecError> {
        let mut row = Vec::with_capacity(self.schema.fields().len());

        for (index, field) in self.schema.fields().iter().enumerate() {
            let word = read_word(payload, index * WORD_SIZE)?;
            let value = match field.kind {
                FieldKind::Uint(_) => Value::from(word_to_u64(word, &field.name)?),
                FieldKind::Bool => Value::Bool(word[WORD_SIZE - 1] != 0),
                FieldKind::Bytes32 => Value::String(format!("0x{}", hex::encode(word))),
                FieldKind::Address => {
                    let mut addr = [0u8; 20];
                    addr.copy_from_slice(&word[12..]);
                    Value::String(Address::from_bytes(addr).to_string())
                }
                FieldKind::String => {
                    let offset = word_to_u64(word, &field.name)? as usize;
                    let len = word_to_u64(read_word(payload, offset)?, &field.name)? as usize;
                    let start = offset + WORD_SIZE;
                    let data = payload
                        .get(start..start.saturating_add(len))
                        .ok_or(CodecError::Truncated(start))?;
                    let text = std::str::from_utf8(data)
                        .map_err(|_| CodecError::InvalidUtf8(field.name.clone()))?;
                    Value::String(text.to_string())
                }
            };
            row.push(RowField::flat(&field.name, field.kind.to_string(), value));
        }

        Ok(row)
    }
}

fn padding(len: usize) -> usize {
    (WORD_SIZE - len % WORD_SIZE) % WORD_SIZE
}

fn uint_word(n: u64) -> [u8; WORD_SIZE] {
    let mut word = [0u8; WORD_SIZE];
    word[WORD_SIZE - 8..].copy_from_slice(&n.to_be_bytes());
    word
}

fn read_word(payload: &[u8], at: usize) -> Result<&[u8; WORD_SIZE], CodecError> {
    payload
        .get(at..at.saturating_add(WORD_SIZE))
        .and_then(|w| w.try_into().ok())
        .ok_or(CodecError::Truncated(at))
}

fn word_to_u64(word: &[u8; WORD_SIZE], field: &str) -> Result<u64, CodecError> {
    if word[..WORD_SIZE - 8].iter().any(|b| *b != 0) {
        return Err(CodecError::Coercion {
            field: field.to_string(),
            kind: "uint64".into(),
            value: format!("0x{}", hex::encode(word)),
        });
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD_SIZE - 8..]);
    Ok(u64::from_be_bytes(tail))
}

fn static_word(field: &SchemaField, value: &str) -> Result<[u8; WORD_SIZE], CodecError> {
    let coercion = || CodecError::Coercion {
        field: field.name.clone(),
        kind: field.kind.to_string(),
        value: value.to_string(),
    };

    match field.kind {
        FieldKind::Uint(bits) => {
            let n = parse_uint(value).ok_or_else(coercion)?;
            if bits < 64 && n >> bits != 0 {
                return Err(coercion());
            }
            Ok(uint_word(n))
        }
        FieldKind::Bool => match value {
            "true" | "1" => Ok(uint_word(1)),
            "false" | "0" => Ok(uint_word(0)),
            _ => Err(coercion()),
        },
        FieldKind::Bytes32 => {
            let digits = value.strip_prefix("0x").ok_or_else(coercion)?;
            let bytes = hex::decode(digits).map_err(|_| coercion())?;
            bytes.try_into().map_err(|_| coercion())
        }
        FieldKind::Address => {
            let addr = Address::parse(value).map_err(|_| coercion())?;
            let mut word = [0u8; WORD_SIZE];
            word[12..].copy_from_slice(&addr.to_bytes());
            Ok(word)
        }
        FieldKind::String => Err(coercion()),
    }
}

// ---------------------------------------------------------------------------
// Room ids and message ids
// ---------------------------------------------------------------------------

/// Right-pad the UTF-8 bytes of a room id into a `bytes32` slot.
///
/// Room filtering compares these slots, so reads must pad the same way.
pub fn room_id_to_bytes(room_id: &str) -> Result<[u8; WORD_SIZE], CodecError> {
    let raw = room_id.as_bytes();
    if raw.len() > WORD_SIZE {
        return Err(CodecError::Coercion {
            field: "roomId".into(),
            kind: "bytes32".into(),
            value: room_id.to_string(),
        });
    }
    let mut slot = [0u8; WORD_SIZE];
    slot[..raw.len()].copy_from_slice(raw);
    Ok(slot)
}

/// Inverse of [`room_id_to_bytes`]. Non-UTF-8 slots render as hex.
pub fn bytes32_to_room_id(slot: &[u8; WORD_SIZE]) -> String {
    let end = slot.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    match std::str::from_utf8(&slot[..end]) {
        Ok(s) => s.to_string(),
        Err(_) => format!("0x{}", hex::encode(slot)),
    }
}

/// Ledger-side idempotency key for a publish.
pub fn derive_message_id(room_id: &str, sender_name: &str, timestamp: u64) -> DataId {
    let unique = format!("{room_id}-{sender_name}-{timestamp}");
    DataId(*blake3::hash(unique.as_bytes()).as_bytes())
}

/// Display id used for client-side dedup. Unlike [`derive_message_id`] it
/// covers the content.
pub fn display_message_id(timestamp: u64, sender_name: &str, content: &str) -> String {
    format!("{timestamp}-{sender_name}-{content}")
}

// ---------------------------------------------------------------------------
// Chat codec
// ---------------------------------------------------------------------------

/// Fields of a message about to be published.
#[derive(Debug, Clone, Copy)]
pub struct OutgoingMessage<'a> {
    pub timestamp: u64,
    pub room_id: &'a str,
    pub content: &'a str,
    pub sender_name: &'a str,
    pub sender: &'a Address,
}

/// A chat row decoded from the ledger, before self/other attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub timestamp: u64,
    pub room_slot: [u8; WORD_SIZE],
    pub content: String,
    pub sender_name: String,
    pub sender_address: String,
}

impl DecodedMessage {
    pub fn id(&self) -> String {
        display_message_id(self.timestamp, &self.sender_name, &self.content)
    }

    pub fn into_message(self, sender: Sender) -> Message {
        Message {
            id: self.id(),
            room_id: bytes32_to_room_id(&self.room_slot),
            text: self.content,
            sender,
            timestamp: self.timestamp,
            sender_name: self.sender_name,
            sender_address: self.sender_address,
        }
    }
}

const CHAT_KINDS: [FieldKind; 5] = [
    FieldKind::Uint(64),
    FieldKind::Bytes32,
    FieldKind::String,
    FieldKind::String,
    FieldKind::Address,
];

/// The codec bound to the five-field chat schema.
#[derive(Debug, Clone)]
pub struct ChatCodec {
    encoder: SchemaEncoder,
}

impl ChatCodec {
    /// Bind to a configured schema string. Field names are free, but the
    /// types must follow the chat layout.
    pub fn new(definition: &str) -> Result<Self, CodecError> {
        let schema = Schema::parse(definition)?;
        let fields = schema.fields();
        if fields.len() != CHAT_KINDS.len() {
            return Err(CodecError::FieldCount {
                expected: CHAT_KINDS.len(),
                actual: fields.len(),
            });
        }
        for (index, (field, kind)) in fields.iter().zip(CHAT_KINDS).enumerate() {
            let compatible = match (field.kind, kind) {
                (FieldKind::Uint(bits), FieldKind::Uint(_)) => bits >= 64,
                (a, b) => a == b,
            };
            if !compatible {
                return Err(CodecError::FieldMismatch {
                    index,
                    expected: kind.to_string(),
                    actual: field.kind.to_string(),
                });
            }
        }
        Ok(Self {
            encoder: SchemaEncoder::new(schema),
        })
    }

    /// The stock chat schema.
    pub fn standard() -> Self {
        let names = ["timestamp", "roomId", "content", "senderName", "sender"];
        let fields = names
            .iter()
            .zip(CHAT_KINDS)
            .map(|(name, kind)| SchemaField {
                name: name.to_string(),
                kind,
            })
            .collect();
        Self {
            encoder: SchemaEncoder::new(Schema { fields }),
        }
    }

    pub fn schema(&self) -> &Schema {
        self.encoder.schema()
    }

    pub fn encoder(&self) -> &SchemaEncoder {
        &self.encoder
    }

    /// Build the schema-ordered field list for a message.
    pub fn fields_for(&self, msg: &OutgoingMessage<'_>) -> Result<Vec<SchemaItem>, CodecError> {
        let slot = room_id_to_bytes(msg.room_id)?;
        let values = [
            msg.timestamp.to_string(),
            format!("0x{}", hex::encode(slot)),
            msg.content.to_string(),
            msg.sender_name.to_string(),
            msg.sender.to_string(),
        ];
        Ok(self
            .schema()
            .fields()
            .iter()
            .zip(values)
            .map(|(field, value)| SchemaItem::new(&field.name, value, field.kind.to_string()))
            .collect())
    }

    pub fn encode_message(&self, msg: &OutgoingMessage<'_>) -> Result<Bytes, CodecError> {
        self.encoder.encode(&self.fields_for(msg)?)
    }

    /// Decode one gateway row. Short or non-coercible rows yield `None`.
    pub fn decode_row(&self, row: &[RowField]) -> Option<DecodedMessage> {
        if row.len() < CHAT_KINDS.len() {
            return None;
        }
        let timestamp = value_as_u64(row[0].scalar())?;
        let room_slot = match row[1].scalar() {
            Value::String(s) => parse_room_slot(s)?,
            _ => return None,
        };
        Some(DecodedMessage {
            timestamp,
            room_slot,
            content: value_as_text(row[2].scalar()),
            sender_name: value_as_text(row[3].scalar()),
            sender_address: value_as_text(row[4].scalar()),
        })
    }
}

impl Default for ChatCodec {
    fn default() -> Self {
        Self::standard()
    }
}

/// Accept a hex `bytes32` slot, or a bare room string some gateways return.
fn parse_room_slot(s: &str) -> Option<[u8; WORD_SIZE]> {
    if let Some(digits) = s.strip_prefix("0x") {
        if let Ok(bytes) = hex::decode(digits) {
            if let Ok(slot) = <[u8; WORD_SIZE]>::try_from(bytes) {
                return Some(slot);
            }
        }
    }
    room_id_to_bytes(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CHAT_SCHEMA;

    fn alice() -> Address {
        Address::parse("0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA").unwrap()
    }

    #[test]
    fn test_parse_chat_schema() {
        let schema = Schema::parse(CHAT_SCHEMA).unwrap();
        assert_eq!(schema.fields().len(), 5);
        assert_eq!(schema.fields()[0].kind, FieldKind::Uint(64));
        assert_eq!(schema.fields()[4].name, "sender");
        assert_eq!(schema.definition(), CHAT_SCHEMA);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(matches!(
            Schema::parse("uint64 ts,float32 x"),
            Err(CodecError::UnsupportedType(_))
        ));
        assert!(matches!(
            Schema::parse("uint64"),
            Err(CodecError::MalformedSchema(_))
        ));
    }

    #[test]
    fn test_standard_matches_parsed() {
        let parsed = ChatCodec::new(CHAT_SCHEMA).unwrap();
        assert_eq!(parsed.schema(), ChatCodec::standard().schema());
    }

    #[test]
    fn test_chat_codec_rejects_wrong_layout() {
        assert!(ChatCodec::new("uint64 timestamp,string roomId").is_err());
        assert!(ChatCodec::new(
            "uint64 timestamp,string roomId,string content,string senderName,address sender"
        )
        .is_err());
    }

    #[test]
    fn test_encode_layout() {
        let codec = ChatCodec::standard();
        let sender = alice();
        let payload = codec
            .encode_message(&OutgoingMessage {
                timestamp: 42,
                room_id: "general",
                content: "hi",
                sender_name: "alice",
                sender: &sender,
            })
            .unwrap();

        // 5 head words + (len + data) for each of the two strings.
        assert_eq!(payload.len(), 5 * 32 + 2 * 64);
        assert_eq!(payload[31], 42);
        assert_eq!(&payload[32..39], b"general");
        assert!(payload[39..64].iter().all(|b| *b == 0));
        // First string tail starts right after the head.
        assert_eq!(payload[95], 160);
    }

    #[test]
    fn test_decode_recovers_message() {
        let codec = ChatCodec::standard();
        let sender = alice();
        let payload = codec
            .encode_message(&OutgoingMessage {
                timestamp: 1_700_000_000_000,
                room_id: "general",
                content: "a message long enough to span more than one word of tail data",
                sender_name: "alice",
                sender: &sender,
            })
            .unwrap();

        let row = codec.encoder().decode(&payload).unwrap();
        let decoded = codec.decode_row(&row).unwrap();
        assert_eq!(decoded.timestamp, 1_700_000_000_000);
        assert_eq!(decoded.room_slot, room_id_to_bytes("general").unwrap());
        assert_eq!(decoded.sender_name, "alice");
        assert!(sender.eq_ignore_case(&decoded.sender_address));

        let msg = decoded.into_message(Sender::Other);
        assert_eq!(msg.room_id, "general");
        assert_eq!(
            msg.id,
            "1700000000000-alice-a message long enough to span more than one word of tail data"
        );
    }

    #[test]
    fn test_encode_coercion_failure() {
        let encoder = SchemaEncoder::new(Schema::parse("uint8 n,address who").unwrap());
        let err = encoder
            .encode(&[
                SchemaItem::new("n", "300", "uint8"),
                SchemaItem::new("who", "0x00", "address"),
            ])
            .unwrap_err();
        assert!(matches!(err, CodecError::Coercion { ref field, .. } if field == "n"));

        let err = encoder
            .encode(&[
                SchemaItem::new("n", "3", "uint8"),
                SchemaItem::new("who", "nobody", "address"),
            ])
            .unwrap_err();
        assert!(matches!(err, CodecError::Coercion { ref field, .. } if field == "who"));
    }

    #[test]
    fn test_encode_field_order_enforced() {
        let encoder = SchemaEncoder::new(Schema::parse("uint64 a,string b").unwrap());
        let err = encoder
            .encode(&[
                SchemaItem::new("b", "x", "string"),
                SchemaItem::new("a", "1", "uint64"),
            ])
            .unwrap_err();
        assert!(matches!(err, CodecError::FieldMismatch { index: 0, .. }));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let codec = ChatCodec::standard();
        assert!(matches!(
            codec.encoder().decode(&[0u8; 40]),
            Err(CodecError::Truncated(_))
        ));
    }

    #[test]
    fn test_room_padding() {
        let slot = room_id_to_bytes("general").unwrap();
        assert_eq!(&slot[..7], b"general");
        assert!(slot[7..].iter().all(|b| *b == 0));
        assert_eq!(bytes32_to_room_id(&slot), "general");
        assert_ne!(slot, room_id_to_bytes("general2").unwrap());
        assert!(room_id_to_bytes(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_nested_and_flat_values() {
        let codec = ChatCodec::standard();
        let slot = format!("0x{}", hex::encode(room_id_to_bytes("general").unwrap()));
        let flat = vec![
            RowField::flat("timestamp", "uint64", Value::from(5u64)),
            RowField::flat("roomId", "bytes32", Value::String(slot.clone())),
            RowField::flat("content", "string", Value::from("hi")),
            RowField::flat("senderName", "string", Value::from("bob")),
            RowField::flat("sender", "address", Value::from("0xbb")),
        ];
        let nested = vec![
            RowField::nested("timestamp", "uint64", Value::from("5")),
            RowField::nested("roomId", "bytes32", Value::String(slot)),
            RowField::nested("content", "string", Value::from("hi")),
            RowField::nested("senderName", "string", Value::from("bob")),
            RowField::nested("sender", "address", Value::from("0xbb")),
        ];
        assert_eq!(codec.decode_row(&flat), codec.decode_row(&nested));
        assert!(codec.decode_row(&flat).is_some());
    }

    #[test]
    fn test_nested_shape_from_json() {
        let json = serde_json::json!({
            "name": "content",
            "type": "string",
            "value": { "name": "content", "type": "string", "value": "hello" }
        });
        let field: RowField = serde_json::from_value(json).unwrap();
        assert_eq!(field.scalar(), &Value::from("hello"));

        let json = serde_json::json!({ "name": "content", "type": "string", "value": "hello" });
        let field: RowField = serde_json::from_value(json).unwrap();
        assert_eq!(field.scalar(), &Value::from("hello"));
    }

    #[test]
    fn test_short_row_is_skipped() {
        let codec = ChatCodec::standard();
        let row = vec![RowField::flat("timestamp", "uint64", Value::from(1u64))];
        assert!(codec.decode_row(&row).is_none());
    }

    #[test]
    fn test_message_ids() {
        let a = derive_message_id("general", "alice", 1);
        assert_eq!(a, derive_message_id("general", "alice", 1));
        assert_ne!(a, derive_message_id("random", "alice", 1));
        assert_eq!(display_message_id(1, "alice", "hi"), "1-alice-hi");
    }
}
