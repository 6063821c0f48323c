use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid 32-byte identifier: {0}")]
    InvalidHash32(String),

    #[error("Invalid room id: {0}")]
    InvalidRoomId(String),

    #[error("Invalid key bytes")]
    InvalidKeyBytes,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed schema definition: {0}")]
    MalformedSchema(String),

    #[error("Unsupported schema type: {0}")]
    UnsupportedType(String),

    #[error("Field {index} does not match schema: expected `{expected}`, got `{actual}`")]
    FieldMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("Expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("Cannot coerce `{value}` to {kind} for field `{field}`")]
    Coercion {
        field: String,
        kind: String,
        value: String,
    },

    #[error("Payload truncated at byte {0}")]
    Truncated(usize),

    #[error("String field `{0}` is not valid UTF-8")]
    InvalidUtf8(String),
}
