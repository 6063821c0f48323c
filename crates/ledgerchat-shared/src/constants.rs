/// Schema string every chat payload conforms to, in wire field order.
pub const CHAT_SCHEMA: &str =
    "uint64 timestamp,bytes32 roomId,string content,string senderName,address sender";

/// Width of a single ABI word and of a `bytes32` slot.
pub const WORD_SIZE: usize = 32;

/// Account identifier size in bytes
pub const ADDRESS_SIZE: usize = 20;

/// Room names are capped at this many characters after sanitising.
pub const ROOM_NAME_MAX: usize = 100;

/// Default poll cadence for stream subscriptions (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Delay before the first poll of a fresh subscription (milliseconds)
pub const INITIAL_POLL_DELAY_MS: u64 = 1_000;

/// Upper bound on waiting for a ledger write to be confirmed (seconds)
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 30;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 3001;

/// Key derivation context for ledger addresses (BLAKE3)
pub const KDF_CONTEXT_ADDRESS: &str = "ledgerchat-address-v1";
