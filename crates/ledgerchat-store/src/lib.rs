//! # ledgerchat-store
//!
//! Room registry for the ledger chat service.
//!
//! Rooms give the append-only message stream a human-addressable namespace.
//! All rooms live in one JSON file keyed by room name, rewritten with an
//! atomic temp-file-and-rename so readers never observe a partial write.

pub mod models;
pub mod rooms;
pub mod store;

mod error;

pub use error::StoreError;
pub use models::*;
pub use rooms::RoomRegistry;
pub use store::RoomStore;
