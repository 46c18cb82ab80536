//! # Encoding Module
//!
//! Byte-level encodings shared by the arena and the JSON codec:
//!
//! - [`hash`]: stable djb2 key hashing; the hash doubles as the B-tree
//!   search key, so it is part of the wire format.
//! - [`key`]: variable-width key tags for object entries (1-3 bytes, length
//!   in the high bits, tag width in the low two bits).
//! - [`hex`]: lowercase hex for the Bytes <-> JSON string mapping.

pub mod hash;
pub mod hex;
pub mod key;
