//! Lowercase hex for the Bytes <-> JSON string mapping. Decoding doubles as
//! the sniffing rule: a string is Bytes if and only if `try_decode` accepts
//! it (even length, all `[0-9a-fA-F]`).

/// Encodes bytes as lowercase hex.
pub fn encode(bytes: &[u8]) -> String {
    ::hex::encode(bytes)
}

/// Decodes a hex string, or `None` when the input is not valid hex.
pub fn try_decode(s: &str) -> Option<Vec<u8>> {
    ::hex::decode(s).ok()
}
