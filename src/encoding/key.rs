//! # Key Tag Encoding
//!
//! Every object entry starts with a variable-width tag carrying the stored
//! key length. The stored length counts the key bytes plus the trailing NUL,
//! and the tag width is a function of the key bytes alone, so overwriting a
//! value never requires rewriting the key region.
//!
//! ## Tag Format
//!
//! The low two bits of the first byte give the tag width minus one; the
//! remaining bits of the tag, read little-endian across all tag bytes, give
//! the stored length:
//!
//! | Stored length   | Bytes | First byte                     |
//! |-----------------|-------|--------------------------------|
//! | 1 - 63          | 1     | `(len << 2)`                   |
//! | 64 - 16383      | 2     | `(len << 2) \| 1` (low 8 bits) |
//! | 16384 - 4194303 | 3     | `(len << 2) \| 2` (low 8 bits) |
//!
//! The 1-byte form is the common case and matches the compact `len << 2`
//! short-key tag byte-for-byte.

use eyre::{bail, ensure, Result};

/// Stored key lengths must fit the 22 payload bits of a 3-byte tag.
pub const KEY_STORED_LEN_MAX: usize = (1 << 22) - 1;

/// Tag width in bytes for a key of `key_len` bytes (NUL excluded).
#[inline]
pub fn key_tag_len(key_len: usize) -> usize {
    let stored = key_len + 1;
    if stored < 1 << 6 {
        1
    } else if stored < 1 << 14 {
        2
    } else {
        3
    }
}

/// Writes the tag for a key of `key_len` bytes at the start of `buf` and
/// returns the tag width.
pub fn encode_key_tag(key_len: usize, buf: &mut [u8]) -> Result<usize> {
    let stored = key_len + 1;
    ensure!(
        stored <= KEY_STORED_LEN_MAX,
        "key too long: {} bytes",
        key_len
    );
    let width = key_tag_len(key_len);
    ensure!(buf.len() >= width, "tag buffer too small");

    let tag = ((stored as u32) << 2) | (width as u32 - 1);
    for (i, b) in buf.iter_mut().enumerate().take(width) {
        *b = (tag >> (8 * i)) as u8;
    }
    Ok(width)
}

/// Reads a tag from the start of `buf`, returning `(stored_len, tag_width)`.
/// `stored_len` includes the trailing NUL.
pub fn decode_key_tag(buf: &[u8]) -> Result<(usize, usize)> {
    let Some(&first) = buf.first() else {
        bail!("truncated key tag");
    };
    let width = (first & 0x3) as usize + 1;
    ensure!(buf.len() >= width, "truncated key tag");

    let mut tag: u32 = 0;
    for i in 0..width {
        tag |= (buf[i] as u32) << (8 * i);
    }
    let stored = (tag >> 2) as usize;
    ensure!(stored >= 1, "corrupt key tag: zero stored length");
    Ok((stored, width))
}
