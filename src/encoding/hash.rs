//! # Key Hashing
//!
//! Object keys are indexed by a 32-bit djb2 hash. The hash is stored in node
//! hash slots and persists with the arena, so the function can never change.
//! Hash equality does not imply key equality; the B-tree operations resolve
//! collisions by comparing the stored key bytes.

/// Stable djb2 over the key bytes: `h = h * 33 + c` starting from 5381,
/// wrapping modulo 2^32.
#[inline]
pub fn djb2(key: &str) -> u32 {
    let mut hash: u32 = 5381;
    for &c in key.as_bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(c as u32);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_seed() {
        assert_eq!(djb2(""), 5381);
    }

    #[test]
    fn known_values() {
        assert_eq!(djb2("a"), 5381 * 33 + 97);
        assert_eq!(djb2("foo"), 193_491_849);
    }

    #[test]
    fn wraps_instead_of_overflowing() {
        let long = "x".repeat(1024);
        let _ = djb2(&long);
    }

    #[test]
    fn two_byte_collision() {
        // 'b'*33 + '0' == 'a'*33 + 'Q'
        assert_eq!(djb2("b0"), djb2("aQ"));
        assert_ne!("b0", "aQ");
    }
}
