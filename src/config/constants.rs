//! # Layout Constants
//!
//! All sizing and bit-packing constants for the packed node layout. These
//! values ARE the persistence format: an arena built with one set of values
//! cannot be adopted by a build with another.
//!
//! ## Dependency Graph
//!
//! ```text
//! BRANCH_FACTOR (7)
//!       │
//!       ├─> NODE_KEY_COUNT_MIN (derived: BRANCH_FACTOR / 2)
//!       │     The split point: a full node keeps this many keys, promotes
//!       │     the next one, and moves the rest to the new sibling.
//!       │
//!       ├─> NODE_KEY_COUNT_MAX (== BRANCH_FACTOR)
//!       │
//!       └─> NODE_SIZE (96 bytes = 1.5 cache lines)
//!             4 (gen_type) + 7*4 (hashes) + 4 (size_kc)
//!           + 7*4 (kv offsets) + 8*4 (child offsets)
//!
//! TREE_HEIGHT_MAX (9)
//!       │
//!       └─> Bounds every descent stack. 7^9 ≈ 4*10^7 entries before the
//!           insertion path refuses to grow the tree further.
//! ```
//!
//! ## Bit Packing
//!
//! Two node header words pack two fields each:
//!
//! ```text
//! gen_type:  [ generation (24 bits) | type (8 bits) ]
//! size_kc:   [ size (26 bits) | reserved (3 bits) | key_count (3 bits) ]
//! ```
//!
//! `key_count` needs only 3 bits for 0..=7; bits 3-5 are reserved and must
//! stay zero. All accessors in `arena::node` go through these masks so that
//! writes never disturb the neighbouring field.

/// B-tree fan-out: maximum keys per node.
pub const BRANCH_FACTOR: usize = 7;

/// Keys kept in the lower half of a splitting node; also the index of the
/// promoted median in a full node.
pub const NODE_KEY_COUNT_MIN: usize = BRANCH_FACTOR / 2;

/// A node at this count must split before accepting another key.
pub const NODE_KEY_COUNT_MAX: usize = BRANCH_FACTOR;

/// Size of one packed node in bytes.
pub const NODE_SIZE: usize = 96;

/// Maximum tree height accepted by descent stacks.
pub const TREE_HEIGHT_MAX: usize = 9;

/// Fresh node allocations round `used` up to this boundary. Nested nodes
/// embedded in key/value entries are not aligned; all node reads go through
/// unaligned-safe accessors.
pub const NODE_ALIGNMENT: usize = 4;

/// The root node of a document always lives at byte 0.
pub const ROOT_OFFSET: usize = 0;

pub const NODE_TYPE_MASK: u32 = 0xFF;
pub const NODE_GEN_SHIFT: u32 = 8;
pub const NODE_GEN_MASK: u32 = !NODE_TYPE_MASK;

pub const NODE_KEY_COUNT_MASK: u32 = 0x7;
pub const NODE_SIZE_SHIFT: u32 = 6;
pub const NODE_SIZE_MASK: u32 = !((1 << NODE_SIZE_SHIFT) - 1);

const _: () = assert!(NODE_SIZE == 4 + BRANCH_FACTOR * 4 + 4 + BRANCH_FACTOR * 4 + (BRANCH_FACTOR + 1) * 4);
const _: () = assert!(NODE_KEY_COUNT_MAX as u32 <= NODE_KEY_COUNT_MASK);
const _: () = assert!(NODE_KEY_COUNT_MIN * 2 < NODE_KEY_COUNT_MAX);
const _: () = assert!(NODE_ALIGNMENT.is_power_of_two());
const _: () = assert!(NODE_GEN_MASK & NODE_TYPE_MASK == 0);
const _: () = assert!(NODE_SIZE_MASK & NODE_KEY_COUNT_MASK == 0);
