//! # docbuf - Packed Document Store
//!
//! docbuf is an embedded, schema-free document store. A document is a tree
//! of typed values (null, bool, i64, f64, string, bytes, object, array)
//! packed into a single contiguous byte buffer, with every container backed
//! by a B-tree of cache-friendly 96-byte nodes. This implementation
//! prioritizes:
//!
//! - **One allocation per document**: nodes and entries live in one
//!   append-only arena; growth is a single buffer reallocation
//! - **Zero-copy reads**: string and byte getters return slices pointing
//!   directly into the arena
//! - **Snapshot portability**: the used prefix of the buffer is the
//!   serialized form; persist it verbatim and adopt it back unchanged
//!
//! ## Quick Start
//!
//! ```
//! use docbuf::Arena;
//!
//! # fn main() -> eyre::Result<()> {
//! let mut arena = Arena::new();
//! arena.init_object()?;
//! arena.set_i64(0, "age", 30)?;
//! arena.set_str(0, "name", "ada")?;
//!
//! assert_eq!(arena.get_i64(0, "age")?, 30);
//!
//! let friends = arena.set_arr(0, "friends")?;
//! arena.arr_append_str(friends, "grace")?;
//! assert_eq!(arena.arr_get_str(friends, 0)?, "grace");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Document / Object / Array views    │
//! ├─────────────────────────────────────┤
//! │    JSON Codec (serde_json-based)     │
//! ├─────────────────────────────────────┤
//! │  Arena: B-tree search/insert/split,  │
//! │  typed payload codec, growth policy  │
//! ├───────────────────┬─────────────────┤
//! │  Packed 96B nodes │ key tags + djb2  │
//! └───────────────────┴─────────────────┘
//! ```
//!
//! Containers are addressed by byte offset: 0 is the document root, and
//! container-creating setters (`set_obj`, `arr_append_arr`, ...) return the
//! offset of the nested node. Offsets stay valid across buffer growth, which
//! is why the API never hands out pointers into the arena.
//!
//! ## Concurrency Model
//!
//! Single-threaded by construction: an `Arena` is an exclusively owned
//! value, mutated through `&mut self`. Each node carries a generation
//! counter so that a detached [`Cursor`] can detect mutations that happened
//! between steps; the borrowing [`Entries`] iterator gets the same guarantee
//! from the borrow checker alone.
//!
//! ## Module Overview
//!
//! - [`arena`]: the byte buffer, packed nodes, B-tree operations, iteration
//! - [`json`]: JSON encode/parse for arena subtrees
//! - [`document`]: ergonomic document and container views
//! - [`observability`]: optional process-wide logger and metrics sinks
//! - [`config`]: layout constants (fan-out, node size, bit masks)
//! - [`encoding`]: djb2 hashing, key tags, hex

pub mod arena;
pub mod config;
pub mod document;
pub mod encoding;
pub mod json;
pub mod observability;

pub use arena::{Arena, Cursor, Entries, Entry, Type};
pub use document::{ArrayView, Document, ObjectView};
pub use observability::{LogLevel, Logger, Metrics};
