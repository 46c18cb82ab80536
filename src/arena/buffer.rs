//! # Arena Buffer
//!
//! The [`Arena`] owns the byte buffer and implements every public operation:
//! growth, the append allocator, B-tree search and top-down insertion with
//! pre-emptive splits, the in-place overwrite optimization, and the typed
//! payload codec.
//!
//! ## Insertion Algorithm
//!
//! One top-down pass per mutation:
//!
//! ```text
//! 1. Bump the generation of every node on the descent path.
//! 2. A full node (7 keys) splits before descent:
//!    - container root: copy the root bytes to a fresh node, wipe the root
//!      in place (type/generation/size preserved), link the copy as child 0
//!    - otherwise: move the upper 3 keys to a new sibling, promote the
//!      median (index 3) into the parent, continue in whichever half covers
//!      the probe hash
//! 3. Scan for the slot: first hash >= probe; equal hashes compare key
//!    bytes across the whole colliding run.
//! 4. Match: overwrite in place when the stored width equals the new width,
//!    else append a fresh entry and repoint the slot.
//! 5. No match, child present: descend.
//! 6. Leaf: append the entry, shift slots right, insert.
//! ```
//!
//! ## Value Widths
//!
//! | Type    | Bytes                                   |
//! |---------|-----------------------------------------|
//! | Null    | `[00]`                                  |
//! | Bool    | `[01][b]`                               |
//! | Int64   | `[02][8B LE]`                           |
//! | Float64 | `[03][8B LE]`                           |
//! | Bytes   | `[04][len u32 LE][data]`                |
//! | String  | `[05][len u32 LE][utf8][00]`            |
//! | Object  | `[06][96B node]`                        |
//! | Array   | `[07][96B node]`                        |

use std::time::Duration;

use eyre::{bail, ensure, eyre, Result};

use crate::config::{
    NODE_ALIGNMENT, NODE_KEY_COUNT_MAX, NODE_KEY_COUNT_MIN, NODE_SIZE, ROOT_OFFSET,
    TREE_HEIGHT_MAX,
};
use crate::encoding::hash::djb2;
use crate::encoding::key::{decode_key_tag, encode_key_tag, key_tag_len};
use crate::observability::{log_if_enabled, with_metrics, LogLevel, OpTimer};

use super::iter::{Cursor, Entries};
use super::node::{PackedNode, Type};

/// The contiguous byte buffer backing one document tree.
///
/// Bytes `[0, used)` are allocated, `[used, capacity)` are free. The
/// `[0, used)` prefix is a self-contained snapshot: it can be persisted
/// verbatim and adopted back with [`Arena::from_bytes`].
#[derive(Debug, Clone, Default)]
pub struct Arena {
    data: Vec<u8>,
    used: usize,
}

/// Where an insertion continues after splitting a full child.
enum SplitDescent {
    /// Continue the descent in the node at this offset.
    Into(usize),
    /// The probe matched the promoted median; it now lives in the parent at
    /// this slot.
    Promoted(usize),
}

fn align_up(n: usize, alignment: usize) -> usize {
    (n + alignment - 1) & !(alignment - 1)
}

fn value_total_len(ty: Type, payload_len: usize) -> usize {
    match ty {
        Type::Null => 1,
        Type::Bool => 1 + 1,
        Type::Int64 | Type::Float64 => 1 + 8,
        Type::Bytes => 1 + 4 + payload_len,
        Type::String => 1 + 4 + payload_len + 1,
        Type::Object | Type::Array => 1 + NODE_SIZE,
    }
}

fn keyed_len(key: Option<&str>) -> usize {
    key.map_or(0, |k| key_tag_len(k.len()) + k.len() + 1)
}

impl Arena {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            used: 0,
        }
    }

    /// An empty arena whose buffer is pre-sized to `bytes`.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: vec![0; bytes],
            used: 0,
        }
    }

    /// Adopts an existing snapshot, setting `used` to its length.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let used = data.len();
        Self { data, used }
    }

    /// The allocated prefix `[0, used)`.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.used]
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.used >= NODE_SIZE
    }

    /// Guarantees `capacity >= used + additional`.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.ensure_capacity(additional)
    }

    /// Writes an object root node at offset 0. Only legal on an empty arena.
    pub fn init_object(&mut self) -> Result<()> {
        self.init_root(Type::Object)
    }

    /// Writes an array root node at offset 0. Only legal on an empty arena.
    pub fn init_array(&mut self) -> Result<()> {
        self.init_root(Type::Array)
    }

    fn init_root(&mut self, ty: Type) -> Result<()> {
        ensure!(self.used == 0, "arena is already initialized");
        self.ensure_capacity(NODE_SIZE)?;
        self.used = NODE_SIZE;
        self.data[..NODE_SIZE].fill(0);
        self.node_mut(ROOT_OFFSET)?.set_gen_type(1, ty);
        Ok(())
    }

    fn ensure_capacity(&mut self, additional: usize) -> Result<()> {
        let needed = self
            .used
            .checked_add(additional)
            .ok_or_else(|| eyre!("arena size overflow"))?;
        if needed > self.data.len() {
            let new_size = (self.data.len() * 2).max(needed).max(NODE_SIZE);
            ensure!(
                new_size <= u32::MAX as usize,
                "arena exceeds 32-bit offset range"
            );
            self.data.resize(new_size, 0);
            let capacity = self.data.len();
            with_metrics(|m| {
                let _ = m.set_buffer_capacity(capacity);
            });
        }
        Ok(())
    }

    pub(crate) fn node(&self, ofs: usize) -> Result<&PackedNode> {
        ensure!(
            ofs + NODE_SIZE <= self.used,
            "node offset {} out of bounds (used={})",
            ofs,
            self.used
        );
        PackedNode::from_bytes(&self.data[ofs..ofs + NODE_SIZE])
    }

    fn node_mut(&mut self, ofs: usize) -> Result<&mut PackedNode> {
        ensure!(
            ofs + NODE_SIZE <= self.used,
            "node offset {} out of bounds (used={})",
            ofs,
            self.used
        );
        PackedNode::from_bytes_mut(&mut self.data[ofs..ofs + NODE_SIZE])
    }

    // === typed setters =====================================================

    pub fn set_null(&mut self, ofs: usize, key: &str) -> Result<()> {
        self.set_impl(ofs, Some(key), djb2(key), Type::Null, &[])?;
        Ok(())
    }

    pub fn set_bool(&mut self, ofs: usize, key: &str, value: bool) -> Result<()> {
        self.set_impl(ofs, Some(key), djb2(key), Type::Bool, &[value as u8])?;
        Ok(())
    }

    pub fn set_i64(&mut self, ofs: usize, key: &str, value: i64) -> Result<()> {
        self.set_impl(ofs, Some(key), djb2(key), Type::Int64, &value.to_le_bytes())?;
        Ok(())
    }

    pub fn set_f64(&mut self, ofs: usize, key: &str, value: f64) -> Result<()> {
        self.set_impl(ofs, Some(key), djb2(key), Type::Float64, &value.to_le_bytes())?;
        Ok(())
    }

    pub fn set_str(&mut self, ofs: usize, key: &str, value: &str) -> Result<()> {
        self.set_impl(ofs, Some(key), djb2(key), Type::String, value.as_bytes())?;
        Ok(())
    }

    pub fn set_bytes(&mut self, ofs: usize, key: &str, value: &[u8]) -> Result<()> {
        self.set_impl(ofs, Some(key), djb2(key), Type::Bytes, value)?;
        Ok(())
    }

    /// Inserts an empty object under `key` and returns the offset of its
    /// 96-byte node.
    pub fn set_obj(&mut self, ofs: usize, key: &str) -> Result<usize> {
        Ok(self.set_impl(ofs, Some(key), djb2(key), Type::Object, &[])? + 1)
    }

    /// Inserts an empty array under `key` and returns the offset of its
    /// 96-byte node.
    pub fn set_arr(&mut self, ofs: usize, key: &str) -> Result<usize> {
        Ok(self.set_impl(ofs, Some(key), djb2(key), Type::Array, &[])? + 1)
    }

    // === array appends =====================================================

    pub fn arr_append_null(&mut self, ofs: usize) -> Result<()> {
        self.arr_append_impl(ofs, Type::Null, &[])?;
        Ok(())
    }

    pub fn arr_append_bool(&mut self, ofs: usize, value: bool) -> Result<()> {
        self.arr_append_impl(ofs, Type::Bool, &[value as u8])?;
        Ok(())
    }

    pub fn arr_append_i64(&mut self, ofs: usize, value: i64) -> Result<()> {
        self.arr_append_impl(ofs, Type::Int64, &value.to_le_bytes())?;
        Ok(())
    }

    pub fn arr_append_f64(&mut self, ofs: usize, value: f64) -> Result<()> {
        self.arr_append_impl(ofs, Type::Float64, &value.to_le_bytes())?;
        Ok(())
    }

    pub fn arr_append_str(&mut self, ofs: usize, value: &str) -> Result<()> {
        self.arr_append_impl(ofs, Type::String, value.as_bytes())?;
        Ok(())
    }

    pub fn arr_append_bytes(&mut self, ofs: usize, value: &[u8]) -> Result<()> {
        self.arr_append_impl(ofs, Type::Bytes, value)?;
        Ok(())
    }

    /// Appends an empty object and returns the offset of its node.
    pub fn arr_append_obj(&mut self, ofs: usize) -> Result<usize> {
        Ok(self.arr_append_impl(ofs, Type::Object, &[])? + 1)
    }

    /// Appends an empty array and returns the offset of its node.
    pub fn arr_append_arr(&mut self, ofs: usize) -> Result<usize> {
        Ok(self.arr_append_impl(ofs, Type::Array, &[])? + 1)
    }

    fn arr_append_impl(&mut self, ofs: usize, ty: Type, payload: &[u8]) -> Result<usize> {
        let index = self.node(ofs)?.size();
        let value_ofs = self.set_impl(ofs, None, index, ty, payload)?;
        self.node_mut(ofs)?.set_size(index + 1);
        Ok(value_ofs)
    }

    // === typed getters =====================================================

    pub fn get_bool(&self, ofs: usize, key: &str) -> Result<bool> {
        self.decode_bool(self.keyed_value(ofs, key, Type::Bool)?)
    }

    pub fn get_i64(&self, ofs: usize, key: &str) -> Result<i64> {
        self.decode_i64(self.keyed_value(ofs, key, Type::Int64)?)
    }

    pub fn get_f64(&self, ofs: usize, key: &str) -> Result<f64> {
        self.decode_f64(self.keyed_value(ofs, key, Type::Float64)?)
    }

    pub fn get_str(&self, ofs: usize, key: &str) -> Result<&str> {
        self.decode_str(self.keyed_value(ofs, key, Type::String)?)
    }

    pub fn get_bytes(&self, ofs: usize, key: &str) -> Result<&[u8]> {
        self.decode_bytes(self.keyed_value(ofs, key, Type::Bytes)?)
    }

    /// Offset of the nested object node stored under `key`.
    pub fn get_obj(&self, ofs: usize, key: &str) -> Result<usize> {
        Ok(self.keyed_value(ofs, key, Type::Object)? + 1)
    }

    /// Offset of the nested array node stored under `key`.
    pub fn get_arr(&self, ofs: usize, key: &str) -> Result<usize> {
        Ok(self.keyed_value(ofs, key, Type::Array)? + 1)
    }

    /// The stored type under `key`, without enforcing it.
    pub fn get_type(&self, ofs: usize, key: &str) -> Result<Type> {
        match self.get_impl(ofs, Some(key), djb2(key))? {
            Some((ty, _)) => Ok(ty),
            None => bail!("key not found: {:?}", key),
        }
    }

    pub fn arr_get_bool(&self, ofs: usize, index: u32) -> Result<bool> {
        self.decode_bool(self.indexed_value(ofs, index, Type::Bool)?)
    }

    pub fn arr_get_i64(&self, ofs: usize, index: u32) -> Result<i64> {
        self.decode_i64(self.indexed_value(ofs, index, Type::Int64)?)
    }

    pub fn arr_get_f64(&self, ofs: usize, index: u32) -> Result<f64> {
        self.decode_f64(self.indexed_value(ofs, index, Type::Float64)?)
    }

    pub fn arr_get_str(&self, ofs: usize, index: u32) -> Result<&str> {
        self.decode_str(self.indexed_value(ofs, index, Type::String)?)
    }

    pub fn arr_get_bytes(&self, ofs: usize, index: u32) -> Result<&[u8]> {
        self.decode_bytes(self.indexed_value(ofs, index, Type::Bytes)?)
    }

    pub fn arr_get_obj(&self, ofs: usize, index: u32) -> Result<usize> {
        Ok(self.indexed_value(ofs, index, Type::Object)? + 1)
    }

    pub fn arr_get_arr(&self, ofs: usize, index: u32) -> Result<usize> {
        Ok(self.indexed_value(ofs, index, Type::Array)? + 1)
    }

    pub fn arr_get_type(&self, ofs: usize, index: u32) -> Result<Type> {
        match self.get_impl(ofs, None, index)? {
            Some((ty, _)) => Ok(ty),
            None => bail!("array index not found: {}", index),
        }
    }

    /// Element count of the array rooted at `ofs`.
    pub fn arr_len(&self, ofs: usize) -> Result<u32> {
        let node = self.node(ofs)?;
        ensure!(
            node.node_type()? == Type::Array,
            "type mismatch: container at offset {} is not an array",
            ofs
        );
        Ok(node.size())
    }

    /// In-order iteration over the object subtree rooted at `ofs`.
    pub fn entries(&self, ofs: usize) -> Entries<'_> {
        Entries::new(self, ofs)
    }

    /// A detached cursor over the object subtree rooted at `ofs`. Unlike
    /// [`Arena::entries`] the cursor does not borrow the arena; it
    /// re-validates the root generation on every step and fails once the
    /// arena has been mutated.
    pub fn cursor(&self, ofs: usize) -> Cursor {
        Cursor::new(self, ofs)
    }

    // === internals =========================================================

    fn keyed_value(&self, ofs: usize, key: &str, expected: Type) -> Result<usize> {
        match self.get_impl(ofs, Some(key), djb2(key))? {
            Some((ty, value_ofs)) if ty == expected => Ok(value_ofs),
            Some((ty, _)) => bail!(
                "type mismatch for key {:?}: expected {}, found {}",
                key,
                expected.name(),
                ty.name()
            ),
            None => bail!("key not found: {:?}", key),
        }
    }

    fn indexed_value(&self, ofs: usize, index: u32, expected: Type) -> Result<usize> {
        match self.get_impl(ofs, None, index)? {
            Some((ty, value_ofs)) if ty == expected => Ok(value_ofs),
            Some((ty, _)) => bail!(
                "type mismatch at index {}: expected {}, found {}",
                index,
                expected.name(),
                ty.name()
            ),
            None => bail!("array index not found: {}", index),
        }
    }

    pub(crate) fn arr_entry(&self, ofs: usize, index: u32) -> Result<(Type, usize)> {
        match self.get_impl(ofs, None, index)? {
            Some(found) => Ok(found),
            None => bail!("array index not found: {}", index),
        }
    }

    fn get_impl(&self, ofs: usize, key: Option<&str>, hash: u32) -> Result<Option<(Type, usize)>> {
        let _timer = OpTimer::new("get");
        ensure!(self.used >= NODE_SIZE, "arena is not initialized");
        self.check_container(ofs, key.is_some())?;

        let mut node_ofs = ofs;
        let mut depth = 0usize;
        loop {
            ensure!(
                depth <= TREE_HEIGHT_MAX,
                "tree height exceeds maximum of {}",
                TREE_HEIGHT_MAX
            );
            let (slot, matched) = self.scan_node(node_ofs, key, hash)?;
            if matched {
                let kv_ofs = self.node(node_ofs)?.kv_offset(slot) as usize;
                let value_ofs = self.entry_value_offset(kv_ofs, key.is_some())?;
                let ty = Type::from_byte(self.data[value_ofs])
                    .ok_or_else(|| eyre!("corrupt value type tag at offset {}", value_ofs))?;
                return Ok(Some((ty, value_ofs)));
            }
            let child = self.node(node_ofs)?.child_offset(slot);
            if child == 0 {
                return Ok(None);
            }
            node_ofs = child as usize;
            depth += 1;
        }
    }

    fn check_container(&self, ofs: usize, keyed: bool) -> Result<()> {
        let container = self.node(ofs)?.node_type()?;
        if keyed {
            ensure!(
                container == Type::Object,
                "type mismatch: container at offset {} is not an object",
                ofs
            );
        } else {
            ensure!(
                container == Type::Array,
                "type mismatch: container at offset {} is not an array",
                ofs
            );
        }
        Ok(())
    }

    /// Scans one node for `hash` (and, for objects, `key`). Returns the slot
    /// index and whether it is an exact match; without a match the index is
    /// where the probe would be inserted, past any colliding run.
    fn scan_node(&self, node_ofs: usize, key: Option<&str>, hash: u32) -> Result<(usize, bool)> {
        let node = self.node(node_ofs)?;
        let count = node.key_count();
        let mut i = 0;
        while i < count {
            let h = node.hash(i);
            if h < hash {
                i += 1;
                continue;
            }
            if h > hash {
                return Ok((i, false));
            }
            match key {
                // Array hashes are unique indices.
                None => return Ok((i, true)),
                Some(probe) => {
                    let (stored_key, _, _) = self.entry_parts(node.kv_offset(i) as usize)?;
                    if stored_key == probe {
                        return Ok((i, true));
                    }
                    with_metrics(|m| {
                        let _ = m.increment_hash_collisions();
                    });
                    i += 1;
                }
            }
        }
        Ok((count, false))
    }

    /// Insert-or-update under the container rooted at `ofs`. Returns the
    /// offset of the value's type byte.
    fn set_impl(
        &mut self,
        ofs: usize,
        key: Option<&str>,
        hash: u32,
        ty: Type,
        payload: &[u8],
    ) -> Result<usize> {
        let _timer = OpTimer::new("set");
        ensure!(self.used >= NODE_SIZE, "arena is not initialized");
        ensure!(
            payload.len() <= u32::MAX as usize,
            "payload exceeds 32-bit length range"
        );
        self.check_container(ofs, key.is_some())?;

        // The root generation advances on every mutation, even one addressed
        // to a nested container, so document-level iterators observe it.
        if ofs != ROOT_OFFSET {
            self.node_mut(ROOT_OFFSET)?.bump_generation();
        }

        let mut parent_ofs: Option<usize> = None;
        let mut node_ofs = ofs;
        let mut depth = 0usize;

        loop {
            ensure!(
                depth < TREE_HEIGHT_MAX,
                "tree height exceeds maximum of {}",
                TREE_HEIGHT_MAX
            );
            self.node_mut(node_ofs)?.bump_generation();

            if self.node(node_ofs)?.key_count() == NODE_KEY_COUNT_MAX {
                log_if_enabled(
                    LogLevel::Info,
                    "Node is full, splitting",
                    "set_impl",
                    Duration::ZERO,
                    node_ofs,
                    key.unwrap_or(""),
                );
                with_metrics(|m| {
                    let _ = m.increment_node_splits();
                });
                match parent_ofs {
                    None => {
                        // Container root: re-root in place so the caller's
                        // offset stays valid, then continue into the copy.
                        let copy_ofs = self.split_root(node_ofs)?;
                        parent_ofs = Some(node_ofs);
                        node_ofs = copy_ofs;
                        depth += 1;
                        continue;
                    }
                    Some(parent) => match self.split_child(parent, node_ofs, key, hash)? {
                        SplitDescent::Into(half) => {
                            node_ofs = half;
                            continue;
                        }
                        SplitDescent::Promoted(slot) => {
                            return self.update_entry(parent, slot, key, ty, payload);
                        }
                    },
                }
            }

            let (slot, matched) = self.scan_node(node_ofs, key, hash)?;
            if matched {
                return self.update_entry(node_ofs, slot, key, ty, payload);
            }

            let child = self.node(node_ofs)?.child_offset(slot);
            if child != 0 {
                parent_ofs = Some(node_ofs);
                node_ofs = child as usize;
                depth += 1;
                continue;
            }

            // Leaf: append the entry and slide the upper slots right.
            let start = self.append_entry(key, ty, payload)?;
            let node = self.node_mut(node_ofs)?;
            let count = node.key_count();
            for j in (slot..count).rev() {
                let h = node.hash(j);
                let kv = node.kv_offset(j);
                node.set_hash(j + 1, h);
                node.set_kv_offset(j + 1, kv);
            }
            node.set_hash(slot, hash);
            node.set_kv_offset(slot, start as u32);
            node.set_key_count(count + 1);
            return Ok(start + keyed_len(key));
        }
    }

    /// Overwrites the value of the entry at `slot` of `node_ofs`, in place
    /// when the byte widths match, otherwise by appending a replacement
    /// entry and repointing the slot.
    fn update_entry(
        &mut self,
        node_ofs: usize,
        slot: usize,
        key: Option<&str>,
        ty: Type,
        payload: &[u8],
    ) -> Result<usize> {
        let kv_ofs = self.node(node_ofs)?.kv_offset(slot) as usize;
        let value_ofs = self.entry_value_offset(kv_ofs, key.is_some())?;

        if self.stored_value_len(value_ofs)? == value_total_len(ty, payload.len()) {
            self.write_value(value_ofs, ty, payload)?;
            return Ok(value_ofs);
        }

        // The old entry becomes dead storage.
        let start = self.append_entry(key, ty, payload)?;
        self.node_mut(node_ofs)?.set_kv_offset(slot, start as u32);
        Ok(start + keyed_len(key))
    }

    /// Appends a full `[key][value]` entry at `used`, returning its start.
    fn append_entry(&mut self, key: Option<&str>, ty: Type, payload: &[u8]) -> Result<usize> {
        let key_len_total = keyed_len(key);
        let total = key_len_total + value_total_len(ty, payload.len());
        self.ensure_capacity(total)?;
        let start = self.used;
        self.used += total;
        if let Some(k) = key {
            self.write_key(start, k)?;
        }
        self.write_value(start + key_len_total, ty, payload)?;
        let used = self.used;
        with_metrics(|m| {
            let _ = m.set_buffer_usage(used);
        });
        Ok(start)
    }

    fn write_key(&mut self, at: usize, key: &str) -> Result<()> {
        let tag_width = encode_key_tag(key.len(), &mut self.data[at..])?;
        let key_start = at + tag_width;
        self.data[key_start..key_start + key.len()].copy_from_slice(key.as_bytes());
        self.data[key_start + key.len()] = 0;
        Ok(())
    }

    fn write_value(&mut self, at: usize, ty: Type, payload: &[u8]) -> Result<()> {
        self.data[at] = ty as u8;
        match ty {
            Type::Null => {}
            Type::Bool | Type::Int64 | Type::Float64 => {
                self.data[at + 1..at + 1 + payload.len()].copy_from_slice(payload);
            }
            Type::Bytes | Type::String => {
                let len = payload.len() as u32;
                self.data[at + 1..at + 5].copy_from_slice(&len.to_le_bytes());
                self.data[at + 5..at + 5 + payload.len()].copy_from_slice(payload);
                if ty == Type::String {
                    self.data[at + 5 + payload.len()] = 0;
                }
            }
            Type::Object | Type::Array => {
                self.data[at + 1..at + 1 + NODE_SIZE].fill(0);
                let node = PackedNode::from_bytes_mut(&mut self.data[at + 1..at + 1 + NODE_SIZE])?;
                node.set_gen_type(1, ty);
            }
        }
        Ok(())
    }

    /// Moves the full container root into a fresh node and turns the root
    /// into its sole parent, preserving type, generation and size. The
    /// container's offset never changes.
    fn split_root(&mut self, root_ofs: usize) -> Result<usize> {
        let aligned = align_up(self.used, NODE_ALIGNMENT);
        self.ensure_capacity(aligned - self.used + NODE_SIZE)?;
        self.used = aligned;
        let copy_ofs = self.used;
        self.used += NODE_SIZE;
        self.data.copy_within(root_ofs..root_ofs + NODE_SIZE, copy_ofs);

        let (generation, ty, size) = {
            let node = self.node(root_ofs)?;
            (node.generation(), node.node_type()?, node.size())
        };
        self.data[root_ofs..root_ofs + NODE_SIZE].fill(0);
        let root = self.node_mut(root_ofs)?;
        root.set_gen_type(generation, ty);
        root.set_size(size);
        root.set_child_offset(0, copy_ofs as u32);
        Ok(copy_ofs)
    }

    /// Splits the full `child_ofs`, promoting its median into `parent_ofs`
    /// (which is guaranteed non-full by the top-down pass).
    fn split_child(
        &mut self,
        parent_ofs: usize,
        child_ofs: usize,
        key: Option<&str>,
        hash: u32,
    ) -> Result<SplitDescent> {
        let aligned = align_up(self.used, NODE_ALIGNMENT);
        self.ensure_capacity(aligned - self.used + NODE_SIZE)?;
        self.used = aligned;
        let sibling_ofs = self.used;
        self.used += NODE_SIZE;
        self.data[sibling_ofs..sibling_ofs + NODE_SIZE].fill(0);

        let child = *self.node(child_ofs)?;
        let mid = NODE_KEY_COUNT_MIN;
        let move_count = NODE_KEY_COUNT_MAX - (mid + 1);

        {
            let sibling = self.node_mut(sibling_ofs)?;
            sibling.set_gen_type(child.generation(), child.node_type()?);
            sibling.set_child_offset(0, child.child_offset(mid + 1));
            for j in 0..move_count {
                sibling.set_hash(j, child.hash(mid + 1 + j));
                sibling.set_kv_offset(j, child.kv_offset(mid + 1 + j));
                sibling.set_child_offset(j + 1, child.child_offset(mid + 2 + j));
            }
            sibling.set_key_count(move_count);
        }

        let (parent_count, child_slot) = {
            let parent = self.node(parent_ofs)?;
            let count = parent.key_count();
            match (0..=count).find(|&k| parent.child_offset(k) as usize == child_ofs) {
                Some(slot) => (count, slot),
                None => bail!("node {} is not a child of node {}", child_ofs, parent_ofs),
            }
        };

        {
            let parent = self.node_mut(parent_ofs)?;
            for j in (child_slot..parent_count).rev() {
                let h = parent.hash(j);
                let kv = parent.kv_offset(j);
                let c = parent.child_offset(j + 1);
                parent.set_hash(j + 1, h);
                parent.set_kv_offset(j + 1, kv);
                parent.set_child_offset(j + 2, c);
            }
            parent.set_hash(child_slot, child.hash(mid));
            parent.set_kv_offset(child_slot, child.kv_offset(mid));
            parent.set_child_offset(child_slot + 1, sibling_ofs as u32);
            parent.set_key_count(parent_count + 1);
        }

        self.node_mut(child_ofs)?.set_key_count(mid);

        let promoted_hash = child.hash(mid);
        if hash == promoted_hash {
            let promoted_matches = match key {
                None => true,
                Some(probe) => self.entry_parts(child.kv_offset(mid) as usize)?.0 == probe,
            };
            if promoted_matches {
                return Ok(SplitDescent::Promoted(child_slot));
            }
        }
        // Equal-hash probes continue right of the promoted slot, where the
        // colliding run grows.
        Ok(SplitDescent::Into(if hash >= promoted_hash {
            sibling_ofs
        } else {
            child_ofs
        }))
    }

    // === entry decoding ====================================================

    /// Decodes the key, value offset and value type of the object entry at
    /// `kv_ofs`.
    pub(crate) fn entry_parts(&self, kv_ofs: usize) -> Result<(&str, usize, Type)> {
        ensure!(kv_ofs < self.used, "entry offset {} out of bounds", kv_ofs);
        let (stored, tag_width) = decode_key_tag(&self.data[kv_ofs..self.used])?;
        let key_start = kv_ofs + tag_width;
        let value_ofs = key_start + stored;
        ensure!(
            value_ofs < self.used,
            "entry at offset {} extends beyond arena",
            kv_ofs
        );
        let key = std::str::from_utf8(&self.data[key_start..key_start + stored - 1])
            .map_err(|_| eyre!("entry key at offset {} is not valid UTF-8", kv_ofs))?;
        let ty = Type::from_byte(self.data[value_ofs])
            .ok_or_else(|| eyre!("corrupt value type tag at offset {}", value_ofs))?;
        Ok((key, value_ofs, ty))
    }

    fn entry_value_offset(&self, kv_ofs: usize, keyed: bool) -> Result<usize> {
        if !keyed {
            ensure!(kv_ofs < self.used, "entry offset {} out of bounds", kv_ofs);
            return Ok(kv_ofs);
        }
        Ok(self.entry_parts(kv_ofs)?.1)
    }

    /// Total stored width of the value at `value_ofs`, type byte included.
    fn stored_value_len(&self, value_ofs: usize) -> Result<usize> {
        ensure!(
            value_ofs < self.used,
            "value offset {} out of bounds",
            value_ofs
        );
        let ty = Type::from_byte(self.data[value_ofs])
            .ok_or_else(|| eyre!("corrupt value type tag at offset {}", value_ofs))?;
        Ok(match ty {
            Type::Bytes | Type::String => {
                value_total_len(ty, self.read_u32(value_ofs + 1)? as usize)
            }
            _ => value_total_len(ty, 0),
        })
    }

    fn read_fixed<const N: usize>(&self, at: usize) -> Result<[u8; N]> {
        ensure!(
            at + N <= self.used,
            "value at offset {} extends beyond arena",
            at
        );
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[at..at + N]);
        Ok(out)
    }

    fn read_u32(&self, at: usize) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_fixed::<4>(at)?))
    }

    pub(crate) fn decode_bool(&self, value_ofs: usize) -> Result<bool> {
        let [b] = self.read_fixed::<1>(value_ofs + 1)?;
        Ok(b != 0)
    }

    pub(crate) fn decode_i64(&self, value_ofs: usize) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_fixed::<8>(value_ofs + 1)?))
    }

    pub(crate) fn decode_f64(&self, value_ofs: usize) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_fixed::<8>(value_ofs + 1)?))
    }

    pub(crate) fn decode_str(&self, value_ofs: usize) -> Result<&str> {
        let len = self.read_u32(value_ofs + 1)? as usize;
        let start = value_ofs + 5;
        ensure!(
            start + len <= self.used,
            "string at offset {} extends beyond arena",
            value_ofs
        );
        std::str::from_utf8(&self.data[start..start + len])
            .map_err(|_| eyre!("stored string at offset {} is not valid UTF-8", value_ofs))
    }

    pub(crate) fn decode_bytes(&self, value_ofs: usize) -> Result<&[u8]> {
        let len = self.read_u32(value_ofs + 1)? as usize;
        let start = value_ofs + 5;
        ensure!(
            start + len <= self.used,
            "bytes at offset {} extend beyond arena",
            value_ofs
        );
        Ok(&self.data[start..start + len])
    }
}
