//! # Document Façade
//!
//! Thin ergonomic layer over the arena: a [`Document`] owns one arena, and
//! [`ObjectView`]/[`ArrayView`] are read-only typed handles on a container
//! offset. Mutation goes through the arena itself, which deals in offsets so
//! references survive buffer growth.

use eyre::{ensure, Result};

use crate::arena::{Arena, Entries, Type};
use crate::config::ROOT_OFFSET;
use crate::json;

/// One document tree backed by one arena.
#[derive(Debug, Clone, Default)]
pub struct Document {
    arena: Arena,
}

impl Document {
    /// A new document with an empty object root.
    pub fn new_object() -> Result<Self> {
        let mut arena = Arena::new();
        arena.init_object()?;
        Ok(Self { arena })
    }

    /// A new document with an empty array root.
    pub fn new_array() -> Result<Self> {
        let mut arena = Arena::new();
        arena.init_array()?;
        Ok(Self { arena })
    }

    /// A new object document with the buffer pre-sized to `bytes`.
    pub fn new_object_with_capacity(bytes: usize) -> Result<Self> {
        let mut arena = Arena::with_capacity(bytes);
        arena.init_object()?;
        Ok(Self { arena })
    }

    /// A new array document with the buffer pre-sized to `bytes`.
    pub fn new_array_with_capacity(bytes: usize) -> Result<Self> {
        let mut arena = Arena::with_capacity(bytes);
        arena.init_array()?;
        Ok(Self { arena })
    }

    /// Wraps an already-built arena.
    pub fn from_arena(arena: Arena) -> Self {
        Self { arena }
    }

    /// Adopts a persisted snapshot.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            arena: Arena::from_bytes(bytes),
        }
    }

    /// Parses a JSON document.
    pub fn parse_json(text: &str) -> Result<Self> {
        Ok(Self {
            arena: json::from_json(text)?,
        })
    }

    /// Serializes the whole document as JSON.
    pub fn to_json(&self) -> Result<String> {
        json::to_json(&self.arena, ROOT_OFFSET)
    }

    /// The root container offset, always 0.
    pub fn root(&self) -> usize {
        ROOT_OFFSET
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn into_arena(self) -> Arena {
        self.arena
    }

    pub fn root_object(&self) -> Result<ObjectView<'_>> {
        ObjectView::new(&self.arena, ROOT_OFFSET)
    }

    pub fn root_array(&self) -> Result<ArrayView<'_>> {
        ArrayView::new(&self.arena, ROOT_OFFSET)
    }
}

/// Read-only typed handle on an object container.
#[derive(Debug, Clone, Copy)]
pub struct ObjectView<'a> {
    arena: &'a Arena,
    offset: usize,
}

impl<'a> ObjectView<'a> {
    pub fn new(arena: &'a Arena, offset: usize) -> Result<Self> {
        ensure!(
            arena.node(offset)?.node_type()? == Type::Object,
            "type mismatch: container at offset {} is not an object",
            offset
        );
        Ok(Self { arena, offset })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.arena.get_bool(self.offset, key)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64> {
        self.arena.get_i64(self.offset, key)
    }

    pub fn get_f64(&self, key: &str) -> Result<f64> {
        self.arena.get_f64(self.offset, key)
    }

    pub fn get_str(&self, key: &str) -> Result<&'a str> {
        self.arena.get_str(self.offset, key)
    }

    pub fn get_bytes(&self, key: &str) -> Result<&'a [u8]> {
        self.arena.get_bytes(self.offset, key)
    }

    pub fn get_type(&self, key: &str) -> Result<Type> {
        self.arena.get_type(self.offset, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.arena.get_type(self.offset, key).is_ok()
    }

    pub fn object(&self, key: &str) -> Result<ObjectView<'a>> {
        ObjectView::new(self.arena, self.arena.get_obj(self.offset, key)?)
    }

    pub fn array(&self, key: &str) -> Result<ArrayView<'a>> {
        ArrayView::new(self.arena, self.arena.get_arr(self.offset, key)?)
    }

    pub fn entries(&self) -> Entries<'a> {
        self.arena.entries(self.offset)
    }

    pub fn to_json(&self) -> Result<String> {
        json::to_json(self.arena, self.offset)
    }
}

/// Read-only typed handle on an array container.
#[derive(Debug, Clone, Copy)]
pub struct ArrayView<'a> {
    arena: &'a Arena,
    offset: usize,
    len: u32,
}

impl<'a> ArrayView<'a> {
    pub fn new(arena: &'a Arena, offset: usize) -> Result<Self> {
        let len = arena.arr_len(offset)?;
        Ok(Self { arena, offset, len })
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get_bool(&self, index: u32) -> Result<bool> {
        self.arena.arr_get_bool(self.offset, index)
    }

    pub fn get_i64(&self, index: u32) -> Result<i64> {
        self.arena.arr_get_i64(self.offset, index)
    }

    pub fn get_f64(&self, index: u32) -> Result<f64> {
        self.arena.arr_get_f64(self.offset, index)
    }

    pub fn get_str(&self, index: u32) -> Result<&'a str> {
        self.arena.arr_get_str(self.offset, index)
    }

    pub fn get_bytes(&self, index: u32) -> Result<&'a [u8]> {
        self.arena.arr_get_bytes(self.offset, index)
    }

    pub fn get_type(&self, index: u32) -> Result<Type> {
        self.arena.arr_get_type(self.offset, index)
    }

    pub fn object_at(&self, index: u32) -> Result<ObjectView<'a>> {
        ObjectView::new(self.arena, self.arena.arr_get_obj(self.offset, index)?)
    }

    pub fn array_at(&self, index: u32) -> Result<ArrayView<'a>> {
        ArrayView::new(self.arena, self.arena.arr_get_arr(self.offset, index)?)
    }

    pub fn to_json(&self) -> Result<String> {
        json::to_json(self.arena, self.offset)
    }
}
