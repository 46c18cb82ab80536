//! # Generational Iteration
//!
//! In-order traversal over the object subtree rooted at a node offset,
//! yielding `(key, value_offset, value_type)` in ascending hash order.
//! Colliding keys come out in insertion order.
//!
//! Two shapes over the same traversal:
//!
//! - [`Entries`] is a plain `Iterator` borrowing the arena; the borrow
//!   checker already rules out mutation while it is alive.
//! - [`Cursor`] holds no borrow. It snapshots the root generation at
//!   construction and re-reads it before every yield, failing with an
//!   "invalidated" error once the arena has been mutated underneath it.
//!
//! Both walk an explicit fixed-depth stack of `(node, next_key_index)`
//! frames, bounded by the maximum tree height.

use eyre::{eyre, Result};
use smallvec::SmallVec;

use crate::config::{ROOT_OFFSET, TREE_HEIGHT_MAX};

use super::buffer::Arena;
use super::node::Type;

/// One yielded object entry. The key borrows the arena's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub key: &'a str,
    pub value_offset: usize,
    pub value_type: Type,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    offset: u32,
    key_index: u32,
}

/// A traversal position detached from any arena borrow.
#[derive(Debug, Clone)]
pub struct Cursor {
    initial_generation: u32,
    stack: SmallVec<[Frame; TREE_HEIGHT_MAX + 1]>,
    non_object: bool,
    finished: bool,
}

impl Cursor {
    pub(crate) fn new(arena: &Arena, subtree_ofs: usize) -> Cursor {
        let mut cursor = Cursor {
            initial_generation: 0,
            stack: SmallVec::new(),
            non_object: false,
            finished: true,
        };
        if !arena.is_initialized() {
            return cursor;
        }
        let Ok(root) = arena.node(ROOT_OFFSET) else {
            return cursor;
        };
        cursor.initial_generation = root.generation();

        match arena.node(subtree_ofs).and_then(|n| n.node_type()) {
            Ok(Type::Object) => {}
            _ => {
                cursor.non_object = true;
                cursor.finished = false;
                return cursor;
            }
        }

        cursor.finished = false;
        cursor.stack.push(Frame {
            offset: subtree_ofs as u32,
            key_index: 0,
        });
        cursor.descend_leftmost(arena);
        cursor
    }

    fn descend_leftmost(&mut self, arena: &Arena) {
        loop {
            let Some(frame) = self.stack.last().copied() else {
                return;
            };
            let Ok(node) = arena.node(frame.offset as usize) else {
                self.finished = true;
                return;
            };
            let child = node.child_offset(0);
            if child == 0 || self.stack.len() > TREE_HEIGHT_MAX {
                return;
            }
            self.stack.push(Frame {
                offset: child,
                key_index: 0,
            });
        }
    }

    /// Yields the next entry of `arena`, or an "invalidated" error if the
    /// root generation has moved since this cursor was created.
    pub fn next<'a>(&mut self, arena: &'a Arena) -> Option<Result<Entry<'a>>> {
        if self.finished {
            return None;
        }
        if self.non_object {
            self.finished = true;
            return Some(Err(eyre!("cannot iterate a non-object subtree")));
        }

        match arena.node(ROOT_OFFSET) {
            Ok(root) if root.generation() == self.initial_generation => {}
            Ok(_) => {
                self.finished = true;
                return Some(Err(eyre!(
                    "iterator invalidated: arena modified during iteration"
                )));
            }
            Err(e) => {
                self.finished = true;
                return Some(Err(e));
            }
        }

        loop {
            let Some(&frame) = self.stack.last() else {
                self.finished = true;
                return None;
            };
            let node = match arena.node(frame.offset as usize) {
                Ok(node) => node,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            if frame.key_index as usize >= node.key_count() {
                self.stack.pop();
                continue;
            }

            let kv_ofs = node.kv_offset(frame.key_index as usize) as usize;
            let entry = match arena.entry_parts(kv_ofs) {
                Ok((key, value_offset, value_type)) => Entry {
                    key,
                    value_offset,
                    value_type,
                },
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };

            let top = self.stack.len() - 1;
            self.stack[top].key_index += 1;
            let next_child = node.child_offset(self.stack[top].key_index as usize);
            if next_child != 0 && self.stack.len() <= TREE_HEIGHT_MAX {
                self.stack.push(Frame {
                    offset: next_child,
                    key_index: 0,
                });
                self.descend_leftmost(arena);
            }
            return Some(Ok(entry));
        }
    }
}

/// Borrowing iterator over an object subtree.
pub struct Entries<'a> {
    arena: &'a Arena,
    cursor: Cursor,
}

impl<'a> Entries<'a> {
    pub(crate) fn new(arena: &'a Arena, subtree_ofs: usize) -> Self {
        Self {
            arena,
            cursor: Cursor::new(arena, subtree_ofs),
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<Entry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next(self.arena)
    }
}
