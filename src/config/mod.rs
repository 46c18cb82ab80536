//! # Configuration Module
//!
//! This module centralizes the layout constants for docbuf. The node layout
//! constants are the wire format: changing any of them changes the meaning of
//! every byte buffer ever produced by this crate, so interdependencies are
//! documented and enforced through compile-time assertions.
//!
//! ## Module Organization
//!
//! - [`constants`]: All layout values with dependency documentation

pub mod constants;
pub use constants::*;
