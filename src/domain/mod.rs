//! Pure domain types with minimal dependencies
//!
//! This module contains the node data model and coordinate types used
//! throughout the crate. Types here know nothing about the host map widget
//! or the persistence backend.

pub mod geometry;
pub mod node;

pub use geometry::*;
pub use node::*;
