//! In-memory preference tree.

pub mod node;
pub mod path;

pub use node::{Entry, Node};
