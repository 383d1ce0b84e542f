//! CLI command implementations.

pub mod locate;
pub mod require;
pub mod tree;
