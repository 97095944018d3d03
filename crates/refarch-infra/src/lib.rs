//! Infrastructure layer for refarch.
//!
//! Contains implementations of the ports defined in `refarch-core`: the real
//! filesystem tree, the tokio subprocess runner, and loaders for the batch
//! and server configuration.

pub mod config;
pub mod fs_tree;
pub mod process;
