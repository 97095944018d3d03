//! Core logic for refarch.
//!
//! This crate defines the "ports" the infrastructure layer implements
//! ([`tree::DirectoryTree`], [`runner::CommandRunner`], [`sink::LineSink`])
//! and the logic written against them: the fail-fast batch walker, the
//! subprocess stream handler and the fault-injection decision. It never
//! touches the real filesystem or spawns processes itself.

pub mod fault;
pub mod runner;
pub mod sink;
pub mod stream;
pub mod tree;
pub mod walker;
