//! Shared domain types for refarch.
//!
//! This crate contains the types used across the batch tools and the test
//! server: directory entries and marker files, jobs and their invocations,
//! subprocess results, fault-injection rates, configuration, and the error
//! types that tie them together.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod fault;
pub mod process;
pub mod walk;
