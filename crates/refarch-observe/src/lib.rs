//! Logging and trace export setup for refarch binaries.

pub mod tracing_setup;
