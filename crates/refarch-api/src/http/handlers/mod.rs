//! Request handlers for the test listeners.

pub mod echo;
