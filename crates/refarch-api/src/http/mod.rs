//! HTTP test fixture.
//!
//! A plaintext listener (echo or fault-injecting) and a TLS echo listener,
//! each an independent axum service. Every response is `text/plain`.

pub mod dump;
pub mod handlers;
pub mod router;
pub mod server;
