//! Configuration types for the batch tools and the test server.
//!
//! `BatchConfig` is optionally loaded from `refarch.toml` at the walk root.
//! `ServerConfig` is built once at startup from fixed defaults plus the
//! `CERT_FILE` / `KEY_FILE` environment overrides.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of the optional batch configuration file at the walk root.
pub const BATCH_CONFIG_FILE: &str = "refarch.toml";

/// Default external workflow tool.
pub const DEFAULT_TOOL: &str = "valet";

/// Default marker file base name.
pub const DEFAULT_MARKER_FILE: &str = "workflow.yaml";

/// Plaintext listener port.
pub const HTTP_PORT: u16 = 8080;

/// TLS listener port.
pub const HTTPS_PORT: u16 = 8443;

/// Environment variable overriding the TLS certificate path.
pub const CERT_FILE_ENV: &str = "CERT_FILE";

/// Environment variable overriding the TLS private key path.
pub const KEY_FILE_ENV: &str = "KEY_FILE";

// ---------------------------------------------------------------------------
// Batch tools
// ---------------------------------------------------------------------------

/// Settings shared by `run-all` and `gen-docs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Binary invoked for every job, resolved on `PATH`.
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Base name of the file that marks a directory as a job target.
    #[serde(default = "default_marker_file")]
    pub marker_file: String,
}

fn default_tool() -> String {
    DEFAULT_TOOL.to_string()
}

fn default_marker_file() -> String {
    DEFAULT_MARKER_FILE.to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            marker_file: default_marker_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Test server
// ---------------------------------------------------------------------------

/// Behaviour of the plaintext listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerVariant {
    /// Always echo the request.
    Echo,
    /// Honour the `x-error-rate` header.
    FaultInjecting,
}

impl ServerVariant {
    /// Certificate used when `CERT_FILE` is unset.
    pub fn default_cert_file(self) -> &'static str {
        match self {
            ServerVariant::Echo => "valet-test.com.crt",
            ServerVariant::FaultInjecting => "localhost.crt",
        }
    }

    /// Private key used when `KEY_FILE` is unset.
    pub fn default_key_file(self) -> &'static str {
        match self {
            ServerVariant::Echo => "valet-test.com.key",
            ServerVariant::FaultInjecting => "localhost.key",
        }
    }
}

impl std::fmt::Display for ServerVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerVariant::Echo => write!(f, "echo"),
            ServerVariant::FaultInjecting => write!(f, "fault_injecting"),
        }
    }
}

/// Immutable test server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub variant: ServerVariant,
    pub http_port: u16,
    pub https_port: u16,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

impl ServerConfig {
    /// Fixed defaults for a variant, before environment overrides.
    pub fn for_variant(variant: ServerVariant) -> Self {
        Self {
            variant,
            http_port: HTTP_PORT,
            https_port: HTTPS_PORT,
            cert_file: PathBuf::from(variant.default_cert_file()),
            key_file: PathBuf::from(variant.default_key_file()),
        }
    }
}
