//! Configuration loaders.
//!
//! - [`load_batch_config`] reads `refarch.toml` from the walk root and falls
//!   back to defaults when the file is missing or malformed.
//! - [`load_server_config`] applies the `CERT_FILE` / `KEY_FILE` overrides on
//!   top of the variant's fixed defaults.

use std::path::{Path, PathBuf};

use refarch_types::config::{
    BATCH_CONFIG_FILE, BatchConfig, CERT_FILE_ENV, KEY_FILE_ENV, ServerConfig, ServerVariant,
};

/// Load batch configuration from `{root}/refarch.toml`.
///
/// - If the file does not exist, returns [`BatchConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_batch_config(root: &Path) -> BatchConfig {
    let config_path = root.join(BATCH_CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {BATCH_CONFIG_FILE} found at {}, using defaults", config_path.display());
            return BatchConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return BatchConfig::default();
        }
    };

    match toml::from_str::<BatchConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            BatchConfig::default()
        }
    }
}

/// Build the server configuration from the process environment.
pub fn load_server_config(variant: ServerVariant) -> ServerConfig {
    server_config_from(variant, |key| std::env::var(key).ok())
}

/// Build the server configuration using `lookup` for environment values.
///
/// Unset and empty values both fall back to the variant default.
pub fn server_config_from(
    variant: ServerVariant,
    lookup: impl Fn(&str) -> Option<String>,
) -> ServerConfig {
    let mut config = ServerConfig::for_variant(variant);
    if let Some(cert) = non_empty(lookup(CERT_FILE_ENV)) {
        config.cert_file = PathBuf::from(cert);
    }
    if let Some(key) = non_empty(lookup(KEY_FILE_ENV)) {
        config.key_file = PathBuf::from(key);
    }
    config
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
