use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::token::DEFAULT_TOKEN_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Explicit model → endpoint-path overrides; anything not listed falls
    /// back to the built-in ERNIE family mapping.
    #[serde(default)]
    pub models: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Environment variable holding the `client_id|client_secret` pair.
    #[serde(default = "default_key_env")]
    pub key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

fn default_port() -> u16 {
    3000
}

fn default_key_env() -> String {
    "ERNIE_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://aip.baidubce.com".to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
            base_url: default_base_url(),
            token_url: default_token_url(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            channel: ChannelConfig::default(),
            models: HashMap::new(),
        }
    }
}

impl RelayConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file, falling back to the
    /// built-in defaults when none exists (only the credential env var is
    /// truly required to run).
    /// Priority: CLI arg > CWD > XDG config > home dir.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(&candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Resolve the composite credential key from the configured
    /// environment variable.
    pub fn resolve_credential(&self) -> Result<String> {
        std::env::var(&self.channel.key_env).map_err(|_| {
            RelayError::config(format!(
                "Environment variable '{}' not set. Set it to your \
                 client_id|client_secret pair.",
                self.channel.key_env
            ))
        })
    }
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("ernie-relay.toml"));

    // XDG / platform config dir
    if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("ernie-relay")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("ernie-relay").join("config.toml"));
        }
        if let Some(home) = home_dir() {
            paths.push(home.join(".config").join("ernie-relay").join("config.toml"));
        }
    }

    // Home directory fallback
    if let Some(home) = home_dir() {
        paths.push(home.join(".ernie-relay.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 5000

[channel]
key_env = "MY_ERNIE_KEY"
base_url = "http://localhost:9000"

[models]
"ERNIE-Bot-8K" = "ernie_bot_8k"
"#
        )
        .unwrap();

        let config = RelayConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.channel.key_env, "MY_ERNIE_KEY");
        assert_eq!(config.channel.base_url, "http://localhost:9000");
        // Unset fields keep their defaults.
        assert_eq!(config.channel.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(
            config.models.get("ERNIE-Bot-8K"),
            Some(&"ernie_bot_8k".to_string())
        );
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let f = NamedTempFile::new().unwrap();
        let config = RelayConfig::load(f.path()).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.channel.key_env, "ERNIE_API_KEY");
        assert_eq!(config.channel.base_url, "https://aip.baidubce.com");
    }

    #[test]
    fn test_resolve_credential_missing_env() {
        let config = RelayConfig {
            channel: ChannelConfig {
                key_env: "ERNIE_RELAY_TEST_UNSET_VAR".to_string(),
                ..ChannelConfig::default()
            },
            ..RelayConfig::default()
        };

        let err = config.resolve_credential().unwrap_err();
        assert!(err.to_string().contains("ERNIE_RELAY_TEST_UNSET_VAR"));
    }
}
