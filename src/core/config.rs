use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.tricount.bunq.com";
pub const DEFAULT_KEY_BITS: usize = 2048;
pub const DEFAULT_CURRENCY: &str = "EUR";

const ACCESS_KEY_VAR: &str = "TRICOUNT_KEY";
const APP_ID_VAR: &str = "APP_ID";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_key_bits() -> usize {
    DEFAULT_KEY_BITS
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TricountConfig {
    /// Public identifier token of the tricount, as found in its share link.
    #[serde(default)]
    pub access_key: String,
    /// Stable installation id; a random one is generated per run when unset.
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,
}

impl Default for TricountConfig {
    fn default() -> Self {
        TricountConfig {
            access_key: String::new(),
            app_id: None,
            base_url: default_base_url(),
            key_bits: default_key_bits(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub tricount: TricountConfig,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            tricount: TricountConfig::default(),
            currency: default_currency(),
        }
    }
}

/// Settings handed to the API client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub access_key: String,
    pub app_id: Option<String>,
    pub base_url: String,
    pub key_bits: usize,
    pub currency: String,
}

impl AppConfig {
    /// Loads the default config file if there is one, then applies the
    /// environment overrides.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!(
                "No config file at {}, relying on environment",
                config_path.display()
            );
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "tricount-report", "tricount")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies `TRICOUNT_KEY` and `APP_ID`, reading a `.env` file first if present.
    pub fn with_env_overrides(self) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        self.with_overrides(
            std::env::var(ACCESS_KEY_VAR).ok(),
            std::env::var(APP_ID_VAR).ok(),
        )
    }

    /// Non-empty values replace the ones from the config file.
    pub fn with_overrides(mut self, access_key: Option<String>, app_id: Option<String>) -> Self {
        if let Some(key) = access_key.filter(|k| !k.trim().is_empty()) {
            debug!("Using access key from {ACCESS_KEY_VAR}");
            self.tricount.access_key = key;
        }
        if let Some(id) = app_id.filter(|id| !id.trim().is_empty()) {
            debug!("Using app id from {APP_ID_VAR}");
            self.tricount.app_id = Some(id);
        }
        self
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let access_key = self.tricount.access_key.trim();
        if access_key.is_empty() {
            bail!(
                "Missing tricount access key: set tricount.access_key in the config file or {ACCESS_KEY_VAR}"
            );
        }
        Ok(ClientConfig {
            access_key: access_key.to_string(),
            app_id: self
                .tricount
                .app_id
                .as_ref()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            base_url: self.tricount.base_url.trim_end_matches('/').to_string(),
            key_bits: self.tricount.key_bits,
            currency: self.currency.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
tricount:
  access_key: "tZqzdVuUqIcJBaTVmo"
  app_id: "6f1c2b6e-0000-4000-8000-000000000001"
currency: "CHF"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.tricount.access_key, "tZqzdVuUqIcJBaTVmo");
        assert_eq!(
            config.tricount.app_id.as_deref(),
            Some("6f1c2b6e-0000-4000-8000-000000000001")
        );
        assert_eq!(config.tricount.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.tricount.key_bits, DEFAULT_KEY_BITS);
        assert_eq!(config.currency, "CHF");

        let yaml_str_with_overrides = r#"
tricount:
  access_key: "abc"
  base_url: "http://localhost:8080/"
  key_bits: 1024
        "#;
        let config: AppConfig = serde_yaml::from_str(yaml_str_with_overrides).unwrap();
        assert!(config.tricount.app_id.is_none());
        assert_eq!(config.currency, DEFAULT_CURRENCY);

        let client_config = config.client_config().unwrap();
        assert_eq!(client_config.base_url, "http://localhost:8080");
        assert_eq!(client_config.key_bits, 1024);
        assert!(client_config.app_id.is_none());
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let config = AppConfig::default().with_overrides(Some("env-key".into()), None);
        assert_eq!(config.tricount.access_key, "env-key");
        assert!(config.tricount.app_id.is_none());

        let config = config.with_overrides(Some("  ".into()), Some("app-1".into()));
        assert_eq!(config.tricount.access_key, "env-key");
        assert_eq!(config.tricount.app_id.as_deref(), Some("app-1"));
    }

    #[test]
    fn test_missing_access_key_is_an_error() {
        let err = AppConfig::default().client_config().unwrap_err();
        assert!(err.to_string().contains("Missing tricount access key"));
    }

    #[test]
    fn test_blank_app_id_is_ignored() {
        let mut config = AppConfig::default().with_overrides(Some("key".into()), None);
        config.tricount.app_id = Some(" ".to_string());
        assert!(config.client_config().unwrap().app_id.is_none());
    }
}
