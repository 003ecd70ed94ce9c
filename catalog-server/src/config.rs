use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load the configuration from a YAML file.
    pub fn load(yml_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let yml_path = yml_path.as_ref();
        let yml = std::fs::read_to_string(yml_path)
            .with_context(|| format!("Reading {}", yml_path.display()))?;
        let config = serde_yaml::from_str(&yml)
            .with_context(|| format!("Parsing {}", yml_path.display()))?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file means "use the defaults".
    /// Load the file if it exists. `None` means the caller should fall back to defaults.
    pub fn load_if_present(yml_path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let yml_path = yml_path.as_ref();
        if yml_path.exists() {
            Self::load(yml_path).map(Some)
        } else {
            Ok(None)
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub tls: Option<TLSConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:3000".into(),
            tls: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TLSConfig {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/catalog.db".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Where sessions are saved between restarts. Sessions live only in memory when unset.
    pub session_storage_path: Option<String>,
    pub session_ttl_hours: i64,
    /// Ingredient deletion is open to anonymous visitors unless this is set.
    pub require_login_for_ingredient_delete: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_storage_path: None,
            session_ttl_hours: 24 * 14,
            require_login_for_ingredient_delete: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub root: String,
    pub url: String,
    pub max_upload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: "data/media".into(),
            url: "/media/".into(),
            max_upload_bytes: 10 << 20,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write JSON access logs here, rotated daily. Logs go to stdout when unset.
    pub directory: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let config: Config = serde_yaml::from_str(
            "
server:
  address: 127.0.0.1:8000
auth:
  require_login_for_ingredient_delete: true
",
        )
        .unwrap();
        assert_eq!(config.server.address, "127.0.0.1:8000");
        assert!(config.server.tls.is_none());
        assert!(config.auth.require_login_for_ingredient_delete);
        assert_eq!(config.auth.session_ttl_hours, 336);
        assert_eq!(config.database.path, "data/catalog.db");
        assert_eq!(config.media.url, "/media/");
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(Config::load_if_present("does/not/exist.yml").unwrap().is_none());
        assert_eq!(Config::default().server.address, "0.0.0.0:3000");
    }

    #[test]
    fn example_file_parses() {
        let config =
            Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/../catalog.example.yml")).unwrap();
        assert_eq!(config.media.max_upload_bytes, 10 << 20);
        assert_eq!(config.logging.directory.as_deref(), Some("data/logs"));
        assert_eq!(config.auth.session_storage_path.as_deref(), Some("data/sessions.json"));
    }
}
