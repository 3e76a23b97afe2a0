//! Configuration management for the Book Inventory server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{env, path::PathBuf};

/// Database URL selecting the in-process store instead of PostgreSQL
pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with(MEMORY_DATABASE_URL)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the API; `*` allows any
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory uploaded images are written to
    pub root: PathBuf,
    /// Public prefix of stored images. A path (`/media`) is served by this
    /// server, a full URL points at an external host.
    pub url: String,
}

impl MediaConfig {
    pub fn is_served_locally(&self) -> bool {
        self.url.starts_with('/')
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let cors_origins = env::var("CORS_ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        });

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // BOOK_INVENTORY_AUTH__JWT_SECRET=... sets auth.jwt_secret
            .add_source(
                Environment::with_prefix("BOOK_INVENTORY")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .set_override_option("cors.allowed_origins", cors_origins)?
            .build()?;

        Self::from_config(config)
    }

    /// Deserialize already merged sources; unset keys keep their defaults
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: MEMORY_DATABASE_URL.to_string(),
            max_connections: 10,
            min_connections: 1,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "replace-me-with-a-secret-key".to_string(),
            access_token_minutes: 60,
            refresh_token_hours: 24,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            url: "/media".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn default_config_uses_memory_store_and_local_media() {
        let config = AppConfig::default();
        assert!(config.database.is_memory());
        assert!(config.media.is_served_locally());
        assert_eq!(config.auth.access_token_minutes, 60);
        assert_eq!(config.auth.refresh_token_hours, 24);
    }

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let config = Config::builder()
            .set_override("database.url", "postgres://u:p@localhost/db")
            .unwrap()
            .build()
            .unwrap();

        let config = AppConfig::from_config(config).unwrap();
        assert_eq!(config.database.url, "postgres://u:p@localhost/db");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn partial_file_sections_fall_back_to_defaults() {
        let toml = r#"
            [auth]
            jwt_secret = "from-file"

            [media]
            url = "https://cdn.example.com/media"
        "#;
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap();

        let config = AppConfig::from_config(config).unwrap();
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.access_token_minutes, 60);
        assert_eq!(config.media.root, PathBuf::from("media"));
        assert!(!config.media.is_served_locally());
    }

    #[test]
    fn external_media_url_is_not_served_locally() {
        let media = MediaConfig {
            root: PathBuf::from("media"),
            url: "https://cdn.example.com/media".to_string(),
        };
        assert!(!media.is_served_locally());
    }
}
