//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `forum.db` in the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Human-readable name for this portal instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Campus Forum"`
    pub instance_name: String,

    /// Bearer token for the identity sync endpoint under `/admin`.
    /// Env: `ADMIN_TOKEN`
    /// Default: empty (admin API disabled).
    pub admin_token: Option<String>,

    /// Force the global posting lock on or off at startup.
    /// Env: `CHAT_LOCKED` (true/false)
    /// Default: unset (keep the stored value).
    pub chat_locked: Option<bool>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], campus_shared::constants::DEFAULT_HTTP_PORT).into(),
            database_path: None,
            instance_name: campus_shared::constants::APP_NAME.to_string(),
            admin_token: None,
            chat_locked: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(token) = lookup("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if let Some(val) = lookup("CHAT_LOCKED") {
            match val.as_str() {
                "true" | "1" => config.chat_locked = Some(true),
                "false" | "0" => config.chat_locked = Some(false),
                _ => tracing::warn!(value = %val, "Invalid CHAT_LOCKED, ignoring"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert!(config.database_path.is_none());
        assert!(config.admin_token.is_none());
        assert!(config.chat_locked.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/tmp/forum.db"),
            ("INSTANCE_NAME", "North Campus"),
            ("ADMIN_TOKEN", "s3cret"),
            ("CHAT_LOCKED", "true"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/forum.db")));
        assert_eq!(config.instance_name, "North Campus");
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
        assert_eq!(config.chat_locked, Some(true));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = load(&[
            ("HTTP_ADDR", "not an address"),
            ("ADMIN_TOKEN", ""),
            ("CHAT_LOCKED", "maybe"),
        ]);
        assert_eq!(config.http_addr, ServerConfig::default().http_addr);
        assert!(config.admin_token.is_none());
        assert!(config.chat_locked.is_none());
    }
}
