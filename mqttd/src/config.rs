//! TOML configuration for the daemon: listen address, session tuning knobs,
//! auth, and logging. `mqtt-session` itself has no opinion on any of these;
//! they exist purely to wire a runnable daemon together.

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionSettings,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file `{}`: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("failed to parse config file `{}`: {e}", path.display()))?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    1883
}

/// Knobs that flow straight into `mqtt_session::SessionConfig`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub max_client_id_len: usize,
    pub retry_interval_seconds: u64,
    pub keepalive_factor: f64,
    pub cache_acl: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let defaults = mqtt_session::SessionConfig::default();
        SessionSettings {
            max_client_id_len: defaults.max_client_id_len,
            retry_interval_seconds: defaults.retry_interval_seconds,
            keepalive_factor: defaults.keepalive_factor,
            cache_acl: defaults.cache_acl,
        }
    }
}

impl From<&SessionSettings> for mqtt_session::SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        mqtt_session::SessionConfig {
            max_client_id_len: settings.max_client_id_len,
            retry_interval_seconds: settings.retry_interval_seconds,
            keepalive_factor: settings.keepalive_factor,
            cache_acl: settings.cache_acl,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false, every CONNECT is accepted regardless of credentials.
    pub require_auth: bool,
    /// `username:hash` (or `username:plaintext`) lines, loaded at startup.
    pub password_file: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 1883);
        assert!(!config.auth.require_auth);
        assert!(config.session.cache_acl);
    }

    #[test]
    fn parses_partial_overrides() {
        let toml = r#"
            [server]
            port = 8883

            [auth]
            require_auth = true
            password_file = "/etc/mqttd/passwd"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8883);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.auth.require_auth);
        assert_eq!(config.auth.password_file.as_deref(), Some("/etc/mqttd/passwd"));
    }

    #[test]
    fn session_settings_convert_to_session_config() {
        let settings = SessionSettings {
            max_client_id_len: 256,
            retry_interval_seconds: 15,
            keepalive_factor: 1.5,
            cache_acl: false,
        };
        let session_config: mqtt_session::SessionConfig = (&settings).into();
        assert_eq!(session_config.max_client_id_len, 256);
        assert_eq!(session_config.retry_interval_seconds, 15);
        assert_eq!(session_config.keepalive_factor, 1.5);
        assert!(!session_config.cache_acl);
    }
}
