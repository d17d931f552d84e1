//! Configuration loading for the roomsync CLI.
//!
//! Configuration is loaded from a TOML file (default: `roomsync.toml`).
//! Every section and key is optional; a missing file means all defaults.

use roomsync_client::SyncConfig;
use roomsync_types::{RoomId, SenderIdentity};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "roomsync.toml";

/// Root configuration for the CLI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Sync engine settings.
    #[serde(default)]
    pub client: ClientConfig,
    /// Who messages are sent as.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Demo command settings.
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Sync engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Delay before resubscribing a lost feed in milliseconds (default: 5000).
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Optional bound on waiting for a subscribe acknowledgement.
    pub subscribe_timeout_ms: Option<u64>,
}

/// Sender identity.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Backend user id (default: "demo-user").
    #[serde(default = "default_sender_id")]
    pub sender_id: String,
    /// Display nickname; the sender id is shown when absent.
    pub nickname: Option<String>,
}

/// Demo command settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    /// Room to open (default: "general").
    #[serde(default = "default_room")]
    pub room: String,
}

// Default value functions
fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_sender_id() -> String {
    "demo-user".to_string()
}

fn default_room() -> String {
    "general".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            subscribe_timeout_ms: None,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            sender_id: default_sender_id(),
            nickname: None,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            room: default_room(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `path` (or `roomsync.toml`), falling back to defaults when the
    /// file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Engine configuration derived from `[client]`.
    pub fn sync_config(&self) -> SyncConfig {
        let config = SyncConfig::new()
            .with_reconnect_delay(Duration::from_millis(self.client.reconnect_delay_ms));
        match self.client.subscribe_timeout_ms {
            Some(ms) => config.with_subscribe_timeout(Duration::from_millis(ms)),
            None => config,
        }
    }

    /// Sender identity derived from `[identity]`.
    pub fn sender(&self) -> SenderIdentity {
        let sender = SenderIdentity::new(self.identity.sender_id.clone());
        match &self.identity.nickname {
            Some(nickname) => sender.with_nickname(nickname.clone()),
            None => sender,
        }
    }

    /// Room opened by the demo.
    pub fn room_id(&self) -> RoomId {
        RoomId::new(self.demo.room.clone())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.client.reconnect_delay_ms, 5_000);
        assert_eq!(config.identity.sender_id, "demo-user");
        assert_eq!(config.demo.room, "general");
        assert_eq!(config.sync_config(), SyncConfig::default());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[client]
reconnect_delay_ms = 250
subscribe_timeout_ms = 2000

[identity]
sender_id = "u42"
nickname = "ada"

[demo]
room = "random"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        let sync = config.sync_config();
        assert_eq!(sync.reconnect_delay, Duration::from_millis(250));
        assert_eq!(sync.subscribe_timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.sender(), SenderIdentity::new("u42").with_nickname("ada"));
        assert_eq!(config.room_id(), RoomId::new("random"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config = toml::from_str("[identity]\nnickname = \"bob\"\n").unwrap();
        assert_eq!(config.identity.sender_id, "demo-user");
        assert_eq!(config.client.reconnect_delay_ms, 5_000);
        assert_eq!(config.demo.room, "general");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_or_default(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.demo.room, "general");
    }

    #[test]
    fn invalid_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roomsync.toml");
        std::fs::write(&path, "[client]\nreconnect_delay_ms = \"soon\"\n").unwrap();

        let err = Config::load_or_default(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("roomsync.toml"));
    }

    #[test]
    fn unreadable_path_is_read_error() {
        let dir = tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
