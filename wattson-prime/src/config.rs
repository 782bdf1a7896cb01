use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jiff::tz::TimeZone;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub board: BoardConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address for the HTTP server to listen on
    pub http_addr: SocketAddr,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory {
        /// JSON file with device documents to start from
        #[serde(default)]
        seed: Option<PathBuf>,
        /// Start from the built-in demo household
        #[serde(default)]
        demo: bool,
    },
    Sqlite {
        path: PathBuf,
        #[serde(default)]
        seed: Option<PathBuf>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// How long a toggle waits on the store before rolling back
    pub toggle_timeout_ms: u64,
    /// IANA zone used for day keys; the system zone when unset
    pub timezone: Option<String>,
    /// Devices listed in the power summary when no limit is given
    pub top_devices: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            toggle_timeout_ms: 5000,
            timezone: None,
            top_devices: 3,
        }
    }
}

impl BoardConfig {
    pub fn toggle_timeout(&self) -> Duration {
        Duration::from_millis(self.toggle_timeout_ms)
    }

    pub fn time_zone(&self) -> color_eyre::Result<TimeZone> {
        match &self.timezone {
            Some(name) => Ok(TimeZone::get(name)?),
            None => Ok(TimeZone::system()),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            },
            store: StoreConfig::Memory {
                seed: None,
                demo: true,
            },
            board: BoardConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sqlite_config() {
        let config: Config = toml::from_str(
            r#"
            [server]
            http_addr = "127.0.0.1:3000"

            [store]
            type = "sqlite"
            path = "wattson.db"

            [board]
            toggle_timeout_ms = 250
            timezone = "Asia/Jakarta"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.http_addr.port(), 3000);
        assert!(matches!(
            config.store,
            StoreConfig::Sqlite { ref path, seed: None } if path == Path::new("wattson.db")
        ));
        assert_eq!(config.board.toggle_timeout(), Duration::from_millis(250));
        assert_eq!(config.board.top_devices, 3);
    }

    #[test]
    fn test_board_section_is_optional() {
        let config: Config = toml::from_str(
            r#"
            [server]
            http_addr = "0.0.0.0:8080"

            [store]
            type = "memory"
            seed = "seed/devices.json"
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.store,
            StoreConfig::Memory { seed: Some(_), demo: false }
        ));
        assert_eq!(config.board.toggle_timeout_ms, 5000);
        assert!(config.board.timezone.is_none());
    }

    #[test]
    fn test_unknown_timezone_is_an_error() {
        let board = BoardConfig {
            timezone: Some("Mars/Olympus_Mons".to_string()),
            ..BoardConfig::default()
        };
        assert!(board.time_zone().is_err());
    }

    #[test]
    fn test_default_serves_demo_data() {
        let config = Config::default();
        assert_eq!(config.server.http_addr.port(), 8080);
        assert!(matches!(config.store, StoreConfig::Memory { demo: true, .. }));
    }
}
