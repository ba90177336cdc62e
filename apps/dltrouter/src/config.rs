//! Daemon configuration.
//!
//! Configuration is stored as TOML at, in order of precedence:
//! - the `--config` command line argument
//! - `$DLTROUTER_CONFIG`
//! - `$XDG_CONFIG_HOME/dltrouter/dltrouter.toml`
//! - `~/.config/dltrouter/dltrouter.toml`

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use dltrouter_dlt_channel::{ChannelConfig, DEFAULT_BURST_COUNT, DEFAULT_BURST_INTERVAL, MAX_CHUNK_LEN};
use dltrouter_protocol::{DEFAULT_ECU_ID, DltId};
use dltrouter_transfer::{CHUNK_SIZE, MAX_TRANSFER_SLOTS, TransferConfig};
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "DLTROUTER_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// ECU id stamped on every outgoing DLT message.
    #[serde(default = "default_ecu_id")]
    pub ecu_id: DltId,

    /// Where DLT messages are sent.
    #[serde(default = "default_udp_target")]
    pub udp_target: SocketAddr,

    /// Where applications send their records.
    #[serde(default = "default_ingress")]
    pub ingress: SocketAddr,

    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub file_transfer: FileTransferSection,
}

/// The `[file_transfer]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransferSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bytes of file content per DLT message.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_transfers: usize,

    #[serde(default = "default_max_pending")]
    pub max_pending_transfers: usize,

    /// Messages sent back to back before pacing; 0 disables pacing.
    #[serde(default = "default_burst_count")]
    pub burst_count: u32,

    #[serde(default = "default_burst_interval_ms")]
    pub burst_interval_ms: u64,
}

fn default_ecu_id() -> DltId {
    DEFAULT_ECU_ID
}

fn default_udp_target() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3490))
}

fn default_ingress() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3491))
}

fn default_log_level() -> String {
    "info".into()
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    CHUNK_SIZE
}

fn default_max_concurrent() -> usize {
    TransferConfig::default().max_concurrent_transfers
}

fn default_max_pending() -> usize {
    TransferConfig::default().max_pending_transfers
}

fn default_burst_count() -> u32 {
    DEFAULT_BURST_COUNT
}

fn default_burst_interval_ms() -> u64 {
    u64::try_from(DEFAULT_BURST_INTERVAL.as_millis()).unwrap_or(u64::MAX)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ecu_id: default_ecu_id(),
            udp_target: default_udp_target(),
            ingress: default_ingress(),
            log_level: default_log_level(),
            file_transfer: FileTransferSection::default(),
        }
    }
}

impl Default for FileTransferSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            chunk_size: default_chunk_size(),
            max_concurrent_transfers: default_max_concurrent(),
            max_pending_transfers: default_max_pending(),
            burst_count: default_burst_count(),
            burst_interval_ms: default_burst_interval_ms(),
        }
    }
}

/// Logging setup applied once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
}

impl Config {
    /// Loads the configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path(
            std::env::var(CONFIG_ENV).ok(),
            std::env::var("XDG_CONFIG_HOME").ok(),
            std::env::var("HOME").ok(),
        );
        Self::load_from(&path)
    }

    /// Loads `path`, writing the defaults there first if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
        } else {
            let config = Config::default();
            config.save_to(path)?;
            config
        };
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Rejects values the transfer pipeline cannot honor.
    pub fn validate(&self) -> anyhow::Result<()> {
        let ft = &self.file_transfer;
        anyhow::ensure!(
            (1..=MAX_CHUNK_LEN).contains(&ft.chunk_size),
            "file_transfer.chunk_size must be between 1 and {MAX_CHUNK_LEN}, got {}",
            ft.chunk_size
        );
        anyhow::ensure!(
            (1..=MAX_TRANSFER_SLOTS).contains(&ft.max_concurrent_transfers),
            "file_transfer.max_concurrent_transfers must be between 1 and {MAX_TRANSFER_SLOTS}, got {}",
            ft.max_concurrent_transfers
        );
        anyhow::ensure!(
            ft.max_pending_transfers <= MAX_TRANSFER_SLOTS,
            "file_transfer.max_pending_transfers must be at most {MAX_TRANSFER_SLOTS}, got {}",
            ft.max_pending_transfers
        );
        anyhow::ensure!(
            self.udp_target != self.ingress,
            "udp_target and ingress must differ ({})",
            self.ingress
        );
        Ok(())
    }

    pub fn transfer_config(&self) -> TransferConfig {
        let ft = &self.file_transfer;
        TransferConfig {
            enabled: ft.enabled,
            chunk_size: ft.chunk_size,
            max_concurrent_transfers: ft.max_concurrent_transfers,
            max_pending_transfers: ft.max_pending_transfers,
        }
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            ecu_id: self.ecu_id,
            burst_count: self.file_transfer.burst_count,
            burst_interval: Duration::from_millis(self.file_transfer.burst_interval_ms),
        }
    }

    pub fn logging(&self, verbose: bool) -> LoggingConfig {
        LoggingConfig {
            default_filter: if verbose {
                "debug".into()
            } else {
                self.log_level.clone()
            },
        }
    }
}

/// Resolves the configuration file location from the environment.
fn config_path(explicit: Option<String>, xdg_config_home: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    let base = match xdg_config_home.filter(|p| !p.is_empty()) {
        Some(xdg) => PathBuf::from(xdg),
        None => PathBuf::from(home.unwrap_or_else(|| "/tmp".into())).join(".config"),
    };
    base.join("dltrouter").join("dltrouter.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dltrouter_dlt_channel::MAX_PAYLOAD_LEN;
    use dltrouter_dlt_channel::verbose::PACKET_OVERHEAD;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.ecu_id.as_str(), "ECU1");
        assert_eq!(config.udp_target.port(), 3490);
        assert_eq!(config.ingress.port(), 3491);
        assert_eq!(config.log_level, "info");
        assert!(config.file_transfer.enabled);
        assert_eq!(config.file_transfer.chunk_size, 1024);
        assert_eq!(config.file_transfer.burst_count, 5);
        assert_eq!(config.file_transfer.burst_interval_ms, 5);
        config.validate().unwrap();
    }

    #[test]
    fn config_partial_toml() {
        let toml_str = r#"
            ecu_id = "ECU9"

            [file_transfer]
            chunk_size = 4096
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ecu_id.as_str(), "ECU9");
        assert_eq!(config.file_transfer.chunk_size, 4096);
        assert_eq!(config.file_transfer.max_concurrent_transfers, 4);
        assert_eq!(config.udp_target, default_udp_target());
    }

    #[test]
    fn invalid_ecu_id_rejected() {
        let result: Result<Config, _> = toml::from_str(r#"ecu_id = "TOOLONG""#);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.file_transfer.chunk_size = 0;
        assert!(config.validate().is_err());

        config.file_transfer.chunk_size = MAX_CHUNK_LEN + 1;
        assert!(config.validate().is_err());

        config.file_transfer.chunk_size = MAX_CHUNK_LEN;
        config.validate().unwrap();

        // Fits the DLT length field but not a UDP datagram.
        config.file_transfer.chunk_size = MAX_PAYLOAD_LEN - PACKET_OVERHEAD;
        assert!(config.validate().is_err());
        config.file_transfer.chunk_size = CHUNK_SIZE;

        config.file_transfer.max_concurrent_transfers = 0;
        assert!(config.validate().is_err());

        config.file_transfer.max_concurrent_transfers = MAX_TRANSFER_SLOTS + 1;
        assert!(config.validate().is_err());
        config.file_transfer.max_concurrent_transfers = MAX_TRANSFER_SLOTS;
        config.file_transfer.max_pending_transfers = MAX_TRANSFER_SLOTS;
        config.validate().unwrap();
        config.file_transfer.max_pending_transfers = usize::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ingress = config.udp_target;
        assert!(config.validate().is_err());
    }

    #[test]
    fn derived_configs() {
        let mut config = Config::default();
        config.file_transfer.enabled = false;
        config.file_transfer.burst_interval_ms = 12;

        let transfer = config.transfer_config();
        assert!(!transfer.enabled);
        assert_eq!(transfer.chunk_size, 1024);

        let channel = config.channel_config();
        assert_eq!(channel.ecu_id, config.ecu_id);
        assert_eq!(channel.burst_interval, Duration::from_millis(12));

        assert_eq!(config.logging(false).default_filter, "info");
        assert_eq!(config.logging(true).default_filter, "debug");
    }

    #[test]
    fn config_path_precedence() {
        assert_eq!(
            config_path(Some("/etc/dlt.toml".into()), Some("/xdg".into()), Some("/home/u".into())),
            PathBuf::from("/etc/dlt.toml")
        );
        assert_eq!(
            config_path(None, Some("/xdg".into()), Some("/home/u".into())),
            PathBuf::from("/xdg/dltrouter/dltrouter.toml")
        );
        assert_eq!(
            config_path(Some(String::new()), None, Some("/home/u".into())),
            PathBuf::from("/home/u/.config/dltrouter/dltrouter.toml")
        );
    }

    #[test]
    fn load_creates_default_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("dltrouter.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("dltrouter.toml");

        let mut config = Config::default();
        config.ecu_id = DltId::new("TST").unwrap();
        config.udp_target = "10.0.0.2:3490".parse().unwrap();
        config.file_transfer.max_pending_transfers = 2;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("dltrouter.toml");
        std::fs::write(&path, "udp_target = 42").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }
}
