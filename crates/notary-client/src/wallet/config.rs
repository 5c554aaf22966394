//! INI-style configuration (§6, §4.13).
//!
//! Sections `wallet`, `latency`, `security`, `logging`, matching
//! `original_source/src/server/ConfigLoader.cpp`'s section names.

use std::path::Path;

use crate::error::{Error, KeyStoreError};

/// `latency` section: timeouts and retry policy (§5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LatencyConfig {
    pub send_timeout_ms: u64,
    pub recv_timeout_ms: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: 5_000,
            recv_timeout_ms: 10_000,
            retry_count: 3,
            retry_delay_ms: 500,
        }
    }
}

/// `wallet` section: data folder and wallet filename.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletSectionConfig {
    pub data_folder: String,
    pub wallet_filename: String,
}

impl Default for WalletSectionConfig {
    fn default() -> Self {
        Self {
            data_folder: ".notary".into(),
            wallet_filename: "wallet.dat".into(),
        }
    }
}

/// `security` section: master-key timeout, keyring backend selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityConfig {
    pub master_key_timeout_secs: Option<u64>,
    pub keyring_backend: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            master_key_timeout_secs: None,
            keyring_backend: "flatfile".into(),
        }
    }
}

/// `logging` section: tracing filter directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".into() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub wallet: WalletSectionConfig,
    pub latency: LatencyConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let i = ini::Ini::load_from_file(path)
            .map_err(|e| Error::KeyStore(KeyStoreError::Config(e.to_string())))?;
        Ok(Self::from_ini(&i))
    }

    pub fn parse_str(contents: &str) -> Result<Self, Error> {
        let i = ini::Ini::load_from_str(contents)
            .map_err(|e| Error::KeyStore(KeyStoreError::Config(e.to_string())))?;
        Ok(Self::from_ini(&i))
    }

    fn from_ini(i: &ini::Ini) -> Self {
        let mut cfg = Config::default();

        if let Some(section) = i.section(Some("wallet")) {
            if let Some(v) = section.get("data_folder") {
                cfg.wallet.data_folder = v.to_string();
            }
            if let Some(v) = section.get("wallet_filename") {
                cfg.wallet.wallet_filename = v.to_string();
            }
        }

        if let Some(section) = i.section(Some("latency")) {
            if let Some(v) = section.get("send_timeout_ms").and_then(|v| v.parse().ok()) {
                cfg.latency.send_timeout_ms = v;
            }
            if let Some(v) = section.get("recv_timeout_ms").and_then(|v| v.parse().ok()) {
                cfg.latency.recv_timeout_ms = v;
            }
            if let Some(v) = section.get("retry_count").and_then(|v| v.parse().ok()) {
                cfg.latency.retry_count = v;
            }
            if let Some(v) = section.get("retry_delay_ms").and_then(|v| v.parse().ok()) {
                cfg.latency.retry_delay_ms = v;
            }
        }

        if let Some(section) = i.section(Some("security")) {
            if let Some(v) = section.get("master_key_timeout_secs").and_then(|v| v.parse().ok()) {
                cfg.security.master_key_timeout_secs = Some(v);
            }
            if let Some(v) = section.get("keyring_backend") {
                cfg.security.keyring_backend = v.to_string();
            }
        }

        if let Some(section) = i.section(Some("logging")) {
            if let Some(v) = section.get("filter") {
                cfg.logging.filter = v.to_string();
            }
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_four_sections() {
        let ini = "\
[wallet]
data_folder = /tmp/data
wallet_filename = my_wallet.dat

[latency]
send_timeout_ms = 1000
retry_count = 5

[security]
keyring_backend = flatfile

[logging]
filter = debug
";
        let cfg = Config::parse_str(ini).unwrap();
        assert_eq!(cfg.wallet.data_folder, "/tmp/data");
        assert_eq!(cfg.wallet.wallet_filename, "my_wallet.dat");
        assert_eq!(cfg.latency.send_timeout_ms, 1000);
        assert_eq!(cfg.latency.retry_count, 5);
        assert_eq!(cfg.security.keyring_backend, "flatfile");
        assert_eq!(cfg.logging.filter, "debug");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg = Config::parse_str("").unwrap();
        assert_eq!(cfg, Config::default());
    }
}
