//! Process-wide configuration, loaded from a TOML file and environment
//! overrides, covering every option in the external configuration surface:
//! `upstream_mode`, `upstream_url`, `server_endpoint`,
//! `object_cache_weight_max`, `store_raw_trx`, `heap_idle_size_max`,
//! `data_dir`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utxoidx_client::UpstreamMode;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamModeConfig {
    FullNode,
    RawBlockService,
}

impl From<UpstreamModeConfig> for UpstreamMode {
    fn from(mode: UpstreamModeConfig) -> Self {
        match mode {
            UpstreamModeConfig::FullNode => UpstreamMode::FullNode,
            UpstreamModeConfig::RawBlockService => UpstreamMode::RawBlockService,
        }
    }
}

/// The full set of recognised options, deserialized directly from TOML.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upstream_mode: UpstreamModeConfig,
    pub upstream_url: String,
    pub server_endpoint: SocketAddr,
    pub object_cache_weight_max: u64,
    pub store_raw_trx: bool,
    pub heap_idle_size_max: u64,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let state_defaults = utxoidx_state::Config::default();
        Self {
            upstream_mode: UpstreamModeConfig::FullNode,
            upstream_url: "http://127.0.0.1:8332".to_string(),
            server_endpoint: "127.0.0.1:8080".parse().expect("valid default socket addr"),
            object_cache_weight_max: state_defaults.object_cache_weight_max,
            store_raw_trx: state_defaults.store_raw_trx,
            heap_idle_size_max: 256 * 1024 * 1024,
            data_dir: state_defaults.data_dir,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn state_config(&self) -> utxoidx_state::Config {
        utxoidx_state::Config {
            data_dir: self.data_dir.clone(),
            store_raw_trx: self.store_raw_trx,
            object_cache_weight_max: self.object_cache_weight_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_valid_server_endpoint() {
        let config = Config::default();
        assert_eq!(config.server_endpoint.port(), 8080);
    }

    #[test]
    fn parses_a_minimal_toml_document() {
        let text = r#"
            upstream_mode = "raw_block_service"
            upstream_url = "http://example.invalid:9000"
            server_endpoint = "0.0.0.0:9090"
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.upstream_mode, UpstreamModeConfig::RawBlockService);
        assert_eq!(config.upstream_url, "http://example.invalid:9000");
    }
}
