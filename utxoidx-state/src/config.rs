//! On-disk layout configuration for the four logical stores.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the four logical stores live on disk, and how large the in-memory
/// sled caches are allowed to grow.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parent directory for the four store subdirectories.
    pub data_dir: PathBuf,

    /// Whether raw transaction bytes are persisted in `raw_trx_store`.
    pub store_raw_trx: bool,

    /// Slot-cache weight above which a flush is triggered.
    pub object_cache_weight_max: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("utxoidx");

        Self {
            data_dir,
            store_raw_trx: true,
            object_cache_weight_max: 32 * 1024 * 1024,
        }
    }
}

impl Config {
    fn sled_config(&self, subdir: &str) -> sled::Config {
        sled::Config::new().path(self.data_dir.join(subdir))
    }

    pub fn utxo_store_config(&self) -> sled::Config {
        self.sled_config("utxo_store")
    }

    pub fn addr_trxs_store_config(&self) -> sled::Config {
        self.sled_config("addr_trxs_store")
    }

    pub fn raw_trx_store_config(&self) -> sled::Config {
        self.sled_config("raw_trx_store")
    }

    pub fn config_store_config(&self) -> sled::Config {
        self.sled_config("config_store")
    }
}
