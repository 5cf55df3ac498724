#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::cart_manager::DEFAULT_CART_KEY;
use crate::core::ConfigProvider;
use crate::domain::model::StockLookupMode;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3333";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_STORAGE_DIRECTORY: &str = "./.storefront";

/// Fully resolved settings: defaults, then the TOML file, then CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_base_url: String,
    pub timeout_seconds: u64,
    pub stock_lookup: StockLookupMode,
    pub storage_directory: String,
    pub cart_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            stock_lookup: StockLookupMode::default(),
            storage_directory: DEFAULT_STORAGE_DIRECTORY.to_string(),
            cart_key: DEFAULT_CART_KEY.to_string(),
        }
    }
}

impl AppConfig {
    pub fn merge_toml(&mut self, file: &TomlConfig) {
        if let Some(api) = &file.api {
            if let Some(base_url) = &api.base_url {
                self.api_base_url = base_url.clone();
            }
            if let Some(timeout) = api.timeout_seconds {
                self.timeout_seconds = timeout;
            }
            if let Some(mode) = api.stock_lookup {
                self.stock_lookup = mode;
            }
        }
        if let Some(storage) = &file.storage {
            if let Some(directory) = &storage.directory {
                self.storage_directory = directory.clone();
            }
            if let Some(key) = &storage.cart_key {
                self.cart_key = key.clone();
            }
        }
    }
}

impl ConfigProvider for AppConfig {
    fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn stock_lookup_mode(&self) -> StockLookupMode {
        self.stock_lookup
    }

    fn storage_directory(&self) -> &str {
        &self.storage_directory
    }

    fn cart_key(&self) -> &str {
        &self.cart_key
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.api_base_url)?;
        validate_range("api.timeout_seconds", self.timeout_seconds, 1, 300)?;
        validate_path("storage.directory", &self.storage_directory)?;
        validate_non_empty_string("storage.cart_key", &self.cart_key)?;
        Ok(())
    }
}
