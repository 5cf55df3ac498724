use super::toml_config::TomlConfig;
use super::AppConfig;
use crate::domain::model::{ProductId, StockLookupMode};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "storefront-cart")]
#[command(about = "Manage a storefront shopping cart backed by the catalog and stock API")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the catalog/stock API
    #[arg(long)]
    pub api_url: Option<String>,

    /// Directory the cart is persisted in
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Storage key of the cart blob
    #[arg(long)]
    pub cart_key: Option<String>,

    #[arg(long, value_enum)]
    pub stock_lookup: Option<StockLookupMode>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: CartCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CartCommand {
    /// Print the current cart
    Show,
    /// Add one unit of a product
    Add { product_id: ProductId },
    /// Remove a product entirely
    Remove { product_id: ProductId },
    /// Set the quantity of a product already in the cart
    Update {
        product_id: ProductId,
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
}

impl CliConfig {
    /// Defaults, overlaid with the config file (if any), overlaid with flags.
    pub fn resolve(&self) -> Result<AppConfig> {
        let mut config = AppConfig::default();

        // File values replace defaults
        if let Some(path) = &self.config {
            tracing::debug!("Loading configuration from: {}", path.display());
            config.merge_toml(&TomlConfig::from_file(path)?);
        }

        // Explicit flags win over the file
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        if let Some(directory) = &self.storage_dir {
            config.storage_directory = directory.clone();
        }
        if let Some(key) = &self.cart_key {
            config.cart_key = key.clone();
        }
        if let Some(mode) = self.stock_lookup {
            config.stock_lookup = mode;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }

        Ok(config)
    }
}
