pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CartCommand, CliConfig};

pub use adapters::{ApiClient, ConsoleNotifier, FileStore, MemoryStore, TracingNotifier};
pub use config::AppConfig;
pub use core::cart_manager::{CartManager, OperationResult, DEFAULT_CART_KEY};
pub use domain::model::{Cart, CartItem, CatalogEntry, ProductId, StockLookupMode, StockRecord};
pub use utils::error::{CartError, CartFailure, Result};
