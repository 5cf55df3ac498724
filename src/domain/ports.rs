use crate::domain::model::{CatalogEntry, ProductId, StockLookupMode, StockRecord};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<CatalogEntry>;
}

#[async_trait]
pub trait StockLookup: Send + Sync {
    async fn stock(&self, id: ProductId) -> Result<StockRecord>;
}

/// String key/value storage that survives the process.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// User-facing error sink. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn stock_lookup_mode(&self) -> StockLookupMode;
    fn storage_directory(&self) -> &str;
    fn cart_key(&self) -> &str;
}
