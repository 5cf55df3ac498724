pub mod cart_manager;

pub use crate::domain::model::{Cart, CartItem, CatalogEntry, ProductId, StockRecord};
pub use crate::domain::ports::{CatalogLookup, ConfigProvider, KeyValueStore, Notifier, StockLookup};
pub use crate::utils::error::{CartFailure, Result};
