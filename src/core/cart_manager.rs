use crate::core::{CatalogLookup, KeyValueStore, Notifier, StockLookup};
use crate::domain::model::{Cart, CartItem, ProductId};
use crate::utils::error::CartFailure;

/// Storage key the cart blob lives under unless configured otherwise.
pub const DEFAULT_CART_KEY: &str = "@storefront:cart";

pub type OperationResult = std::result::Result<(), CartFailure>;

/// Owns the in-memory cart and keeps the persistent copy in step with it.
///
/// Every failed operation leaves the cart untouched and has been reported
/// through exactly one [`Notifier::notify_error`] call. Every successful
/// mutation is written to the store before the operation returns.
///
/// Mutating operations take `&mut self`, so two mutations of the same
/// manager never interleave. Callers sharing one manager between tasks put
/// it behind a mutex.
pub struct CartManager<C, S, K, N>
where
    C: CatalogLookup,
    S: StockLookup,
    K: KeyValueStore,
    N: Notifier,
{
    catalog: C,
    stock: S,
    store: K,
    notifier: N,
    cart_key: String,
    cart: Cart,
}

impl<C, S, K, N> CartManager<C, S, K, N>
where
    C: CatalogLookup,
    S: StockLookup,
    K: KeyValueStore,
    N: Notifier,
{
    /// Restores the cart persisted under `cart_key`. A missing, unreadable
    /// or invalid blob yields an empty cart.
    pub fn initialize(catalog: C, stock: S, store: K, notifier: N, cart_key: impl Into<String>) -> Self {
        let cart_key = cart_key.into();
        let cart = load_cart(&store, &cart_key);
        tracing::debug!("Cart initialized with {} product(s)", cart.len());

        Self {
            catalog,
            stock,
            store,
            notifier,
            cart_key,
            cart,
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_key(&self) -> &str {
        &self.cart_key
    }

    /// Adds one unit of `product_id`, fetching its catalog entry the first
    /// time it enters the cart.
    pub async fn add_product(&mut self, product_id: ProductId) -> OperationResult {
        let current = self.cart.get(product_id).map(|item| item.amount);

        let ceiling = match self.stock.stock(product_id).await {
            Ok(record) => record.amount,
            Err(e) => {
                tracing::warn!("Stock lookup for product {} failed: {}", product_id, e);
                return self.reject(CartFailure::AddFailed);
            }
        };

        // An amount already at i64::MAX can never take another unit.
        let Some(requested) = current.unwrap_or(0).checked_add(1) else {
            return self.reject(CartFailure::StockExceeded);
        };
        if requested > ceiling {
            tracing::debug!(
                "Product {}: requested {} exceeds stock {}",
                product_id,
                requested,
                ceiling
            );
            return self.reject(CartFailure::StockExceeded);
        }

        let updated = match current {
            Some(_) => self.cart.with_amount(product_id, requested),
            None => {
                let entry = match self.catalog.product(product_id).await {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("Catalog lookup for product {} failed: {}", product_id, e);
                        return self.reject(CartFailure::AddFailed);
                    }
                };
                if entry.id != product_id {
                    tracing::warn!(
                        "Catalog answered product {} when asked for {}",
                        entry.id,
                        product_id
                    );
                    return self.reject(CartFailure::AddFailed);
                }
                self.cart.with_item(CartItem::from_entry(entry))
            }
        };

        self.commit(updated);
        Ok(())
    }

    pub fn remove_product(&mut self, product_id: ProductId) -> OperationResult {
        let updated = self.cart.without(product_id);
        if updated.len() == self.cart.len() {
            return self.reject(CartFailure::ProductNotFound);
        }

        self.commit(updated);
        Ok(())
    }

    /// Sets the quantity of a product already in the cart.
    ///
    /// Non-positive amounts are ignored; removal goes through
    /// [`CartManager::remove_product`]. A product that is not in the cart is
    /// left absent and the call still succeeds.
    pub async fn update_product_amount(&mut self, product_id: ProductId, amount: i64) -> OperationResult {
        if amount <= 0 {
            tracing::debug!("Ignoring amount {} for product {}", amount, product_id);
            return Ok(());
        }

        let ceiling = match self.stock.stock(product_id).await {
            Ok(record) => record.amount,
            Err(e) => {
                tracing::warn!("Stock lookup for product {} failed: {}", product_id, e);
                return self.reject(CartFailure::UpdateFailed);
            }
        };

        if amount > ceiling {
            tracing::debug!(
                "Product {}: requested {} exceeds stock {}",
                product_id,
                amount,
                ceiling
            );
            return self.reject(CartFailure::StockExceeded);
        }

        if self.cart.get(product_id).is_none() {
            tracing::debug!("Product {} is not in the cart, nothing to update", product_id);
        }

        let updated = self.cart.with_amount(product_id, amount);
        self.commit(updated);
        Ok(())
    }

    fn reject(&self, failure: CartFailure) -> OperationResult {
        tracing::warn!("Cart operation rejected: {:?}", failure);
        self.notifier.notify_error(&failure.to_string());
        Err(failure)
    }

    fn commit(&mut self, cart: Cart) {
        match cart.to_json() {
            Ok(raw) => {
                if let Err(e) = self.store.write(&self.cart_key, &raw) {
                    tracing::warn!("Failed to persist cart under '{}': {}", self.cart_key, e);
                } else {
                    tracing::debug!("Persisted cart ({} bytes)", raw.len());
                }
            }
            Err(e) => tracing::warn!("Failed to serialize cart: {}", e),
        }
        self.cart = cart;
    }
}

fn load_cart<K: KeyValueStore>(store: &K, key: &str) -> Cart {
    match store.read(key) {
        Ok(Some(raw)) => Cart::from_json(&raw).unwrap_or_else(|e| {
            tracing::warn!("Discarding stored cart under '{}': {}", key, e);
            Cart::new()
        }),
        Ok(None) => Cart::new(),
        Err(e) => {
            tracing::warn!("Could not read stored cart under '{}': {}", key, e);
            Cart::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStore;
    use crate::domain::model::{CatalogEntry, StockRecord};
    use crate::utils::error::{CartError, Result};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct StubCatalog {
        entries: HashMap<ProductId, CatalogEntry>,
        calls: Arc<AtomicUsize>,
    }

    impl StubCatalog {
        fn with_products(ids: &[ProductId]) -> Self {
            let entries = ids
                .iter()
                .map(|&id| {
                    let entry: CatalogEntry = serde_json::from_value(json!({
                        "id": id,
                        "title": format!("Shoe {}", id),
                        "price": 100.0 + id as f64
                    }))
                    .unwrap();
                    (id, entry)
                })
                .collect();
            Self {
                entries,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl CatalogLookup for StubCatalog {
        async fn product(&self, id: ProductId) -> Result<CatalogEntry> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entries
                .get(&id)
                .cloned()
                .ok_or_else(|| CartError::not_found("product", id))
        }
    }

    struct StubStock {
        amounts: HashMap<ProductId, i64>,
        unreachable: bool,
        calls: Arc<AtomicUsize>,
    }

    impl StubStock {
        fn with_amounts(amounts: &[(ProductId, i64)]) -> Self {
            Self {
                amounts: amounts.iter().copied().collect(),
                unreachable: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn unreachable() -> Self {
            Self {
                amounts: HashMap::new(),
                unreachable: true,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl StockLookup for StubStock {
        async fn stock(&self, id: ProductId) -> Result<StockRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unreachable {
                return Err(CartError::IoError(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "stock service unreachable",
                )));
            }
            self.amounts
                .get(&id)
                .map(|&amount| StockRecord { id, amount })
                .ok_or_else(|| CartError::not_found("stock", id))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingNotifier {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify_error(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn read(&self, _key: &str) -> Result<Option<String>> {
            Err(CartError::StorageError {
                message: "disk unavailable".to_string(),
            })
        }

        fn write(&self, _key: &str, _value: &str) -> Result<()> {
            Err(CartError::StorageError {
                message: "disk unavailable".to_string(),
            })
        }
    }

    type TestManager = CartManager<StubCatalog, StubStock, MemoryStore, RecordingNotifier>;

    fn manager_with(stock: StubStock, store: MemoryStore) -> (TestManager, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let manager = CartManager::initialize(
            StubCatalog::with_products(&[1, 2, 3]),
            stock,
            store,
            notifier.clone(),
            DEFAULT_CART_KEY,
        );
        (manager, notifier)
    }

    fn seeded_store(raw: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store.write(DEFAULT_CART_KEY, raw).unwrap();
        store
    }

    fn persisted(store: &MemoryStore) -> Cart {
        let raw = store.read(DEFAULT_CART_KEY).unwrap().expect("cart persisted");
        Cart::from_json(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_add_product_to_empty_cart() {
        let store = MemoryStore::new();
        let (mut manager, notifier) = manager_with(StubStock::with_amounts(&[(1, 5)]), store.clone());

        assert!(manager.add_product(1).await.is_ok());

        let cart = manager.cart();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.items()[0].id, 1);
        assert_eq!(cart.items()[0].amount, 1);
        assert_eq!(cart.items()[0].title(), Some("Shoe 1"));
        assert_eq!(&persisted(&store), cart);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_add_existing_product_increments_without_catalog_fetch() {
        let store = MemoryStore::new();
        let (mut manager, _) = manager_with(StubStock::with_amounts(&[(1, 5)]), store.clone());
        let catalog_calls = manager.catalog.calls.clone();

        manager.add_product(1).await.unwrap();
        manager.add_product(1).await.unwrap();
        manager.add_product(1).await.unwrap();

        assert_eq!(manager.cart().len(), 1);
        assert_eq!(manager.cart().get(1).unwrap().amount, 3);
        assert_eq!(catalog_calls.load(Ordering::SeqCst), 1);
        assert_eq!(persisted(&store).get(1).unwrap().amount, 3);
    }

    #[tokio::test]
    async fn test_add_keeps_insertion_order() {
        let (mut manager, _) = manager_with(
            StubStock::with_amounts(&[(1, 5), (2, 5), (3, 5)]),
            MemoryStore::new(),
        );

        manager.add_product(3).await.unwrap();
        manager.add_product(1).await.unwrap();
        manager.add_product(3).await.unwrap();
        manager.add_product(2).await.unwrap();

        let ids: Vec<ProductId> = manager.cart().items().iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_add_beyond_stock_is_rejected() {
        let raw = r#"[{"id":1,"amount":5,"title":"Shoe 1"}]"#;
        let store = seeded_store(raw);
        let (mut manager, notifier) = manager_with(StubStock::with_amounts(&[(1, 5)]), store.clone());
        let before = manager.cart().clone();

        let result = manager.add_product(1).await;

        assert_eq!(result, Err(CartFailure::StockExceeded));
        assert_eq!(manager.cart(), &before);
        assert_eq!(store.read(DEFAULT_CART_KEY).unwrap().as_deref(), Some(raw));
        assert_eq!(notifier.messages(), vec!["requested quantity out of stock"]);
    }

    #[tokio::test]
    async fn test_add_to_item_at_maximum_amount_is_rejected() {
        let raw = format!(r#"[{{"id":1,"amount":{}}}]"#, i64::MAX);
        let store = seeded_store(&raw);
        let (mut manager, notifier) = manager_with(StubStock::with_amounts(&[(1, 5)]), store.clone());
        let before = manager.cart().clone();
        assert_eq!(before.get(1).unwrap().amount, i64::MAX);

        assert_eq!(manager.add_product(1).await, Err(CartFailure::StockExceeded));
        assert_eq!(manager.cart(), &before);
        assert_eq!(store.read(DEFAULT_CART_KEY).unwrap(), Some(raw));
        assert_eq!(notifier.messages(), vec!["requested quantity out of stock"]);
    }

    #[tokio::test]
    async fn test_add_new_product_without_stock_skips_catalog() {
        let (mut manager, notifier) = manager_with(StubStock::with_amounts(&[(2, 0)]), MemoryStore::new());
        let catalog_calls = manager.catalog.calls.clone();

        assert_eq!(manager.add_product(2).await, Err(CartFailure::StockExceeded));
        assert!(manager.cart().is_empty());
        assert_eq!(catalog_calls.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_add_with_unreachable_stock_fails() {
        let store = MemoryStore::new();
        let (mut manager, notifier) = manager_with(StubStock::unreachable(), store.clone());

        assert_eq!(manager.add_product(1).await, Err(CartFailure::AddFailed));
        assert!(manager.cart().is_empty());
        assert_eq!(store.read(DEFAULT_CART_KEY).unwrap(), None);
        assert_eq!(notifier.messages(), vec!["error adding product"]);
    }

    #[tokio::test]
    async fn test_add_unknown_product_fails() {
        let (mut manager, notifier) = manager_with(StubStock::with_amounts(&[(9, 3)]), MemoryStore::new());

        assert_eq!(manager.add_product(9).await, Err(CartFailure::AddFailed));
        assert!(manager.cart().is_empty());
        assert_eq!(notifier.messages(), vec!["error adding product"]);
    }

    #[tokio::test]
    async fn test_add_rejects_catalog_answer_for_other_product() {
        let notifier = RecordingNotifier::default();
        let mut catalog = StubCatalog::with_products(&[2]);
        let wrong = catalog.entries.remove(&2).unwrap();
        catalog.entries.insert(1, wrong);
        let mut manager = CartManager::initialize(
            catalog,
            StubStock::with_amounts(&[(1, 5)]),
            MemoryStore::new(),
            notifier.clone(),
            DEFAULT_CART_KEY,
        );

        assert_eq!(manager.add_product(1).await, Err(CartFailure::AddFailed));
        assert!(manager.cart().is_empty());
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_product() {
        let store = seeded_store(r#"[{"id":1,"amount":2}]"#);
        let (mut manager, notifier) = manager_with(StubStock::with_amounts(&[]), store.clone());

        assert!(manager.remove_product(1).is_ok());
        assert!(manager.cart().is_empty());
        assert_eq!(store.read(DEFAULT_CART_KEY).unwrap().as_deref(), Some("[]"));

        assert_eq!(manager.remove_product(1), Err(CartFailure::ProductNotFound));
        assert!(manager.cart().is_empty());
        assert_eq!(notifier.messages(), vec!["error removing product"]);
    }

    #[tokio::test]
    async fn test_remove_keeps_other_products_in_order() {
        let store = seeded_store(
            r#"[{"id":1,"amount":1},{"id":2,"amount":2},{"id":3,"amount":3}]"#,
        );
        let (mut manager, _) = manager_with(StubStock::with_amounts(&[]), store.clone());

        manager.remove_product(2).unwrap();

        let ids: Vec<ProductId> = manager.cart().items().iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(&persisted(&store), manager.cart());
    }

    #[tokio::test]
    async fn test_update_product_amount() {
        let store = seeded_store(r#"[{"id":1,"amount":2}]"#);
        let (mut manager, notifier) = manager_with(StubStock::with_amounts(&[(1, 10)]), store.clone());

        assert!(manager.update_product_amount(1, 7).await.is_ok());
        assert_eq!(manager.cart().get(1).unwrap().amount, 7);
        assert_eq!(&persisted(&store), manager.cart());

        assert!(manager.update_product_amount(1, 10).await.is_ok());
        assert_eq!(manager.cart().get(1).unwrap().amount, 10);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_update_beyond_stock_is_rejected() {
        let store = seeded_store(r#"[{"id":1,"amount":2}]"#);
        let (mut manager, notifier) = manager_with(StubStock::with_amounts(&[(1, 10)]), store.clone());
        let before = manager.cart().clone();

        assert_eq!(
            manager.update_product_amount(1, 11).await,
            Err(CartFailure::StockExceeded)
        );
        assert_eq!(manager.cart(), &before);
        assert_eq!(persisted(&store), before);
        assert_eq!(notifier.messages(), vec!["requested quantity out of stock"]);
    }

    #[tokio::test]
    async fn test_update_with_non_positive_amount_is_noop() {
        let store = seeded_store(r#"[{"id":1,"amount":2}]"#);
        let (mut manager, notifier) = manager_with(StubStock::unreachable(), store);
        let stock_calls = manager.stock.calls.clone();
        let before = manager.cart().clone();

        assert!(manager.update_product_amount(1, 0).await.is_ok());
        assert!(manager.update_product_amount(1, -3).await.is_ok());

        assert_eq!(manager.cart(), &before);
        assert_eq!(stock_calls.load(Ordering::SeqCst), 0);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_update_absent_product_succeeds_without_change() {
        let store = seeded_store(r#"[{"id":1,"amount":2}]"#);
        let (mut manager, notifier) = manager_with(StubStock::with_amounts(&[(2, 10)]), store);
        let before = manager.cart().clone();

        assert!(manager.update_product_amount(2, 4).await.is_ok());
        assert_eq!(manager.cart(), &before);
        assert!(manager.cart().get(2).is_none());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_update_with_unreachable_stock_fails() {
        let store = seeded_store(r#"[{"id":1,"amount":2}]"#);
        let (mut manager, notifier) = manager_with(StubStock::unreachable(), store);
        let before = manager.cart().clone();

        assert_eq!(
            manager.update_product_amount(1, 3).await,
            Err(CartFailure::UpdateFailed)
        );
        assert_eq!(manager.cart(), &before);
        assert_eq!(notifier.messages(), vec!["error changing product quantity"]);
    }

    #[tokio::test]
    async fn test_initialize_restores_persisted_cart() {
        let store = seeded_store(r#"[{"id":2,"amount":3,"title":"Shoe 2","price":102.0}]"#);
        let (manager, _) = manager_with(StubStock::with_amounts(&[]), store);

        assert_eq!(manager.cart().len(), 1);
        assert_eq!(manager.cart().get(2).unwrap().amount, 3);
        assert_eq!(manager.cart().get(2).unwrap().price(), Some(102.0));
    }

    #[tokio::test]
    async fn test_initialize_with_malformed_data_yields_empty_cart() {
        for raw in ["{not json", r#"{"id":1}"#, r#"[{"id":1,"amount":0}]"#] {
            let (manager, notifier) = manager_with(StubStock::with_amounts(&[]), seeded_store(raw));
            assert!(manager.cart().is_empty(), "expected empty cart for {}", raw);
            assert!(notifier.messages().is_empty());
        }
    }

    #[tokio::test]
    async fn test_failed_persistence_does_not_fail_operation() {
        let notifier = RecordingNotifier::default();
        let mut manager = CartManager::initialize(
            StubCatalog::with_products(&[1]),
            StubStock::with_amounts(&[(1, 2)]),
            BrokenStore,
            notifier.clone(),
            DEFAULT_CART_KEY,
        );

        assert!(manager.cart().is_empty());
        assert!(manager.add_product(1).await.is_ok());
        assert_eq!(manager.cart().get(1).unwrap().amount, 1);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_amounts_never_exceed_observed_stock() {
        let (mut manager, notifier) = manager_with(StubStock::with_amounts(&[(1, 2), (2, 1)]), MemoryStore::new());

        for _ in 0..4 {
            let _ = manager.add_product(1).await;
            let _ = manager.add_product(2).await;
        }
        let _ = manager.update_product_amount(2, 3).await;

        assert_eq!(manager.cart().get(1).unwrap().amount, 2);
        assert_eq!(manager.cart().get(2).unwrap().amount, 1);
        assert_eq!(manager.cart().len(), 2);
        // 2 + 3 rejected adds, then the rejected update
        assert_eq!(notifier.messages().len(), 6);
    }
}
