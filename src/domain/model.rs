use crate::utils::error::{CartError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub type ProductId = u64;

/// Product attributes as served by the catalog API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ProductId,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// How stock ceilings are fetched: one product at a time, or the whole
/// stock list filtered locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum StockLookupMode {
    #[default]
    PerProduct,
    FullList,
}

/// Maximum purchasable quantity for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: ProductId,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub amount: i64,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl CartItem {
    /// A single unit of a catalog product. A catalog `amount` attribute never
    /// leaks into the item.
    pub fn from_entry(entry: CatalogEntry) -> Self {
        let mut attributes = entry.attributes;
        attributes.remove("amount");
        Self {
            id: entry.id,
            amount: 1,
            attributes,
        }
    }

    pub fn price(&self) -> Option<f64> {
        self.attributes.get("price").and_then(Value::as_f64)
    }

    pub fn title(&self) -> Option<&str> {
        self.attributes.get("title").and_then(Value::as_str)
    }
}

/// Products in the order they were first added.
///
/// Serializes as a plain JSON array of items. Every transformation returns a
/// new `Cart`, leaving the receiver untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_units(&self) -> i64 {
        self.items.iter().map(|item| item.amount).sum()
    }

    /// Sum of `price * amount`; items without a numeric price count as zero.
    pub fn subtotal(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.price().unwrap_or(0.0) * item.amount as f64)
            .sum()
    }

    pub(crate) fn with_item(&self, item: CartItem) -> Cart {
        let mut items = self.items.clone();
        items.push(item);
        Cart { items }
    }

    /// Sets the amount of the matching item. No match yields an equal cart.
    pub(crate) fn with_amount(&self, id: ProductId, amount: i64) -> Cart {
        let items = self
            .items
            .iter()
            .map(|item| {
                if item.id == id {
                    CartItem {
                        amount,
                        ..item.clone()
                    }
                } else {
                    item.clone()
                }
            })
            .collect();
        Cart { items }
    }

    pub(crate) fn without(&self, id: ProductId) -> Cart {
        let items = self
            .items
            .iter()
            .filter(|item| item.id != id)
            .cloned()
            .collect();
        Cart { items }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a persisted cart and checks its invariants.
    pub fn from_json(raw: &str) -> Result<Cart> {
        let cart: Cart = serde_json::from_str(raw)?;
        cart.validate()?;
        Ok(cart)
    }
}

impl Validate for Cart {
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if item.amount < 1 {
                return Err(CartError::ValidationError {
                    message: format!("product {} has amount {}", item.id, item.amount),
                });
            }
            if !seen.insert(item.id) {
                return Err(CartError::ValidationError {
                    message: format!("product {} appears more than once", item.id),
                });
            }
        }
        Ok(())
    }
}
