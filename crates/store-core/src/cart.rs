//! # Cart Store
//!
//! In-memory cart with one entry per product code. Prices are resolved at
//! add time under the VIP/promo rules and frozen on the item, so the total
//! shown is exactly the total sent to charge creation.

use crate::error::{StoreError, StoreResult};
use crate::money::Price;
use crate::product::Product;
use serde::{Deserialize, Serialize};

/// An item the user intends to purchase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub code: String,
    pub name: String,
    pub unit_price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CartItem {
    /// Snapshot a product at its effective price for this user
    pub fn from_product(product: &Product, is_vip: bool) -> Self {
        Self {
            code: product.code.clone(),
            name: product.name.clone(),
            unit_price: product.effective_price(is_vip),
            image_url: product.image_url.clone(),
        }
    }
}

/// The cart. Owns its items until checkout succeeds, at which point the
/// snapshot handed to the order takes over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartStore {
    items: Vec<CartItem>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a cart from a persisted snapshot
    pub fn from_items(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    /// Add a product, resolving its price for this user. Duplicate codes are
    /// rejected without touching the cart; the caller surfaces the
    /// notification.
    pub fn add(&mut self, product: &Product, is_vip: bool) -> StoreResult<&CartItem> {
        if self.contains(&product.code) {
            return Err(StoreError::DuplicateItem {
                code: product.code.clone(),
            });
        }
        self.items.push(CartItem::from_product(product, is_vip));
        Ok(self.items.last().expect("just pushed"))
    }

    /// Remove by code; no-op when absent
    pub fn remove(&mut self, code: &str) {
        self.items.retain(|item| item.code != code);
    }

    /// Empty the cart, returning the removed codes so the caller can reset
    /// per-product UI state. User confirmation happens before this call.
    pub fn clear(&mut self) -> Vec<String> {
        self.items.drain(..).map(|item| item.code).collect()
    }

    /// Remove exactly the given codes (post-checkout reconciliation)
    pub fn remove_all(&mut self, codes: &[String]) {
        self.items.retain(|item| !codes.contains(&item.code));
    }

    pub fn contains(&self, code: &str) -> bool {
        self.items.iter().any(|item| item.code == code)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Owned copy of the items, used as the intent-creation snapshot
    pub fn snapshot(&self) -> Vec<CartItem> {
        self.items.clone()
    }

    /// Centavo-exact sum of resolved item prices
    pub fn total(&self) -> Price {
        self.items.iter().map(|item| item.unit_price).sum()
    }

    /// What the user saves against base prices, for the summary bar
    pub fn savings(&self, base_price_of: impl Fn(&str) -> Option<Price>) -> Price {
        let original: Price = self
            .items
            .iter()
            .map(|item| base_price_of(&item.code).unwrap_or(item.unit_price))
            .sum();
        original.saturating_sub(self.total())
    }
}
