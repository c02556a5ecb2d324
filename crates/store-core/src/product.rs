//! # Product Types
//!
//! Catalog products and the tiered pricing rules (VIP / promo / base).
//! The catalog is owned by the remote backend; the client holds a read-only
//! copy delivered with the initial store data.

use crate::money::Price;
use serde::{Deserialize, Serialize};

/// Product code of the VIP subscription itself. It gets special placement
/// in purchased-item listings and is the target of the direct VIP checkout.
pub const VIP_PRODUCT_CODE: &str = "360";

/// Product category, derived from the product name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Win10,
    Win11,
    Outros,
}

impl Category {
    /// Categorize by name, same match the store grid filter uses
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("windows 10") {
            Category::Win10
        } else if lower.contains("windows 11") {
            Category::Win11
        } else {
            Category::Outros
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Win10 => "win10",
            Category::Win11 => "win11",
            Category::Outros => "outros",
        }
    }
}

/// A product in the remote catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product code
    pub code: String,

    /// Display name
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Standalone (non-subscriber) price
    pub base_price: Price,

    /// Promotional price; zero when no promotion exists
    #[serde(default)]
    pub promo_price: Price,

    /// VIP subscriber price; zero when there is no subscriber tier
    #[serde(default)]
    pub subscriber_price: Price,

    /// Promotion flag from the backend; only honored when `promo_price > 0`
    #[serde(default)]
    pub has_promo: bool,

    /// Cover image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Additional gallery images
    #[serde(default)]
    pub extra_images: Vec<String>,

    /// Derived category
    pub category: Category,
}

impl Product {
    /// Create a product with just code, name and base price
    pub fn new(code: impl Into<String>, name: impl Into<String>, base_price: Price) -> Self {
        let name: String = name.into();
        let category = Category::from_name(&name);
        Self {
            code: code.into(),
            name,
            description: String::new(),
            base_price,
            promo_price: Price::ZERO,
            subscriber_price: Price::ZERO,
            has_promo: false,
            image_url: None,
            extra_images: Vec::new(),
            category,
        }
    }

    /// Builder: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: set promotional price and flag
    pub fn with_promo(mut self, price: Price) -> Self {
        self.promo_price = price;
        self.has_promo = true;
        self
    }

    /// Builder: set VIP subscriber price
    pub fn with_subscriber_price(mut self, price: Price) -> Self {
        self.subscriber_price = price;
        self
    }

    /// Builder: set cover image
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// True when the promotion flag is set and the promo price is usable
    pub fn has_active_promo(&self) -> bool {
        self.has_promo && self.promo_price.is_positive()
    }

    /// Resolve the price this user pays.
    ///
    /// Order: VIP subscriber price when the user is VIP and the tier exists,
    /// then active promo price, then base price.
    pub fn effective_price(&self, is_vip: bool) -> Price {
        if is_vip && self.subscriber_price.is_positive() {
            self.subscriber_price
        } else if self.has_active_promo() {
            self.promo_price
        } else {
            self.base_price
        }
    }

    /// Free products are redeemable instead of purchasable
    pub fn is_free(&self) -> bool {
        !self.base_price.is_positive()
            && !self.promo_price.is_positive()
            && !self.subscriber_price.is_positive()
    }

    /// Rounded discount percentage of the active promo against base price
    pub fn discount_percent(&self) -> u32 {
        if !self.base_price.is_positive() || !self.has_active_promo() {
            return 0;
        }
        let base = self.base_price.centavos() as f64;
        let promo = self.promo_price.centavos() as f64;
        (((base - promo) / base) * 100.0).round() as u32
    }

    /// All image URLs, cover first
    pub fn all_images(&self) -> Vec<String> {
        self.image_url
            .iter()
            .cloned()
            .chain(self.extra_images.iter().cloned())
            .collect()
    }
}

/// Read-only client copy of the remote catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn get(&self, code: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.code == code)
    }

    pub fn all(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Drop purchased products from the displayed catalog
    pub fn remove_purchased(&mut self, purchased: &[String]) {
        self.products.retain(|p| !purchased.contains(&p.code));
    }

    /// Category filter; `None` means all categories
    pub fn by_category(&self, category: Option<Category>) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .collect()
    }

    /// Case-insensitive substring search over name and description
    pub fn search(&self, term: &str) -> Vec<&Product> {
        let term = term.to_lowercase();
        let term = term.trim();
        if term.is_empty() {
            return self.products.iter().collect();
        }
        self.products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(term)
                    || p.description.to_lowercase().contains(term)
            })
            .collect()
    }
}
