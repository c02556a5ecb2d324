//! # store-core
//!
//! Core types and traits for the PIX storefront engine.
//!
//! This crate provides:
//! - `StoreGateway` trait implemented by the backend HTTP client
//! - `Product` and `ProductCatalog` with the VIP/promo pricing rules
//! - `CartStore` and `CartItem` for the shopping cart
//! - `PaymentIntent`, `Order` and `OrderRecord` for the checkout flow
//! - `Session` for the logged-in user and owned products
//! - `StateStore` / `PersistedState` for persisted client state
//! - `StoreError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use store_core::{CartStore, Price, Product, ProductCatalog};
//!
//! let catalog = ProductCatalog::new(vec![
//!     Product::new("101", "Windows 11 Pro", Price::new(49.90)),
//! ]);
//!
//! let mut cart = CartStore::new();
//! cart.add(catalog.get("101").unwrap(), /* is_vip */ false)?;
//!
//! // cart.total() is what charge creation receives, centavo for centavo
//! assert_eq!(cart.total().to_wire(), "49.90");
//! ```

pub mod cart;
pub mod error;
pub mod gateway;
pub mod money;
pub mod notify;
pub mod order;
pub mod product;
pub mod session;
pub mod storage;

// Re-exports for convenience
pub use cart::{CartItem, CartStore};
pub use error::{StoreError, StoreResult};
pub use gateway::{ChargeRequest, GatewayRef, StoreData, StoreGateway};
pub use money::Price;
pub use notify::{LogNotifier, Notifier, Severity};
pub use order::{Order, OrderItem, OrderRecord, PaymentIntent, PaymentStatus};
pub use product::{Category, Product, ProductCatalog, VIP_PRODUCT_CODE};
pub use session::{Session, SessionUser};
pub use storage::{
    MemoryStore, PersistedState, RememberedLogin, StateStore, KEY_PREFIX, STATE_VERSION,
};
