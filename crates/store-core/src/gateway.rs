//! # Store Gateway Trait
//!
//! The seam between the engine and the remote backend. The HTTP client
//! implements this; flows and tests only see the trait.

use crate::error::StoreResult;
use crate::order::{Order, OrderRecord, PaymentStatus, PaymentIntent};
use crate::product::ProductCatalog;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything the backend hands over on first load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreData {
    pub catalog: ProductCatalog,
    pub is_vip: bool,
    pub purchased: Vec<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Input for PIX charge creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub email: String,
    pub name: String,
    pub total: crate::money::Price,
    /// Human-readable description of what is being bought
    pub description: String,
}

/// Backend operations used by the storefront engine
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Create a PIX charge and return the intent to poll
    async fn create_pix_charge(&self, request: &ChargeRequest) -> StoreResult<PaymentIntent>;

    /// Current status of a charge
    async fn payment_status(&self, intent_id: &str) -> StoreResult<PaymentStatus>;

    /// Persist a confirmed order
    async fn save_order(&self, order: &Order) -> StoreResult<()>;

    /// Catalog, VIP flag and owned products for the logged-in user
    async fn initial_store_data(&self) -> StoreResult<StoreData>;

    /// Previously saved orders, newest first as stored
    async fn list_orders(&self) -> StoreResult<Vec<OrderRecord>>;

    /// Claim a zero-price product; ownership is granted server-side
    async fn redeem_free_product(&self, code: &str, name: &str) -> StoreResult<()>;
}

/// Shared gateway handle
pub type GatewayRef = Arc<dyn StoreGateway>;
