//! # Payment Intents and Orders
//!
//! A checkout produces a `PaymentIntent` (a PIX charge awaiting payment,
//! polled by id). Once the charge is confirmed, the item snapshot taken at
//! intent-creation time becomes an immutable `Order`.

use crate::cart::CartItem;
use crate::money::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend-reported payment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Charge created, awaiting payment
    Pending,
    /// Payment confirmed
    Paid,
    /// Status string the client does not recognize; treated as not-yet-paid
    Unknown,
}

impl PaymentStatus {
    /// Map the backend's internal status string
    pub fn from_wire(status: &str) -> Self {
        match status {
            "Pago" => PaymentStatus::Paid,
            "Pendente" => PaymentStatus::Pending,
            _ => PaymentStatus::Unknown,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

/// A PIX charge issued by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Backend charge id, polled for confirmation
    pub id: String,

    /// Charge amount; always equals the cart total at creation time
    pub total: Price,

    /// Copy-and-paste PIX payload
    pub qr_code: String,

    /// QR code image, base64-encoded PNG
    pub qr_code_png: String,

    /// Last observed status
    pub status: PaymentStatus,
}

/// A confirmed purchase, immutable after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order id (= the payment intent id)
    pub id: String,

    /// Item snapshot taken at intent-creation time, not the live cart
    pub items: Vec<CartItem>,

    /// Sum of snapshot prices
    pub total: Price,

    pub created_at: DateTime<Utc>,

    /// Always "Pago"; orders are only created for confirmed payments
    pub status: String,
}

impl Order {
    /// Build the order for a confirmed intent from its item snapshot
    pub fn from_snapshot(intent_id: impl Into<String>, items: Vec<CartItem>) -> Self {
        let total = items.iter().map(|item| item.unit_price).sum();
        Self {
            id: intent_id.into(),
            items,
            total,
            created_at: Utc::now(),
            status: "Pago".to_string(),
        }
    }

    pub fn item_codes(&self) -> Vec<String> {
        self.items.iter().map(|item| item.code.clone()).collect()
    }
}

/// An item inside a previously saved order, as returned by the backend.
/// Carries enough detail to pre-populate the details cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub code: String,
    pub name: String,
    pub price: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub extra_images: Vec<String>,
}

/// A saved order fetched from the backend order list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub number: String,
    pub date: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
    pub total: Price,
    pub status: String,
}
