//! # store-api
//!
//! HTTP client for the PIX storefront backend.
//!
//! The backend issues single-use session tokens: every call spends one and
//! receives its replacement alongside the response. [`ApiClient`] owns that
//! rotation and implements [`store_core::StoreGateway`] on top of it.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use store_api::ApiClient;
//!
//! // Create client from config/store.toml or STORE_API_URL
//! let client = ApiClient::from_env()?;
//! client.connect().await?;
//!
//! let user = client.login("ana@example.com", "email", &password).await?;
//! let data = client.initial_store_data().await?;
//! ```

pub mod client;
pub mod config;
pub mod wire;

// Re-exports
pub use client::ApiClient;
pub use config::ApiConfig;
