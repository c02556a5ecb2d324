//! # store-checkout
//!
//! Orchestration for the PIX storefront: the checkout state machine with
//! its payment polling loop, order confirmation, order sync and the client
//! caches.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use store_checkout::{Checkout, CheckoutRequest, OrderConfirmer, SharedState};
//!
//! let sink = Arc::new(OrderConfirmer::new(gateway.clone(), state.clone(), persisted, notifier));
//! let checkout = Checkout::new(gateway, sink);
//!
//! let request = CheckoutRequest::from_cart(&state.lock().cart)?;
//! let intent = checkout.begin(&user, request).await?;
//! // show intent.qr_code; the flow confirms on its own once paid
//! ```

pub mod cache;
pub mod checkout;
pub mod confirm;
pub mod flows;
pub mod orders;
pub mod state;

// Re-exports
pub use cache::{DetailsCache, ImagePrecache, ImageSource, ProductDetails};
pub use checkout::{Checkout, CheckoutPhase, CheckoutRequest, CheckoutSource, POLL_INTERVAL};
pub use confirm::{ConfirmationSink, OrderConfirmer};
pub use flows::{load_store, redeem_free_product};
pub use orders::{OrdersSync, OrdersView, SyncOutcome};
pub use state::{SharedState, StoreState};
