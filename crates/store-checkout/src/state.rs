//! # Store State
//!
//! Shared client state: who is logged in, what the catalog holds and what
//! sits in the cart. Flows take the lock briefly for reads and mutations;
//! nothing holds it across an await.

use std::sync::{Arc, Mutex, MutexGuard};
use store_core::{CartStore, ProductCatalog, Session};

/// Mutable storefront state behind one lock
#[derive(Debug, Default)]
pub struct StoreState {
    pub session: Session,
    pub catalog: ProductCatalog,
    pub cart: CartStore,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Shared handle to the store state
#[derive(Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<StoreState>>,
}

impl SharedState {
    pub fn new(state: StoreState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Lock the state. Poisoning is unrecoverable here; flows never panic
    /// while holding the lock.
    pub fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
