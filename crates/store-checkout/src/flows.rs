//! # Store Flows
//!
//! The non-checkout flows: loading the store after login and redeeming
//! zero-price products.

use crate::state::SharedState;
use std::sync::Arc;
use store_core::{
    GatewayRef, Notifier, PersistedState, StateStore, StoreError, StoreResult,
};
use tracing::{info, instrument, warn};

/// Fetch the initial store data and hydrate the shared state.
///
/// Purchased products are dropped from the catalog before it is shown, and
/// the persisted cart is restored minus anything the user now owns or that
/// left the catalog since their last visit.
#[instrument(skip_all)]
pub async fn load_store<S: StateStore>(
    gateway: &GatewayRef,
    state: &SharedState,
    persisted: &PersistedState<S>,
) -> StoreResult<()> {
    let data = gateway.initial_store_data().await?;

    let saved_cart = persisted.load_cart().unwrap_or_else(|e| {
        warn!(error = %e, "could not restore saved cart");
        Vec::new()
    });

    let restored = {
        let mut state = state.lock();
        state.catalog = data.catalog;
        state.catalog.remove_purchased(&data.purchased);
        state.session.set_vip(data.is_vip);
        state.session.set_purchased(data.purchased);

        let restored: Vec<_> = saved_cart
            .into_iter()
            .filter(|item| state.catalog.get(&item.code).is_some())
            .collect();
        state.cart = store_core::CartStore::from_items(restored.clone());
        restored
    };

    // Keep the persisted copy in step with what actually survived.
    if let Err(e) = persisted.save_cart(&restored) {
        warn!(error = %e, "could not persist restored cart");
    }

    info!(
        products = state.lock().catalog.len(),
        cart_items = restored.len(),
        "store loaded"
    );
    Ok(())
}

/// Claim a zero-price product. Ownership is granted server-side; on success
/// the product moves from the catalog to the owned set.
#[instrument(skip(gateway, state, notifier))]
pub async fn redeem_free_product(
    gateway: &GatewayRef,
    state: &SharedState,
    notifier: &Arc<dyn Notifier>,
    code: &str,
) -> StoreResult<()> {
    let name = {
        let state = state.lock();
        let product = state
            .catalog
            .get(code)
            .ok_or_else(|| StoreError::ProductNotFound {
                code: code.to_string(),
            })?;
        if !product.is_free() {
            return Err(StoreError::Validation(
                "Este produto não é gratuito.".to_string(),
            ));
        }
        product.name.clone()
    };

    match gateway.redeem_free_product(code, &name).await {
        Ok(()) => {
            let mut state = state.lock();
            state.session.mark_purchased(code);
            state.catalog.remove_purchased(&[code.to_string()]);
            notifier.success("Produto resgatado com sucesso!");
            Ok(())
        }
        Err(e) => {
            notifier.error(&e.user_message());
            Err(e)
        }
    }
}
