//! # Order Confirmation
//!
//! Runs once per paid charge: persist the order, grant ownership, reconcile
//! the cart. A failed save leaves the cart intact so nothing the user paid
//! for silently disappears; support reconciles from the payment id.

use crate::checkout::CheckoutSource;
use crate::state::SharedState;
use async_trait::async_trait;
use std::sync::Arc;
use store_core::{
    CartItem, GatewayRef, Notifier, Order, PaymentIntent, PersistedState, StateStore,
    StoreResult, VIP_PRODUCT_CODE,
};
use tracing::{error, info, instrument};

/// Receives exactly one call per confirmed payment
#[async_trait]
pub trait ConfirmationSink: Send + Sync {
    /// Returns the order id on success
    async fn confirmed(
        &self,
        intent: &PaymentIntent,
        snapshot: &[CartItem],
        source: &CheckoutSource,
    ) -> StoreResult<String>;
}

/// Default confirmation handling: save the order, then update session,
/// catalog, cart and persisted state.
pub struct OrderConfirmer<S: StateStore> {
    gateway: GatewayRef,
    state: SharedState,
    persisted: Arc<PersistedState<S>>,
    notifier: Arc<dyn Notifier>,
}

impl<S: StateStore> OrderConfirmer<S> {
    pub fn new(
        gateway: GatewayRef,
        state: SharedState,
        persisted: Arc<PersistedState<S>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateway,
            state,
            persisted,
            notifier,
        }
    }
}

#[async_trait]
impl<S: StateStore> ConfirmationSink for OrderConfirmer<S> {
    #[instrument(skip_all, fields(intent_id = %intent.id))]
    async fn confirmed(
        &self,
        intent: &PaymentIntent,
        snapshot: &[CartItem],
        source: &CheckoutSource,
    ) -> StoreResult<String> {
        let order = Order::from_snapshot(intent.id.clone(), snapshot.to_vec());

        if let Err(e) = self.gateway.save_order(&order).await {
            // Payment went through; only the record failed. Log and leave
            // the cart as it was; the next full store-data load re-derives
            // purchased state from the server.
            error!(order_id = %order.id, error = %e, "order save failed after payment");
            return Err(e);
        }

        let codes = order.item_codes();
        let remaining = {
            let mut state = self.state.lock();
            state.session.mark_all_purchased(&codes);
            if codes.iter().any(|code| code == VIP_PRODUCT_CODE) {
                state.session.set_vip(true);
            }
            state.catalog.remove_purchased(&codes);

            // Only a cart checkout touches the cart; a direct purchase never
            // disturbs what the user was still composing.
            if *source == CheckoutSource::Cart {
                state.cart.remove_all(&codes);
            }
            state.cart.snapshot()
        };

        if let Err(e) = self.persisted.save_cart(&remaining) {
            error!(error = %e, "failed to persist cart after confirmation");
        }

        info!(order_id = %order.id, items = codes.len(), "order confirmed");
        self.notifier.success("Pagamento confirmado com sucesso!");
        Ok(order.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StoreState;
    use std::sync::atomic::{AtomicBool, Ordering};
    use store_core::{
        CartStore, ChargeRequest, MemoryStore, OrderRecord, PaymentStatus, Price, Product,
        ProductCatalog, Session, SessionUser, StoreData, StoreError, StoreGateway,
    };

    struct SaveGateway {
        fail_save: AtomicBool,
    }

    #[async_trait]
    impl StoreGateway for SaveGateway {
        async fn create_pix_charge(&self, _request: &ChargeRequest) -> StoreResult<PaymentIntent> {
            unimplemented!()
        }

        async fn payment_status(&self, _intent_id: &str) -> StoreResult<PaymentStatus> {
            unimplemented!()
        }

        async fn save_order(&self, _order: &Order) -> StoreResult<()> {
            if self.fail_save.load(Ordering::SeqCst) {
                Err(StoreError::Network("timeout".into()))
            } else {
                Ok(())
            }
        }

        async fn initial_store_data(&self) -> StoreResult<StoreData> {
            unimplemented!()
        }

        async fn list_orders(&self) -> StoreResult<Vec<OrderRecord>> {
            Ok(vec![])
        }

        async fn redeem_free_product(&self, _code: &str, _name: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    struct SilentNotifier;
    impl Notifier for SilentNotifier {
        fn notify(&self, _severity: store_core::Severity, _message: &str) {}
    }

    fn setup(fail_save: bool) -> (OrderConfirmer<MemoryStore>, SharedState) {
        let catalog = ProductCatalog::new(vec![
            Product::new("101", "Windows 11 Pro", Price::new(49.90)),
            Product::new("102", "Windows 10 Home", Price::new(25.50)),
            Product::new(VIP_PRODUCT_CODE, "Assinatura VIP", Price::new(15.00)),
        ]);
        let mut cart = CartStore::new();
        cart.add(catalog.get("101").unwrap(), false).unwrap();
        cart.add(catalog.get("102").unwrap(), false).unwrap();

        let state = SharedState::new(StoreState {
            session: Session::with_user(SessionUser::new("ana@example.com", "Ana", false)),
            catalog,
            cart,
        });

        let gateway = Arc::new(SaveGateway {
            fail_save: AtomicBool::new(fail_save),
        });
        let persisted = Arc::new(PersistedState::open(MemoryStore::new()).unwrap());
        let confirmer = OrderConfirmer::new(gateway, state.clone(), persisted, Arc::new(SilentNotifier));
        (confirmer, state)
    }

    fn intent() -> PaymentIntent {
        PaymentIntent {
            id: "pix-7".into(),
            total: Price::new(49.90),
            qr_code: String::new(),
            qr_code_png: String::new(),
            status: PaymentStatus::Paid,
        }
    }

    fn snapshot_of(state: &SharedState, codes: &[&str]) -> Vec<CartItem> {
        let state = state.lock();
        state
            .cart
            .items()
            .iter()
            .filter(|item| codes.contains(&item.code.as_str()))
            .cloned()
            .collect()
    }

    #[tokio::test]
    async fn test_cart_checkout_clears_only_purchased_items() {
        let (confirmer, state) = setup(false);
        let snapshot = snapshot_of(&state, &["101"]);

        let order_id = confirmer
            .confirmed(&intent(), &snapshot, &CheckoutSource::Cart)
            .await
            .unwrap();
        assert_eq!(order_id, "pix-7");

        let state = state.lock();
        assert!(state.session.has_purchased("101"));
        assert!(!state.cart.contains("101"));
        // The other item the user was still composing stays put.
        assert!(state.cart.contains("102"));
        assert!(state.catalog.get("101").is_none());
    }

    #[tokio::test]
    async fn test_failed_save_leaves_cart_intact() {
        let (confirmer, state) = setup(true);
        let snapshot = snapshot_of(&state, &["101"]);

        let err = confirmer
            .confirmed(&intent(), &snapshot, &CheckoutSource::Cart)
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let state = state.lock();
        assert!(state.cart.contains("101"));
        assert!(!state.session.has_purchased("101"));
    }

    #[tokio::test]
    async fn test_direct_purchase_never_touches_cart() {
        let (confirmer, state) = setup(false);
        let vip_item = {
            let state = state.lock();
            CartItem::from_product(state.catalog.get(VIP_PRODUCT_CODE).unwrap(), false)
        };

        confirmer
            .confirmed(
                &intent(),
                &[vip_item],
                &CheckoutSource::Direct {
                    code: VIP_PRODUCT_CODE.to_string(),
                },
            )
            .await
            .unwrap();

        let state = state.lock();
        assert_eq!(state.cart.len(), 2);
        // Buying the subscription flips VIP for the rest of the session.
        assert!(state.session.is_vip());
        assert!(state.session.has_purchased(VIP_PRODUCT_CODE));
    }

    #[tokio::test]
    async fn test_double_confirmation_is_idempotent() {
        let (confirmer, state) = setup(false);
        let snapshot = snapshot_of(&state, &["101"]);

        confirmer
            .confirmed(&intent(), &snapshot, &CheckoutSource::Cart)
            .await
            .unwrap();
        confirmer
            .confirmed(&intent(), &snapshot, &CheckoutSource::Cart)
            .await
            .unwrap();

        let state = state.lock();
        assert!(state.session.has_purchased("101"));
        assert_eq!(state.cart.len(), 1);
    }
}
