//! # Checkout Flow
//!
//! Drives a purchase from charge creation to confirmation. One checkout is
//! active at a time: starting a new one aborts the previous poll task, so a
//! stale charge can never confirm over a fresh one.
//!
//! After the PIX charge is created the flow polls the backend every
//! [`POLL_INTERVAL`] until the charge reports paid, the user abandons the
//! checkout, or a poll fails. A failed poll stops the loop without retry;
//! the charge stays payable and the user can start over.

use crate::confirm::ConfirmationSink;
use std::sync::Mutex;
use std::time::Duration;
use store_core::{
    CartItem, CartStore, ChargeRequest, GatewayRef, PaymentIntent, Product, SessionUser,
    StoreError, StoreResult,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Time between payment-status polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Where the checkout started from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutSource {
    /// The live cart; a successful confirmation clears the purchased items
    Cart,
    /// Single-product purchase that bypasses the cart
    Direct { code: String },
}

/// Everything frozen at checkout start
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub snapshot: Vec<CartItem>,
    pub description: String,
    pub source: CheckoutSource,
}

impl CheckoutRequest {
    /// Snapshot the live cart. Empty carts are rejected before any network
    /// traffic.
    pub fn from_cart(cart: &CartStore) -> StoreResult<Self> {
        if cart.is_empty() {
            return Err(StoreError::Validation("Seu carrinho está vazio!".to_string()));
        }
        let snapshot = cart.snapshot();
        let description = snapshot
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Self {
            snapshot,
            description,
            source: CheckoutSource::Cart,
        })
    }

    /// Buy one product directly, cart untouched
    pub fn direct(product: &Product, is_vip: bool) -> StoreResult<Self> {
        let item = CartItem::from_product(product, is_vip);
        if !item.unit_price.is_positive() {
            return Err(StoreError::InvalidPrice {
                code: product.code.clone(),
            });
        }
        Ok(Self {
            snapshot: vec![item],
            description: product.name.clone(),
            source: CheckoutSource::Direct {
                code: product.code.clone(),
            },
        })
    }

    fn total(&self) -> store_core::Price {
        self.snapshot.iter().map(|item| item.unit_price).sum()
    }
}

/// Observable checkout state
#[derive(Debug, Clone, Default)]
pub enum CheckoutPhase {
    #[default]
    Idle,
    /// Charge creation in flight
    Creating,
    /// Charge issued, waiting for the user to pay
    AwaitingPayment { intent: PaymentIntent },
    /// Payment seen, confirmation running
    Confirming,
    Confirmed {
        order_id: String,
    },
    Failed {
        message: String,
    },
    /// A status poll failed and polling stopped without retry. The charge
    /// is still payable through the QR on the intent; a new checkout
    /// restarts the flow.
    PollingStopped {
        intent: PaymentIntent,
        message: String,
    },
    /// User closed the payment screen before paying
    Abandoned,
}

/// The checkout orchestrator
pub struct Checkout {
    gateway: GatewayRef,
    sink: std::sync::Arc<dyn ConfirmationSink>,
    poll_interval: Duration,
    phase_tx: watch::Sender<CheckoutPhase>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Checkout {
    pub fn new(gateway: GatewayRef, sink: std::sync::Arc<dyn ConfirmationSink>) -> Self {
        let (phase_tx, _) = watch::channel(CheckoutPhase::Idle);
        Self {
            gateway,
            sink,
            poll_interval: POLL_INTERVAL,
            phase_tx,
            poll_task: Mutex::new(None),
        }
    }

    /// Builder: override the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.phase_tx.borrow().clone()
    }

    /// Watch phase transitions
    pub fn subscribe(&self) -> watch::Receiver<CheckoutPhase> {
        self.phase_tx.subscribe()
    }

    /// Create the PIX charge and start polling for payment.
    ///
    /// Any previous checkout still polling is aborted first.
    #[instrument(skip(self, user, request), fields(source = ?request.source))]
    pub async fn begin(
        &self,
        user: &SessionUser,
        request: CheckoutRequest,
    ) -> StoreResult<PaymentIntent> {
        let total = request.total();
        if !total.is_positive() {
            return Err(StoreError::Validation(
                "Valor total inválido para pagamento.".to_string(),
            ));
        }

        self.stop_polling();
        self.phase_tx.send_replace(CheckoutPhase::Creating);

        // Correlates the log lines of this attempt with its poll loop
        let attempt = uuid::Uuid::new_v4();
        info!(%attempt, items = request.snapshot.len(), "starting checkout");

        let charge = ChargeRequest {
            email: user.email.clone(),
            name: user.name.clone(),
            total,
            description: request.description.clone(),
        };

        let intent = match self.gateway.create_pix_charge(&charge).await {
            Ok(intent) => intent,
            Err(e) => {
                self.phase_tx.send_replace(CheckoutPhase::Failed {
                    message: e.user_message(),
                });
                return Err(e);
            }
        };

        info!(intent_id = %intent.id, total = %total, "awaiting payment");
        self.phase_tx.send_replace(CheckoutPhase::AwaitingPayment {
            intent: intent.clone(),
        });

        let task = tokio::spawn(poll_until_paid(
            self.gateway.clone(),
            self.sink.clone(),
            self.phase_tx.clone(),
            intent.clone(),
            request,
            self.poll_interval,
            attempt,
        ));
        *self.poll_task.lock().unwrap_or_else(|p| p.into_inner()) = Some(task);

        Ok(intent)
    }

    /// User closed the payment screen; stop polling.
    pub fn abandon(&self) {
        self.stop_polling();
        self.phase_tx.send_replace(CheckoutPhase::Abandoned);
        info!("checkout abandoned");
    }

    fn stop_polling(&self) {
        if let Some(task) = self
            .poll_task
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        {
            task.abort();
        }
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

async fn poll_until_paid(
    gateway: GatewayRef,
    sink: std::sync::Arc<dyn ConfirmationSink>,
    phase_tx: watch::Sender<CheckoutPhase>,
    intent: PaymentIntent,
    request: CheckoutRequest,
    poll_interval: Duration,
    attempt: uuid::Uuid,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick of a tokio interval fires immediately; the first real
    // poll should happen one interval after the charge went up.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        match gateway.payment_status(&intent.id).await {
            Ok(status) if status.is_paid() => {
                info!(%attempt, intent_id = %intent.id, "payment confirmed");
                phase_tx.send_replace(CheckoutPhase::Confirming);

                match sink
                    .confirmed(&intent, &request.snapshot, &request.source)
                    .await
                {
                    Ok(order_id) => {
                        phase_tx.send_replace(CheckoutPhase::Confirmed { order_id });
                    }
                    Err(e) => {
                        phase_tx.send_replace(CheckoutPhase::Failed {
                            message: e.user_message(),
                        });
                    }
                }
                return;
            }
            Ok(_) => {
                // Not paid yet; keep waiting.
            }
            Err(e) => {
                // Stop without retry. The charge is still payable; the user
                // restarts the flow if they completed payment after this.
                warn!(%attempt, intent_id = %intent.id, error = %e, "status poll failed, polling stopped");
                phase_tx.send_replace(CheckoutPhase::PollingStopped {
                    intent: intent.clone(),
                    message: e.user_message(),
                });
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use store_core::{
        Order, OrderRecord, PaymentStatus, Price, StoreData, StoreGateway,
    };

    struct FakeGateway {
        statuses: Mutex<VecDeque<StoreResult<PaymentStatus>>>,
        status_calls: AtomicUsize,
    }

    impl FakeGateway {
        fn with_statuses(statuses: Vec<StoreResult<PaymentStatus>>) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.into()),
                status_calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StoreGateway for FakeGateway {
        async fn create_pix_charge(&self, request: &ChargeRequest) -> StoreResult<PaymentIntent> {
            Ok(PaymentIntent {
                id: "pix-1".into(),
                total: request.total,
                qr_code: "00020126".into(),
                qr_code_png: String::new(),
                status: PaymentStatus::Pending,
            })
        }

        async fn payment_status(&self, _intent_id: &str) -> StoreResult<PaymentStatus> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(PaymentStatus::Pending))
        }

        async fn save_order(&self, _order: &Order) -> StoreResult<()> {
            Ok(())
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

    #[derive(Default)]
    struct RecordingSink {
        confirmations: AtomicUsize,
    }

    #[async_trait]
    impl ConfirmationSink for RecordingSink {
        async fn confirmed(
            &self,
            intent: &PaymentIntent,
            _snapshot: &[CartItem],
            _source: &CheckoutSource,
        ) -> StoreResult<String> {
            self.confirmations.fetch_add(1, Ordering::SeqCst);
            Ok(intent.id.clone())
        }
    }

    fn user() -> SessionUser {
        SessionUser::new("ana@example.com", "Ana Souza", false)
    }

    fn cart_request() -> CheckoutRequest {
        let mut cart = CartStore::new();
        let product = Product::new("101", "Windows 11 Pro", Price::new(49.90));
        cart.add(&product, false).unwrap();
        CheckoutRequest::from_cart(&cart).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_paid_on_fourth_poll_confirms_exactly_once() {
        let gateway = FakeGateway::with_statuses(vec![
            Ok(PaymentStatus::Pending),
            Ok(PaymentStatus::Pending),
            Ok(PaymentStatus::Pending),
            Ok(PaymentStatus::Paid),
        ]);
        let sink = Arc::new(RecordingSink::default());
        let checkout = Checkout::new(gateway.clone(), sink.clone());

        checkout.begin(&user(), cart_request()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(gateway.calls(), 4);
        assert_eq!(sink.confirmations.load(Ordering::SeqCst), 1);
        assert!(matches!(checkout.phase(), CheckoutPhase::Confirmed { .. }));

        // Long after confirmation, nothing polls and nothing re-confirms.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(gateway.calls(), 4);
        assert_eq!(sink.confirmations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_stops_without_retry() {
        let gateway = FakeGateway::with_statuses(vec![
            Ok(PaymentStatus::Pending),
            Err(StoreError::Network("timeout".into())),
        ]);
        let sink = Arc::new(RecordingSink::default());
        let checkout = Checkout::new(gateway.clone(), sink.clone());

        checkout.begin(&user(), cart_request()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(gateway.calls(), 2);
        assert_eq!(sink.confirmations.load(Ordering::SeqCst), 0);
        assert!(matches!(checkout.phase(), CheckoutPhase::PollingStopped { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_signals_watchers() {
        let gateway =
            FakeGateway::with_statuses(vec![Err(StoreError::Network("timeout".into()))]);
        let sink = Arc::new(RecordingSink::default());
        let checkout = Checkout::new(gateway.clone(), sink.clone());

        checkout.begin(&user(), cart_request()).await.unwrap();
        let mut phases = checkout.subscribe();
        phases.borrow_and_update();

        // A watcher waiting on the phase channel must be released when the
        // poll dies, not hang until some unrelated transition.
        let signalled = tokio::time::timeout(Duration::from_secs(60), phases.changed()).await;
        assert!(signalled.is_ok());

        let phase = phases.borrow_and_update().clone();
        let CheckoutPhase::PollingStopped { intent, .. } = phase else {
            panic!("expected polling stopped, got {phase:?}");
        };
        // The charge is still payable; the QR survives the stop.
        assert_eq!(intent.id, "pix-1");
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandon_stops_polling() {
        let gateway = FakeGateway::with_statuses(vec![]);
        let sink = Arc::new(RecordingSink::default());
        let checkout = Checkout::new(gateway.clone(), sink.clone());

        checkout.begin(&user(), cart_request()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(gateway.calls(), 1);

        checkout.abandon();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(gateway.calls(), 1);
        assert!(matches!(checkout.phase(), CheckoutPhase::Abandoned));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_checkout_replaces_old_poll() {
        let gateway = FakeGateway::with_statuses(vec![]);
        let sink = Arc::new(RecordingSink::default());
        let checkout = Checkout::new(gateway.clone(), sink.clone());

        checkout.begin(&user(), cart_request()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(15)).await;

        // Second begin aborts the first poll; only one loop keeps running.
        checkout.begin(&user(), cart_request()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(40)).await;
        assert_eq!(gateway.calls(), 1 + 4);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected_before_network() {
        let cart = CartStore::new();
        let err = CheckoutRequest::from_cart(&cart).unwrap_err();
        assert_eq!(err.user_message(), "Seu carrinho está vazio!");
    }

    #[tokio::test]
    async fn test_direct_checkout_requires_positive_price() {
        let free = Product::new("900", "Manual", Price::ZERO);
        let err = CheckoutRequest::direct(&free, false).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPrice { .. }));
    }
}
