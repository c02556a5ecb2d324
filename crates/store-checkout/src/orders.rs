//! # Order Sync
//!
//! Pulls the user's saved orders and derives the purchases view: orders
//! newest first, purchased items flattened and deduplicated, with the VIP
//! subscription pinned to the front. Rebuilds are skipped while a sync is
//! already in flight and when the order list has not changed.

use crate::cache::DetailsCache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use store_core::{GatewayRef, OrderItem, OrderRecord, StoreResult, VIP_PRODUCT_CODE};
use tracing::{debug, info, instrument};

/// The derived purchases view
#[derive(Debug, Clone, Default)]
pub struct OrdersView {
    /// Saved orders, newest first
    pub orders: Vec<OrderRecord>,
    /// One entry per owned product, VIP subscription first
    pub purchased: Vec<OrderItem>,
}

/// Outcome of a sync pass
#[derive(Debug)]
pub enum SyncOutcome {
    /// Order list changed; a fresh view was built
    Updated(OrdersView),
    /// Same orders as last time
    Unchanged,
    /// Another sync was already running
    Skipped,
}

pub struct OrdersSync {
    gateway: GatewayRef,
    details: Arc<DetailsCache>,
    last_signature: Mutex<Option<String>>,
    in_flight: AtomicBool,
}

impl OrdersSync {
    pub fn new(gateway: GatewayRef, details: Arc<DetailsCache>) -> Self {
        Self {
            gateway,
            details,
            last_signature: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Fetch orders and rebuild the purchases view if anything changed.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> StoreResult<SyncOutcome> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("order sync already running, skipping");
            return Ok(SyncOutcome::Skipped);
        }
        let result = self.run().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn run(&self) -> StoreResult<SyncOutcome> {
        let mut orders = self.gateway.list_orders().await?;

        let signature = signature_of(&orders);
        {
            let mut last = self.last_signature.lock().unwrap();
            if last.as_deref() == Some(signature.as_str()) {
                debug!("order list unchanged");
                return Ok(SyncOutcome::Unchanged);
            }
            *last = Some(signature);
        }

        // Newest first; undated orders sink to the end.
        orders.sort_by(|a, b| b.date.cmp(&a.date));

        let purchased = flatten_purchased(&orders);
        self.details.fill_from_order_items(&purchased);

        info!(orders = orders.len(), items = purchased.len(), "orders view rebuilt");
        Ok(SyncOutcome::Updated(OrdersView { orders, purchased }))
    }
}

/// Change detection without comparing full payloads: sorted
/// order-number/item-code pairs, so a decoded item list changing inside
/// an existing order counts as a change too.
fn signature_of(orders: &[OrderRecord]) -> String {
    let mut keys: Vec<String> = Vec::new();
    for order in orders {
        if order.items.is_empty() {
            keys.push(order.number.clone());
        }
        for item in &order.items {
            keys.push(format!("{}/{}", order.number, item.code));
        }
    }
    keys.sort_unstable();
    format!("{}:{}", orders.len(), keys.join(","))
}

/// One entry per product code, first occurrence wins (orders arrive newest
/// first), with the VIP subscription pinned to the front.
fn flatten_purchased(orders: &[OrderRecord]) -> Vec<OrderItem> {
    let mut seen = std::collections::HashSet::new();
    let mut vip: Option<OrderItem> = None;
    let mut rest = Vec::new();

    for order in orders {
        for item in &order.items {
            if !seen.insert(item.code.clone()) {
                continue;
            }
            if item.code == VIP_PRODUCT_CODE {
                vip = Some(item.clone());
            } else {
                rest.push(item.clone());
            }
        }
    }

    let mut purchased = Vec::with_capacity(rest.len() + 1);
    if let Some(vip) = vip {
        purchased.push(vip);
    }
    purchased.extend(rest);
    purchased
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;
    use store_core::{
        ChargeRequest, Order, PaymentIntent, PaymentStatus, Price, StoreData, StoreGateway,
    };

    struct ListGateway {
        orders: Mutex<Vec<OrderRecord>>,
        list_calls: AtomicUsize,
    }

    #[async_trait]
    impl StoreGateway for ListGateway {
        async fn create_pix_charge(&self, _request: &ChargeRequest) -> StoreResult<PaymentIntent> {
            unimplemented!()
        }

        async fn payment_status(&self, _intent_id: &str) -> StoreResult<PaymentStatus> {
            unimplemented!()
        }

        async fn save_order(&self, _order: &Order) -> StoreResult<()> {
            Ok(())
        }

        async fn initial_store_data(&self) -> StoreResult<StoreData> {
            unimplemented!()
        }

        async fn list_orders(&self) -> StoreResult<Vec<OrderRecord>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.orders.lock().unwrap().clone())
        }

        async fn redeem_free_product(&self, _code: &str, _name: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    fn item(code: &str, name: &str) -> OrderItem {
        OrderItem {
            code: code.into(),
            name: name.into(),
            price: Price::new(49.90),
            image_url: None,
            description: Some(format!("descrição de {name}")),
            extra_images: vec![],
        }
    }

    fn order(number: &str, day: u32, items: Vec<OrderItem>) -> OrderRecord {
        OrderRecord {
            number: number.into(),
            date: Some(Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()),
            items,
            total: Price::new(49.90),
            status: "Pago".into(),
        }
    }

    fn sync_with(orders: Vec<OrderRecord>) -> (OrdersSync, Arc<ListGateway>, Arc<DetailsCache>) {
        let gateway = Arc::new(ListGateway {
            orders: Mutex::new(orders),
            list_calls: AtomicUsize::new(0),
        });
        let details = Arc::new(DetailsCache::new());
        let sync = OrdersSync::new(gateway.clone(), details.clone());
        (sync, gateway, details)
    }

    #[tokio::test]
    async fn test_vip_pinned_first_and_deduped() {
        let (sync, _, details) = sync_with(vec![
            order("p-2", 10, vec![item("101", "Windows 11 Pro")]),
            order(
                "p-3",
                20,
                vec![item("102", "Windows 10 Home"), item(VIP_PRODUCT_CODE, "Assinatura VIP")],
            ),
            // Older duplicate of 101, must not appear twice.
            order("p-1", 1, vec![item("101", "Windows 11 Pro")]),
        ]);

        let SyncOutcome::Updated(view) = sync.sync().await.unwrap() else {
            panic!("expected updated view");
        };

        let codes: Vec<&str> = view.purchased.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec![VIP_PRODUCT_CODE, "102", "101"]);

        // Orders come back newest first.
        let numbers: Vec<&str> = view.orders.iter().map(|o| o.number.as_str()).collect();
        assert_eq!(numbers, vec!["p-3", "p-2", "p-1"]);

        // Details cache picked up the descriptions from the order rows.
        assert!(details.get("101").is_some());
    }

    #[tokio::test]
    async fn test_unchanged_list_skips_rebuild() {
        let (sync, gateway, _) = sync_with(vec![order("p-1", 1, vec![item("101", "X")])]);

        assert!(matches!(sync.sync().await.unwrap(), SyncOutcome::Updated(_)));
        assert!(matches!(sync.sync().await.unwrap(), SyncOutcome::Unchanged));

        // A new order shows up; the view rebuilds.
        gateway
            .orders
            .lock()
            .unwrap()
            .push(order("p-2", 2, vec![item("102", "Y")]));
        assert!(matches!(sync.sync().await.unwrap(), SyncOutcome::Updated(_)));
    }

    #[tokio::test]
    async fn test_item_change_inside_same_order_rebuilds() {
        // An order row whose item list could not be decoded on the first
        // pass shows up empty; when it decodes later, same order numbers,
        // the view must still rebuild.
        let (sync, gateway, _) = sync_with(vec![order("p-1", 1, vec![])]);
        assert!(matches!(sync.sync().await.unwrap(), SyncOutcome::Updated(_)));

        gateway.orders.lock().unwrap()[0] = order("p-1", 1, vec![item("101", "X")]);
        assert!(matches!(sync.sync().await.unwrap(), SyncOutcome::Updated(_)));
        assert!(matches!(sync.sync().await.unwrap(), SyncOutcome::Unchanged));
    }
}
