//! # PIX Store
//!
//! Terminal front end for the storefront engine.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STORE_API_URL=https://backend.example.com/exec
//! export STORE_LOGIN=ana@example.com
//! export STORE_LOGIN_KIND=email
//! export STORE_PASSWORD=...
//!
//! # Optional: buy a product and wait for the PIX payment
//! export STORE_BUY=101
//!
//! pix-store
//! ```

use std::sync::Arc;
use store_api::ApiClient;
use store_checkout::{
    Checkout, CheckoutPhase, CheckoutRequest, DetailsCache, OrderConfirmer, OrdersSync,
    SharedState, SyncOutcome,
};
use store_core::{GatewayRef, LogNotifier, MemoryStore, Notifier, PersistedState, SessionUser};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let client = Arc::new(ApiClient::from_env()?);
    client.connect().await?;

    let identifier = env_required("STORE_LOGIN")?;
    let kind = std::env::var("STORE_LOGIN_KIND").unwrap_or_else(|_| "email".to_string());
    let password = env_required("STORE_PASSWORD")?;

    let user = client.login(&identifier, &kind, &password).await?;
    info!("Logged in as {} (VIP: {})", user.first_name(), user.is_vip);

    let gateway: GatewayRef = client.clone();
    let state = SharedState::default();
    state.lock().session.set_user(user.clone());

    let persisted = Arc::new(PersistedState::open(MemoryStore::new())?);
    store_checkout::load_store(&gateway, &state, &persisted).await?;

    print_catalog(&state, user.is_vip);

    let details = Arc::new(DetailsCache::new());
    let orders = OrdersSync::new(gateway.clone(), details);
    match orders.sync().await {
        Ok(SyncOutcome::Updated(view)) => {
            info!("Orders: {}", view.orders.len());
            for item in &view.purchased {
                println!("  owned: [{}] {}", item.code, item.name);
            }
        }
        Ok(_) => {}
        Err(e) => warn!("order sync failed: {e}"),
    }

    if let Ok(code) = std::env::var("STORE_BUY") {
        buy(&gateway, &state, &persisted, &user, &code).await?;
    }

    Ok(())
}

fn env_required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("{name} not set"))
}

fn print_catalog(state: &SharedState, is_vip: bool) {
    let state = state.lock();
    println!("\n  Catálogo ({} produtos)", state.catalog.len());
    for product in state.catalog.all() {
        println!(
            "  [{}] {} — {}",
            product.code,
            product.name,
            product.effective_price(is_vip)
        );
    }
    println!();
}

/// Buy one product directly and follow the checkout until it settles
async fn buy(
    gateway: &GatewayRef,
    state: &SharedState,
    persisted: &Arc<PersistedState<MemoryStore>>,
    user: &SessionUser,
    code: &str,
) -> anyhow::Result<()> {
    let request = {
        let state = state.lock();
        let product = state
            .catalog
            .get(code)
            .ok_or_else(|| anyhow::anyhow!("product {code} not in catalog"))?;
        CheckoutRequest::direct(product, user.is_vip)?
    };

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let sink = Arc::new(OrderConfirmer::new(
        gateway.clone(),
        state.clone(),
        persisted.clone(),
        notifier,
    ));
    let checkout = Checkout::new(gateway.clone(), sink);

    let intent = checkout.begin(user, request).await?;
    println!("\n  Pague com o PIX copia-e-cola abaixo:\n");
    println!("  {}\n", intent.qr_code);

    let mut phases = checkout.subscribe();
    loop {
        phases.changed().await?;
        let phase = phases.borrow_and_update().clone();
        match phase {
            CheckoutPhase::Confirmed { order_id } => {
                println!("  Pedido {order_id} confirmado. Obrigado!");
                return Ok(());
            }
            CheckoutPhase::Failed { message } => {
                anyhow::bail!("checkout failed: {message}");
            }
            CheckoutPhase::PollingStopped { message, .. } => {
                anyhow::bail!(
                    "status check stopped: {message}. Pay with the QR above and run again to reconcile."
                );
            }
            _ => {}
        }
    }
}

fn print_banner() {
    println!(
        r#"
  🛒 PIX Store
  ━━━━━━━━━━━━━━━━━━━━━━━
  Storefront engine
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
