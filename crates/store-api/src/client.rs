//! # Token-Gated API Client
//!
//! Every backend call spends the single-use session token it holds and
//! banks the replacement fetched alongside it. The token slot is guarded by
//! an async mutex, so calls serialize: no two requests can race for the
//! same token, and a call never observes the slot mid-rotation.
//!
//! Rotation runs concurrently with the request itself (`tokio::join!`), and
//! the call only resolves after both finish. A failed request still rotates;
//! a failed rotation empties the slot, and the next call fails fast with
//! [`StoreError::AuthTokenMissing`] instead of sending a spent token.

use crate::config::ApiConfig;
use crate::wire::{
    Envelope, LoginPayload, OrderListPayload, PixChargePayload, StatusPayload, StoreDataPayload,
    TokenPayload, WireOrderOut,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use store_core::{
    ChargeRequest, Order, OrderRecord, PaymentIntent, PaymentStatus, SessionUser, StoreData,
    StoreError, StoreGateway, StoreResult,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

pub struct ApiClient {
    config: ApiConfig,
    http: Client,
    /// Single-use session token; `None` after a failed rotation
    token: Mutex<Option<String>>,
    /// Identity sent on the per-user endpoints, set by `login`
    user_email: std::sync::Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http,
            token: Mutex::new(None),
            user_email: std::sync::Mutex::new(None),
        }
    }

    /// Create from config file / environment
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self::new(ApiConfig::load()?))
    }

    /// Fetch the first session token. Must succeed before any gated call.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> StoreResult<()> {
        let token = self.fetch_token().await?;
        *self.token.lock().await = Some(token);
        info!("session token acquired");
        Ok(())
    }

    pub async fn has_token(&self) -> bool {
        self.token.lock().await.is_some()
    }

    /// The one tokenless endpoint
    async fn fetch_token(&self) -> StoreResult<String> {
        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[("action", "getApiToken")])
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let envelope: Envelope<TokenPayload> = Self::parse(response).await?;
        Ok(envelope.into_result()?.token)
    }

    /// Spend the held token on one request while fetching its replacement.
    ///
    /// Holds the token lock for the whole exchange, which is what serializes
    /// concurrent callers.
    async fn exchange<T, F, Fut>(&self, send: F) -> StoreResult<Envelope<T>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = StoreResult<Envelope<T>>>,
    {
        let mut slot = self.token.lock().await;
        let token = slot.take().ok_or(StoreError::AuthTokenMissing)?;

        let (result, rotation) = tokio::join!(send(token), self.fetch_token());

        match rotation {
            Ok(next) => *slot = Some(next),
            Err(e) => {
                // Slot stays empty; the next call fails fast as fatal.
                error!(error = %e, "token rotation failed, session is dead");
            }
        }

        result
    }

    /// GET with `action` and the session token as query params
    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> StoreResult<Envelope<T>> {
        debug!(action, "api call");
        self.exchange(|token| async move {
            let response = self
                .http
                .get(&self.config.base_url)
                .query(&[("action", action), ("token", token.as_str())])
                .query(params)
                .send()
                .await
                .map_err(|e| StoreError::Network(e.to_string()))?;
            Self::parse(response).await
        })
        .await
    }

    /// POST with a multipart body, used by the write endpoints
    async fn call_form<T: DeserializeOwned>(
        &self,
        action: &str,
        fields: Vec<(&'static str, String)>,
    ) -> StoreResult<Envelope<T>> {
        debug!(action, "api form post");
        self.exchange(|token| async move {
            let mut form = reqwest::multipart::Form::new();
            for (name, value) in fields {
                form = form.text(name, value);
            }

            let response = self
                .http
                .post(&self.config.base_url)
                .query(&[("action", action), ("token", token.as_str())])
                .multipart(form)
                .send()
                .await
                .map_err(|e| StoreError::Network(e.to_string()))?;
            Self::parse(response).await
        })
        .await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> StoreResult<Envelope<T>> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !status.is_success() {
            error!(%status, body, "backend HTTP error");
            return Err(StoreError::Network(format!("HTTP {status}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| StoreError::Serialization(format!("Failed to parse response: {e}")))
    }

    /// Authenticate and return the user profile
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        identifier: &str,
        kind: &str,
        password: &str,
    ) -> StoreResult<SessionUser> {
        let envelope: Envelope<LoginPayload> = self
            .call(
                "login",
                &[
                    ("identificador", identifier),
                    ("tipo", kind),
                    ("senha", password),
                ],
            )
            .await?;
        let payload = envelope.into_result()?;

        info!(email = %payload.email, is_vip = payload.is_vip, "login ok");
        *self.user_email.lock().unwrap_or_else(|p| p.into_inner()) = Some(payload.email.clone());
        Ok(SessionUser::new(payload.email, payload.nome, payload.is_vip))
    }

    fn email(&self) -> String {
        self.user_email
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .unwrap_or_default()
    }
}

#[async_trait]
impl StoreGateway for ApiClient {
    #[instrument(skip(self, request), fields(total = %request.total))]
    async fn create_pix_charge(&self, request: &ChargeRequest) -> StoreResult<PaymentIntent> {
        let valor = request.total.to_wire();
        let envelope: Envelope<PixChargePayload> = self
            .call(
                "criarPagamentoPix",
                &[
                    ("email", &request.email),
                    ("nome", &request.name),
                    ("valor", &valor),
                    ("produto", &request.description),
                ],
            )
            .await?;
        let payload = envelope.into_result()?;

        info!(intent_id = %payload.id_pagamento, "PIX charge created");
        Ok(PaymentIntent {
            id: payload.id_pagamento,
            total: request.total,
            qr_code: payload.qr_code,
            qr_code_png: payload.qr_code_base64,
            status: PaymentStatus::Pending,
        })
    }

    async fn payment_status(&self, intent_id: &str) -> StoreResult<PaymentStatus> {
        let envelope: Envelope<StatusPayload> = self
            .call("verificarStatusPagamentoManual", &[("idPagamento", intent_id)])
            .await?;
        let payload = envelope.into_result()?;
        Ok(PaymentStatus::from_wire(&payload.status_interno))
    }

    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn save_order(&self, order: &Order) -> StoreResult<()> {
        let row = WireOrderOut::from_order(order)?;
        let pedido = serde_json::to_string(&row)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let envelope: Envelope<serde_json::Value> = self
            .call_form(
                "salvarPedido",
                vec![("email", self.email()), ("pedido", pedido)],
            )
            .await?;
        envelope.ack()?;

        info!("order saved");
        Ok(())
    }

    async fn initial_store_data(&self) -> StoreResult<StoreData> {
        let email = self.email();
        let envelope: Envelope<StoreDataPayload> = self
            .call("getInitialStoreData", &[("email", email.as_str())])
            .await?;
        Ok(envelope.into_result()?.into())
    }

    async fn list_orders(&self) -> StoreResult<Vec<OrderRecord>> {
        let email = self.email();
        let envelope: Envelope<OrderListPayload> = self
            .call("listarPedidos", &[("email", email.as_str())])
            .await?;
        let payload = envelope.into_result()?;
        Ok(payload
            .pedidos
            .into_iter()
            .map(|order| order.into_record())
            .collect())
    }

    #[instrument(skip(self))]
    async fn redeem_free_product(&self, code: &str, name: &str) -> StoreResult<()> {
        let envelope: Envelope<serde_json::Value> = self
            .call_form(
                "resgatarProdutoGratuito",
                vec![
                    ("email", self.email()),
                    ("code", code.to_string()),
                    ("nome", name.to_string()),
                ],
            )
            .await?;
        envelope.ack()?;

        info!(code, "free product redeemed");
        Ok(())
    }
}
