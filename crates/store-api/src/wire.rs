//! # Wire Types
//!
//! Serde types mirroring the backend's JSON, field names and all. The
//! backend speaks Portuguese (`sucesso`, `idPagamento`, `valorAvulso`) and
//! is loose with numbers: prices arrive as JSON numbers or as dot-decimal
//! strings. Everything is normalized into `store_core` types at this
//! boundary.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use store_core::{
    Category, OrderItem, OrderRecord, Price, Product, ProductCatalog, StoreData, StoreError,
    StoreResult,
};

/// Every backend response carries a success flag and an optional message
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub sucesso: bool,
    #[serde(default)]
    pub mensagem: Option<String>,
    #[serde(flatten)]
    pub payload: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload or map `sucesso: false` to an API error with the
    /// backend's message verbatim.
    pub fn into_result(self) -> StoreResult<T> {
        if !self.sucesso {
            return Err(StoreError::Api(self.mensagem.unwrap_or_default()));
        }
        self.payload
            .ok_or_else(|| StoreError::Serialization("response payload missing".to_string()))
    }

    /// Check the success flag only, for endpoints with no payload
    pub fn ack(self) -> StoreResult<()> {
        if self.sucesso {
            Ok(())
        } else {
            Err(StoreError::Api(self.mensagem.unwrap_or_default()))
        }
    }
}

/// Accepts `49.9`, `"49.90"` or nothing, normalized to centavos
fn price_opt<'de, D>(deserializer: D) -> Result<Price, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        None,
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(Price::new(n)),
        Raw::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(Price::ZERO);
            }
            trimmed
                .parse::<f64>()
                .map(Price::new)
                .map_err(|_| de::Error::custom(format!("invalid price: {s:?}")))
        }
        Raw::None => Ok(Price::ZERO),
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenPayload {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    pub nome: String,
    pub email: String,
    #[serde(default, rename = "isVIP")]
    pub is_vip: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixChargePayload {
    pub id_pagamento: String,
    pub qr_code: String,
    pub qr_code_base64: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub status_interno: String,
}

#[derive(Debug, Deserialize)]
pub struct WireProduct {
    pub codigo: String,
    pub nome: String,
    #[serde(default)]
    pub descricao: String,
    #[serde(default, rename = "valorAvulso", deserialize_with = "price_opt")]
    pub valor_avulso: Price,
    #[serde(default, rename = "valorPromocao", deserialize_with = "price_opt")]
    pub valor_promocao: Price,
    #[serde(default, rename = "valorAssinante", deserialize_with = "price_opt")]
    pub valor_assinante: Price,
    #[serde(default, rename = "temPromocao")]
    pub tem_promocao: bool,
    #[serde(default)]
    pub imagem: Option<String>,
    #[serde(default, rename = "imagensExtras")]
    pub imagens_extras: Vec<String>,
}

impl From<WireProduct> for Product {
    fn from(wire: WireProduct) -> Self {
        let category = Category::from_name(&wire.nome);
        Product {
            code: wire.codigo,
            name: wire.nome,
            description: wire.descricao,
            base_price: wire.valor_avulso,
            promo_price: wire.valor_promocao,
            subscriber_price: wire.valor_assinante,
            has_promo: wire.tem_promocao,
            image_url: wire.imagem,
            extra_images: wire.imagens_extras,
            category,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StoreDataPayload {
    #[serde(default)]
    pub produtos: Vec<WireProduct>,
    #[serde(default, rename = "isVIP")]
    pub is_vip: bool,
    #[serde(default, rename = "produtosComprados")]
    pub produtos_comprados: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl From<StoreDataPayload> for StoreData {
    fn from(payload: StoreDataPayload) -> Self {
        StoreData {
            catalog: ProductCatalog::new(payload.produtos.into_iter().map(Into::into).collect()),
            is_vip: payload.is_vip,
            purchased: payload.produtos_comprados,
            fetched_at: payload
                .timestamp
                .as_deref()
                .and_then(|ts| ts.parse().ok()),
        }
    }
}

/// Item inside a saved order. The backend stores order items as a JSON
/// string inside the order row, so these are parsed from a second decode.
#[derive(Debug, Deserialize)]
pub struct WireOrderItem {
    pub codigo: String,
    pub nome: String,
    #[serde(default, deserialize_with = "price_opt")]
    pub preco: Price,
    #[serde(default)]
    pub imagem: Option<String>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default, rename = "imagensExtras")]
    pub imagens_extras: Vec<String>,
}

impl From<WireOrderItem> for OrderItem {
    fn from(wire: WireOrderItem) -> Self {
        OrderItem {
            code: wire.codigo,
            name: wire.nome,
            price: wire.preco,
            image_url: wire.imagem,
            description: wire.descricao,
            extra_images: wire.imagens_extras,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireOrder {
    pub numero: String,
    #[serde(default)]
    pub data: Option<String>,
    /// JSON-encoded array of [`WireOrderItem`]
    #[serde(default)]
    pub itens: String,
    #[serde(default, deserialize_with = "price_opt")]
    pub total: Price,
    #[serde(default)]
    pub status: String,
}

impl WireOrder {
    /// Decode the nested item string; unparseable rows yield empty items
    /// rather than failing the whole order list.
    pub fn into_record(self) -> OrderRecord {
        let items: Vec<OrderItem> = serde_json::from_str::<Vec<WireOrderItem>>(&self.itens)
            .map(|items| items.into_iter().map(Into::into).collect())
            .unwrap_or_default();

        OrderRecord {
            number: self.numero,
            date: self.data.as_deref().and_then(|d| d.parse().ok()),
            items,
            total: self.total,
            status: self.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderListPayload {
    #[serde(default)]
    pub pedidos: Vec<WireOrder>,
}

/// Outgoing order item; prices go out as decimals, not centavos
#[derive(Debug, Serialize)]
pub struct WireOrderItemOut {
    pub codigo: String,
    pub nome: String,
    pub preco: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imagem: Option<String>,
}

/// Outgoing order row for `salvarPedido`
#[derive(Debug, Serialize)]
pub struct WireOrderOut {
    pub data: String,
    pub numero: String,
    /// JSON-encoded array of [`WireOrderItemOut`], matching what
    /// `listarPedidos` hands back
    pub itens: String,
    pub total: f64,
    pub status: String,
}

impl WireOrderOut {
    pub fn from_order(order: &store_core::Order) -> StoreResult<Self> {
        let items: Vec<WireOrderItemOut> = order
            .items
            .iter()
            .map(|item| WireOrderItemOut {
                codigo: item.code.clone(),
                nome: item.name.clone(),
                preco: item.unit_price.centavos() as f64 / 100.0,
                imagem: item.image_url.clone(),
            })
            .collect();

        Ok(Self {
            data: order.created_at.to_rfc3339(),
            numero: order.id.clone(),
            itens: serde_json::to_string(&items)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            total: order.total.centavos() as f64 / 100.0,
            status: order.status.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_failure_maps_to_api_error() {
        let env: Envelope<TokenPayload> =
            serde_json::from_str(r#"{"sucesso":false,"mensagem":"Sessão expirada"}"#).unwrap();
        let err = env.into_result().unwrap_err();
        assert_eq!(err.user_message(), "Sessão expirada");
    }

    #[test]
    fn test_price_accepts_number_and_string() {
        let json = r#"{
            "codigo": "101",
            "nome": "Windows 11 Pro",
            "valorAvulso": "49.90",
            "valorPromocao": 39.9,
            "temPromocao": true
        }"#;
        let product: Product = serde_json::from_str::<WireProduct>(json).unwrap().into();
        assert_eq!(product.base_price.centavos(), 4990);
        assert_eq!(product.promo_price.centavos(), 3990);
        assert_eq!(product.subscriber_price, Price::ZERO);
        assert_eq!(product.category, Category::Win11);
    }

    #[test]
    fn test_order_nested_items_decode() {
        let json = r#"{
            "numero": "pix-9",
            "data": "2025-03-01T12:00:00Z",
            "itens": "[{\"codigo\":\"101\",\"nome\":\"Windows 11 Pro\",\"preco\":49.9}]",
            "total": "49.90",
            "status": "Pago"
        }"#;
        let record = serde_json::from_str::<WireOrder>(json).unwrap().into_record();
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.items[0].code, "101");
        assert_eq!(record.total.centavos(), 4990);
    }

    #[test]
    fn test_order_bad_items_string_yields_empty() {
        let json = r#"{"numero":"pix-1","itens":"not json","total":10,"status":"Pago"}"#;
        let record = serde_json::from_str::<WireOrder>(json).unwrap().into_record();
        assert!(record.items.is_empty());
    }
}
