//! # Store Error Types
//!
//! Typed error handling for the storefront client engine.
//! All store operations return `Result<T, StoreError>`.

use thiserror::Error;

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// No session token is held. Fatal for the current session: the only
    /// recovery is a full client restart (page reload in the browser).
    #[error("API call attempted without a session token")]
    AuthTokenMissing,

    /// Network/HTTP transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Business-rule rejection reported by the backend (`sucesso: false`)
    #[error("API error: {0}")]
    Api(String),

    /// Client-side precondition failure, blocks the action before any
    /// network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Product already present in the cart
    #[error("Product already in cart: {code}")]
    DuplicateItem { code: String },

    /// Product not found in the catalog
    #[error("Product not found: {code}")]
    ProductNotFound { code: String },

    /// Price missing or non-positive where a positive price is required
    #[error("Invalid price for product: {code}")]
    InvalidPrice { code: String },

    /// Configuration errors (missing env vars, bad config file)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persisted client-state (storage) failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// True for errors that end the session; the client must restart.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::AuthTokenMissing)
    }

    /// True if retrying the same operation may succeed. The engine never
    /// auto-retries; this only informs what the caller surfaces.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Network(_))
    }

    /// User-facing notification text (pt-BR, toast copy). Backend messages
    /// pass through verbatim; everything else maps to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::AuthTokenMissing => {
                "Erro de segurança. A página será recarregada.".to_string()
            }
            StoreError::Network(_) => {
                "Erro ao processar. Verifique sua conexão.".to_string()
            }
            StoreError::Api(message) if !message.is_empty() => message.clone(),
            StoreError::Api(_) => "Erro ao processar. Tente novamente.".to_string(),
            StoreError::Validation(message) => message.clone(),
            StoreError::DuplicateItem { .. } => {
                "Este produto já está no seu carrinho!".to_string()
            }
            StoreError::ProductNotFound { .. } => {
                "Produto não encontrado. Contate o suporte.".to_string()
            }
            StoreError::InvalidPrice { .. } => {
                "Preço inválido para o produto. Contate o suporte.".to_string()
            }
            _ => "Erro interno. Tente novamente.".to_string(),
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(StoreError::AuthTokenMissing.is_fatal());
        assert!(!StoreError::Network("timeout".into()).is_fatal());
        assert!(!StoreError::Api("rejected".into()).is_fatal());
    }

    #[test]
    fn test_retryable_errors() {
        assert!(StoreError::Network("timeout".into()).is_retryable());
        assert!(!StoreError::Validation("empty cart".into()).is_retryable());
        assert!(!StoreError::AuthTokenMissing.is_retryable());
    }

    #[test]
    fn test_api_message_passthrough() {
        let err = StoreError::Api("Pagamento recusado".into());
        assert_eq!(err.user_message(), "Pagamento recusado");

        let blank = StoreError::Api(String::new());
        assert_eq!(blank.user_message(), "Erro ao processar. Tente novamente.");
    }
}
