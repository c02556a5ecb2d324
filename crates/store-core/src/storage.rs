//! # Persisted Client State
//!
//! Key/value persistence behind a trait so the engine runs against browser
//! local storage, a file, or plain memory in tests. All keys carry the
//! `pixstore_` prefix and every payload is JSON.
//!
//! A version stamp guards the whole namespace: when the stored version does
//! not match [`STATE_VERSION`], every prefixed key is dropped before use.

use crate::cart::CartItem;
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Namespace prefix for every persisted key
pub const KEY_PREFIX: &str = "pixstore_";

/// Bump to invalidate all persisted state on upgrade
pub const STATE_VERSION: &str = "1.0";

const KEY_VERSION: &str = "pixstore_version";
const KEY_CART: &str = "pixstore_cart";
const KEY_LOGIN: &str = "pixstore_login";

/// Raw string key/value persistence
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
    /// All stored keys, used for namespace invalidation
    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// In-memory store, used in tests and as a fallback when the platform
/// offers no persistence
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("store lock poisoned".into()))?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Storage("store lock poisoned".into()))?;
        Ok(entries.keys().cloned().collect())
    }
}

/// Remembered login form state ("lembrar de mim")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberedLogin {
    pub identifier: String,
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionStamp {
    version: String,
    stamped_at: DateTime<Utc>,
}

/// Typed view over a [`StateStore`]: versioned namespace plus the snapshots
/// the storefront persists between visits.
pub struct PersistedState<S: StateStore> {
    store: S,
}

impl<S: StateStore> PersistedState<S> {
    /// Wrap a store, invalidating the namespace on version mismatch.
    pub fn open(store: S) -> StoreResult<Self> {
        let state = Self { store };
        let current = state
            .read_json::<VersionStamp>(KEY_VERSION)?
            .map(|stamp| stamp.version);

        if current.as_deref() != Some(STATE_VERSION) {
            if current.is_some() {
                tracing::info!(
                    from = current.as_deref().unwrap_or(""),
                    to = STATE_VERSION,
                    "persisted state version changed, clearing namespace"
                );
            }
            state.clear_namespace()?;
            state.write_json(
                KEY_VERSION,
                &VersionStamp {
                    version: STATE_VERSION.to_string(),
                    stamped_at: Utc::now(),
                },
            )?;
        }
        Ok(state)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drop every key under the `pixstore_` prefix
    fn clear_namespace(&self) -> StoreResult<()> {
        for key in self.store.keys()? {
            if key.starts_with(KEY_PREFIX) {
                self.store.remove(&key)?;
            }
        }
        Ok(())
    }

    /// Logout: drop everything persisted, then restamp the version so the
    /// next visit starts clean.
    pub fn clear(&self) -> StoreResult<()> {
        self.clear_namespace()?;
        self.write_json(
            KEY_VERSION,
            &VersionStamp {
                version: STATE_VERSION.to_string(),
                stamped_at: Utc::now(),
            },
        )
    }

    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.store.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    pub fn write_json<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let raw =
            serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(key, &raw)
    }

    pub fn load_cart(&self) -> StoreResult<Vec<CartItem>> {
        Ok(self.read_json(KEY_CART)?.unwrap_or_default())
    }

    pub fn save_cart(&self, items: &[CartItem]) -> StoreResult<()> {
        self.write_json(KEY_CART, &items)
    }

    pub fn clear_cart(&self) -> StoreResult<()> {
        self.store.remove(KEY_CART)
    }

    pub fn remembered_login(&self) -> StoreResult<Option<RememberedLogin>> {
        self.read_json(KEY_LOGIN)
    }

    pub fn remember_login(&self, login: &RememberedLogin) -> StoreResult<()> {
        self.write_json(KEY_LOGIN, login)
    }

    pub fn forget_login(&self) -> StoreResult<()> {
        self.store.remove(KEY_LOGIN)
    }
}
