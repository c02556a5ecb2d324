//! # Client Caches
//!
//! Two caches keep repeat visits cheap: product details scraped from saved
//! orders, and pre-fetched product images persisted between sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use store_core::{OrderItem, PersistedState, StateStore, StoreResult};
use tracing::{debug, info, warn};

const IMAGE_CACHE_KEY: &str = "pixstore_images";

/// Persist the image map after this many new entries
const SAVE_EVERY: usize = 10;

/// Oldest entries beyond this are pruned
const MAX_IMAGES: usize = 100;

/// Images fetched concurrently per batch
const BATCH_SIZE: usize = 5;

/// Details shown on a purchased product, memoized per code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub description: String,
    pub extra_images: Vec<String>,
}

/// In-memory memo of product details. Filled from order rows so the
/// purchases screen never refetches what an order already carried.
#[derive(Debug, Default)]
pub struct DetailsCache {
    entries: Mutex<HashMap<String, ProductDetails>>,
}

impl DetailsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &str) -> Option<ProductDetails> {
        self.entries.lock().unwrap().get(code).cloned()
    }

    pub fn insert(&self, code: impl Into<String>, details: ProductDetails) {
        self.entries.lock().unwrap().insert(code.into(), details);
    }

    /// Memoize details carried on order items; first write per code wins
    pub fn fill_from_order_items(&self, items: &[OrderItem]) {
        let mut entries = self.entries.lock().unwrap();
        for item in items {
            if entries.contains_key(&item.code) {
                continue;
            }
            let Some(description) = &item.description else {
                continue;
            };
            entries.insert(
                item.code.clone(),
                ProductDetails {
                    description: description.clone(),
                    extra_images: item.extra_images.clone(),
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

/// Fetches one image, returning it encoded for storage
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> StoreResult<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedImage {
    pub data: String,
    pub cached_at: DateTime<Utc>,
}

/// Persisted image cache. Preloading walks uncached URLs in small batches,
/// saving periodically so an interrupted preload still keeps its progress.
pub struct ImagePrecache<S: StateStore> {
    persisted: Arc<PersistedState<S>>,
    entries: Mutex<HashMap<String, CachedImage>>,
}

impl<S: StateStore> ImagePrecache<S> {
    /// Open the cache, restoring previously persisted entries
    pub fn open(persisted: Arc<PersistedState<S>>) -> StoreResult<Self> {
        let entries: HashMap<String, CachedImage> = persisted
            .read_json(IMAGE_CACHE_KEY)?
            .unwrap_or_default();
        if !entries.is_empty() {
            debug!(count = entries.len(), "restored image cache");
        }
        Ok(Self {
            persisted,
            entries: Mutex::new(entries),
        })
    }

    pub fn get(&self, url: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(url)
            .map(|entry| entry.data.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Fetch every URL not already cached, [`BATCH_SIZE`] at a time.
    /// Individual failures are logged and skipped.
    pub async fn preload(&self, urls: &[String], source: Arc<dyn ImageSource>) -> StoreResult<()> {
        let pending: Vec<String> = {
            let entries = self.entries.lock().unwrap();
            urls.iter()
                .filter(|url| !entries.contains_key(*url))
                .cloned()
                .collect()
        };

        if pending.is_empty() {
            return Ok(());
        }
        info!(count = pending.len(), "preloading product images");

        let mut added = 0usize;
        for batch in pending.chunks(BATCH_SIZE) {
            let mut tasks = Vec::with_capacity(batch.len());
            for url in batch {
                let source = source.clone();
                let url = url.clone();
                tasks.push(tokio::spawn(async move {
                    let result = source.fetch(&url).await;
                    (url, result)
                }));
            }

            for task in tasks {
                let Ok((url, result)) = task.await else {
                    continue;
                };
                match result {
                    Ok(data) => {
                        self.entries.lock().unwrap().insert(
                            url,
                            CachedImage {
                                data,
                                cached_at: Utc::now(),
                            },
                        );
                        added += 1;
                        if added % SAVE_EVERY == 0 {
                            self.save()?;
                        }
                    }
                    Err(e) => {
                        warn!(url, error = %e, "image fetch failed, skipping");
                    }
                }
            }
        }

        self.prune();
        self.save()
    }

    /// Keep only the newest [`MAX_IMAGES`] entries
    fn prune(&self) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() <= MAX_IMAGES {
            return;
        }
        let mut by_age: Vec<(String, DateTime<Utc>)> = entries
            .iter()
            .map(|(url, entry)| (url.clone(), entry.cached_at))
            .collect();
        by_age.sort_by(|a, b| b.1.cmp(&a.1));
        for (url, _) in by_age.into_iter().skip(MAX_IMAGES) {
            entries.remove(&url);
        }
    }

    fn save(&self) -> StoreResult<()> {
        let entries = self.entries.lock().unwrap();
        self.persisted.write_json(IMAGE_CACHE_KEY, &*entries)
    }
}
