// Common test utilities shared across test files

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use layoutd::assets::{Asset, AssetError, AssetStore, MemoryAssetStore};
use layoutd::{RenderSettings, Renderer};

/// Settings that do not depend on the environment.
#[allow(dead_code)]
pub fn test_settings() -> RenderSettings {
    RenderSettings {
        default_locale: "en".to_string(),
        ..RenderSettings::default()
    }
}

/// In-memory store holding `name.tmpl` for every `(name, source)`.
#[allow(dead_code)]
pub fn memory_store(templates: &[(&str, &str)]) -> Arc<MemoryAssetStore> {
    let store = MemoryAssetStore::new();
    for (name, source) in templates {
        store.insert(format!("{}.tmpl", name), *source);
    }
    Arc::new(store)
}

#[allow(dead_code)]
pub fn renderer_with(templates: &[(&str, &str)]) -> Renderer {
    Renderer::builder(test_settings())
        .asset_store(memory_store(templates))
        .build()
}

/// Wraps a store, counting lookups per asset name and slowing them down so
/// concurrent requests overlap.
#[allow(dead_code)]
pub struct CountingStore {
    inner: Arc<MemoryAssetStore>,
    lookups: parking_lot::Mutex<HashMap<String, Arc<AtomicUsize>>>,
    delay: Duration,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn new(inner: Arc<MemoryAssetStore>, delay: Duration) -> Self {
        Self {
            inner,
            lookups: parking_lot::Mutex::new(HashMap::new()),
            delay,
        }
    }

    pub fn lookups(&self, asset: &str) -> usize {
        self.lookups
            .lock()
            .get(asset)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

#[async_trait]
impl AssetStore for CountingStore {
    async fn find_asset(&self, name: &str) -> Result<Asset, AssetError> {
        let counter = self
            .lookups
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.find_asset(name).await
    }
}
