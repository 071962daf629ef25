// In-memory asset store for embedded templates and tests

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{Asset, AssetError, AssetStore};

#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    assets: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `insert`.
    pub fn with(self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }

    pub fn insert(&self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.assets.write().insert(name.into(), content.into());
    }

    pub fn remove(&self, name: &str) -> bool {
        self.assets.write().remove(name).is_some()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn find_asset(&self, name: &str) -> Result<Asset, AssetError> {
        let assets = self.assets.read();
        assets
            .get(name)
            .map(|content| Asset {
                path: format!("memory://{}", name),
                content: content.clone(),
            })
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }
}
