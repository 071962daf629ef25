// Asset stores: where template sources come from

mod fs;
mod memory;

pub use fs::FsAssetStore;
pub use memory::MemoryAssetStore;

use async_trait::async_trait;
use thiserror::Error;

/// Raw asset content plus the path it was found at.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub path: String,
    pub content: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset {0:?} not found")]
    NotFound(String),

    #[error("failed to read asset {name:?}: {source}")]
    Io {
        name: String,
        source: std::io::Error,
    },
}

/// Pluggable lookup of assets by name.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn find_asset(&self, name: &str) -> Result<Asset, AssetError>;
}
