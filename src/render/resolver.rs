// Maps logical template names onto asset store lookups

use std::sync::Arc;
use tracing::debug;

use crate::assets::{AssetError, AssetStore};
use crate::error::RenderError;

/// Raw template source as found in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSource {
    pub name: String,
    pub path: String,
    pub text: String,
}

/// The only component that touches the asset store. No caching here.
#[derive(Clone)]
pub struct TemplateSourceResolver {
    store: Arc<dyn AssetStore>,
    extension: String,
    debug_files: bool,
}

impl TemplateSourceResolver {
    pub fn new(store: Arc<dyn AssetStore>, extension: impl Into<String>) -> Self {
        Self {
            store,
            extension: extension.into(),
            debug_files: false,
        }
    }

    /// Log every resolved template path at debug level.
    pub fn with_debug_files(mut self, debug_files: bool) -> Self {
        self.debug_files = debug_files;
        self
    }

    /// Store lookup key for a logical name: `home` -> `home.tmpl`.
    pub fn asset_name(&self, name: &str) -> String {
        format!("{}{}", name, self.extension)
    }

    pub async fn resolve(&self, name: &str) -> Result<TemplateSource, RenderError> {
        let asset_name = self.asset_name(name);
        let asset = self
            .store
            .find_asset(&asset_name)
            .await
            .map_err(|e| match e {
                AssetError::NotFound(_) => RenderError::TemplateNotFound {
                    name: name.to_string(),
                    referrer: None,
                },
                AssetError::Io { source, .. } => RenderError::AssetRead {
                    name: name.to_string(),
                    message: source.to_string(),
                },
            })?;

        let text = String::from_utf8(asset.content).map_err(|e| RenderError::AssetRead {
            name: name.to_string(),
            message: format!("{} is not valid UTF-8: {}", asset.path, e),
        })?;

        if self.debug_files {
            debug!(template = %name, path = %asset.path, "Resolved template");
        }

        Ok(TemplateSource {
            name: name.to_string(),
            path: asset.path,
            text,
        })
    }
}
