// Compiled-template cache with one compilation in flight per name

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::RenderError;
use crate::template::CompiledTemplate;

type Compiled = Result<Arc<CompiledTemplate>, RenderError>;
type Slot = Arc<OnceCell<Compiled>>;

/// Name -> compiled template. Concurrent first requests for one name share a
/// single compilation; different names never wait on each other.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: Mutex<HashMap<String, Slot>>,
    cache_failures: bool,
}

impl TemplateCache {
    /// With `cache_failures`, a failed compilation is returned to every later
    /// caller until the name is invalidated; otherwise the next call retries.
    pub fn new(cache_failures: bool) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            cache_failures,
        }
    }

    pub async fn get_or_compile<F, Fut>(&self, name: &str, compile: F) -> Compiled
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CompiledTemplate, RenderError>>,
    {
        let slot = {
            let mut entries = self.entries.lock();
            entries.entry(name.to_string()).or_default().clone()
        };

        if let Some(compiled) = slot.get() {
            debug!(template = %name, "Template cache hit");
            return compiled.clone();
        }

        let compiled = slot
            .get_or_init(|| async {
                debug!(template = %name, "Compiling template");
                compile().await.map(Arc::new)
            })
            .await
            .clone();

        if compiled.is_err() && !self.cache_failures {
            let mut entries = self.entries.lock();
            // Only drop the slot we waited on; a retry may already own a new one.
            if entries.get(name).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
                entries.remove(name);
            }
        }

        compiled
    }

    /// Forget `name` so the next request compiles it again.
    pub fn invalidate(&self, name: &str) -> bool {
        self.entries.lock().remove(name).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Whether `name` has a finished compilation, successful or not.
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .lock()
            .get(name)
            .is_some_and(|slot| slot.initialized())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
