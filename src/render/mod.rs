// Render engine: function values, layouts and nested composition
//
// A render call builds its function values in layers (builtins and
// `register_func` bindings, then registered makers in order, then call-site
// bindings), binds `render`/`require`/`include`/`yield`, and runs either the
// layout (which yields to the page) or the page itself.

mod cache;
mod call;
mod page;
mod resolver;
mod template;

pub use cache::TemplateCache;
pub use call::MAX_DEPTH;
pub use page::{FormHook, FormState, HookKind, PageHandlers, PageHook};
pub use resolver::{TemplateSource, TemplateSourceResolver};
pub use template::TemplateRender;

use axum::response::Response;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::assets::{AssetStore, FsAssetStore};
use crate::config::RenderSettings;
use crate::context::RequestContext;
use crate::error::RenderError;
use crate::funcs::{Composition, FuncMapMaker, FuncMapRegistry, FunctionValue, FunctionValueSet, Html};
use crate::helpers::{self, IdGenerator, RequestContextMaker, UuidGenerator};
use crate::i18n::{Localizer, YamlCatalog};
use crate::security::{HtmlSanitizer, UgcSanitizer};
use crate::template::CompiledTemplate;

const COMPOSITIONS: [(&str, Composition); 4] = [
    ("render", Composition::Render),
    ("require", Composition::Require),
    ("include", Composition::Include),
    ("yield", Composition::Yield),
];

pub struct Renderer {
    settings: RenderSettings,
    resolver: TemplateSourceResolver,
    cache: TemplateCache,
    funcs: RwLock<FunctionValueSet>,
    makers: RwLock<FuncMapRegistry>,
    sanitizer: Arc<dyn HtmlSanitizer>,
    ids: Arc<dyn IdGenerator>,
    page: Arc<PageHandlers>,
}

impl Renderer {
    pub fn builder(settings: RenderSettings) -> RendererBuilder {
        RendererBuilder::new(settings)
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    pub fn resolver(&self) -> &TemplateSourceResolver {
        &self.resolver
    }

    /// Form, script and style hooks registered on the builder.
    pub fn page_handlers(&self) -> &PageHandlers {
        &self.page
    }

    /// Bind a function value for every render. Makers and call-site bindings
    /// override it.
    pub fn register_func(&self, name: impl Into<String>, value: FunctionValue) {
        self.funcs.write().set(name, value);
    }

    /// Add a maker, or replace the one registered under `name` in place.
    pub fn register_func_map_maker<M>(&self, name: impl Into<String>, maker: M)
    where
        M: FuncMapMaker + 'static,
    {
        self.makers.write().register(name, Arc::new(maker));
    }

    pub fn maker_names(&self) -> Vec<String> {
        self.makers.read().names().map(str::to_string).collect()
    }

    /// Render with the default layout.
    pub fn template(&self) -> TemplateRender<'_> {
        TemplateRender::with_default_layout(self)
    }

    /// Render with `name` as a layout that must exist.
    pub fn layout(&self, name: impl Into<String>) -> TemplateRender<'_> {
        self.template().with_layout(name)
    }

    pub async fn execute<T>(&self, name: &str, data: &T, ctx: &RequestContext) -> Result<Html, RenderError>
    where
        T: Serialize + ?Sized,
    {
        self.template().execute(name, data, ctx).await
    }

    pub async fn render_to_response<T>(
        &self,
        name: &str,
        data: &T,
        ctx: &RequestContext,
        response: &mut Response,
    ) -> Result<(), RenderError>
    where
        T: Serialize + ?Sized,
    {
        self.template()
            .render_to_response(name, data, ctx, response)
            .await
    }

    /// `application` -> `layouts/application`.
    pub fn layout_name(&self, layout: &str) -> String {
        let prefix = self.settings.layout_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            layout.to_string()
        } else {
            format!("{}/{}", prefix, layout)
        }
    }

    pub(crate) async fn load(&self, name: &str) -> Result<Arc<CompiledTemplate>, RenderError> {
        self.cache
            .get_or_compile(name, || async {
                let source = self.resolver.resolve(name).await?;
                CompiledTemplate::compile(source.name, source.path, &source.text)
            })
            .await
    }

    pub(crate) fn build_funcs(
        &self,
        ctx: &RequestContext,
        call_site: &FunctionValueSet,
    ) -> Result<FunctionValueSet, RenderError> {
        let mut funcs = helpers::builtin_funcs(
            ctx,
            self.sanitizer.clone(),
            self.ids.clone(),
            &self.settings.default_locale,
        );
        funcs.append_values(&self.funcs.read());
        self.makers.read().materialize_into(&mut funcs, ctx)?;
        funcs.append_values(call_site);

        for (name, kind) in COMPOSITIONS {
            funcs.set(name, FunctionValue::Compose(kind));
        }
        Ok(funcs)
    }
}

pub struct RendererBuilder {
    settings: RenderSettings,
    store: Option<Arc<dyn AssetStore>>,
    sanitizer: Arc<dyn HtmlSanitizer>,
    ids: Arc<dyn IdGenerator>,
    localizer: Option<Arc<dyn Localizer>>,
    page: PageHandlers,
}

impl RendererBuilder {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            store: None,
            sanitizer: Arc::new(UgcSanitizer),
            ids: Arc::new(UuidGenerator),
            localizer: None,
            page: PageHandlers::new(),
        }
    }

    /// Defaults to a filesystem store over `template_paths`.
    pub fn asset_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn sanitizer(mut self, sanitizer: Arc<dyn HtmlSanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Defaults to an empty catalog, so `t` falls back to defaults and keys.
    pub fn localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = Some(localizer);
        self
    }

    pub fn form_handler(mut self, hook: FormHook) -> Self {
        self.page.add_form(hook);
        self
    }

    pub fn script_handler(mut self, hook: PageHook) -> Self {
        self.page.add(HookKind::Script, hook);
        self
    }

    pub fn style_handler(mut self, hook: PageHook) -> Self {
        self.page.add(HookKind::Style, hook);
        self
    }

    pub fn build(self) -> Renderer {
        let settings = self.settings;
        let store: Arc<dyn AssetStore> = match self.store {
            Some(store) => store,
            None => Arc::new(FsAssetStore::new(settings.template_paths.clone())),
        };
        let localizer: Arc<dyn Localizer> = match self.localizer {
            Some(localizer) => localizer,
            None => Arc::new(YamlCatalog::new(settings.default_locale.clone())),
        };

        let resolver = TemplateSourceResolver::new(store, settings.template_extension.clone())
            .with_debug_files(settings.debug_files);

        let page = Arc::new(self.page);
        let mut makers = FuncMapRegistry::new();
        makers.register(
            RequestContextMaker::NAME,
            Arc::new(RequestContextMaker::new(
                settings.default_locale.clone(),
                localizer,
                page.clone(),
            )),
        );

        Renderer {
            cache: TemplateCache::new(settings.cache_failures),
            resolver,
            funcs: RwLock::new(FunctionValueSet::new()),
            makers: RwLock::new(makers),
            sanitizer: self.sanitizer,
            ids: self.ids,
            page,
            settings,
        }
    }
}
