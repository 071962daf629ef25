pub mod assets;
pub mod config;
pub mod context;
pub mod error;
pub mod funcs;
pub mod handlers;
pub mod helpers;
pub mod i18n;
pub mod render;
pub mod security;
pub mod template;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use config::RenderSettings;
pub use context::{Flash, RequestContext};
pub use error::{AppError, HelperError, MakerError, RenderError};
pub use funcs::{FuncMapMaker, FunctionValue, FunctionValueSet, Html, Value};
pub use render::{Renderer, RendererBuilder, TemplateRender};

// Application state
pub struct AppState {
    pub renderer: Renderer,
}

// Public function to create the router
pub fn create_router(renderer: Renderer) -> Router {
    let settings = renderer.settings().clone();
    let state = Arc::new(AppState { renderer });

    let mut router = Router::new()
        .route("/", get(handlers::pages::index))
        .route("/{*page}", get(handlers::pages::page));

    if let Some(dir) = &settings.static_dir {
        router = router.nest_service(&settings.static_prefix, ServeDir::new(dir));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
