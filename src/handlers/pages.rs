// Page handlers: render a template named by the request path

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{cookie::Cookie, CookieJar};
use std::collections::HashMap;
use std::sync::Arc;

use super::extract::{PageContext, FLASH_COOKIE};
use crate::context::RequestContext;
use crate::error::AppError;
use crate::AppState;

type Params = HashMap<String, String>;

pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
    PageContext(ctx): PageContext,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    render_page(&state, "index", &params, &ctx, jar).await
}

pub async fn page(
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
    Query(params): Query<Params>,
    PageContext(ctx): PageContext,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let name = page_name(&page, &state.renderer.settings().layout_prefix)
        .ok_or_else(|| AppError::NotFound(page.clone()))?;
    render_page(&state, &name, &params, &ctx, jar).await
}

async fn render_page(
    state: &AppState,
    name: &str,
    params: &Params,
    ctx: &RequestContext,
    jar: CookieJar,
) -> Result<(CookieJar, Response), AppError> {
    let mut response = StatusCode::OK.into_response();
    state
        .renderer
        .render_to_response(name, params, ctx, &mut response)
        .await?;

    // Flashes are shown once.
    let jar = if ctx.flashes().is_empty() {
        jar
    } else {
        jar.remove(Cookie::build(FLASH_COOKIE).path("/"))
    };
    Ok((jar, response))
}

/// Logical template name for a request path. Layouts and anything that is
/// not a plain relative path are not pages.
pub fn page_name(path: &str, layout_prefix: &str) -> Option<String> {
    let name = path.trim_matches('/');
    if name.is_empty() {
        return Some("index".to_string());
    }

    let plain = name
        .split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != ".." && !segment.contains('\\'));
    let layout_prefix = layout_prefix.trim_matches('/');
    let is_layout = !layout_prefix.is_empty()
        && (name == layout_prefix || name.starts_with(&format!("{}/", layout_prefix)));

    if plain && !is_layout {
        Some(name.to_string())
    } else {
        None
    }
}
