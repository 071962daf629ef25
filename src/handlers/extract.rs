// Request context extractor for page handlers

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use std::convert::Infallible;
use std::sync::Arc;

use crate::context::{Flash, RequestContext};

pub const LOCALE_COOKIE: &str = "locale";
pub const FLASH_COOKIE: &str = "flash";

// Extractor for the render context of the current request
// Usage: async fn handler(PageContext(ctx): PageContext) { ... }
pub struct PageContext(pub RequestContext);

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
    Arc<crate::AppState>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<crate::AppState>::from_ref(state);
        let settings = app_state.renderer.settings();
        let jar = CookieJar::from_headers(&parts.headers);

        let mut ctx = RequestContext::new()
            .with_mount_path(settings.mount_path.clone())
            .with_static_prefix(settings.static_prefix.clone());

        for (storage, base_url) in &settings.media {
            ctx = ctx.with_media(storage.clone(), base_url.clone());
        }

        for cookie in jar.iter() {
            ctx = ctx.with_cookie(cookie.name(), cookie.value());
        }

        if let Some(locale) = jar.get(LOCALE_COOKIE) {
            ctx = ctx.with_locale(locale.value());
        }

        if let Some(flash) = jar.get(FLASH_COOKIE) {
            for flash in parse_flashes(flash.value()) {
                ctx = ctx.with_flash(flash);
            }
        }

        Ok(PageContext(ctx))
    }
}

/// URL-encoded `kind:message` entries separated by `|`. An entry without a
/// kind is a notice.
pub fn parse_flashes(raw: &str) -> Vec<Flash> {
    let decoded = match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => return Vec::new(),
    };

    decoded
        .split('|')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((kind, message)) => Flash::new(kind.trim(), message.trim()),
            None => Flash::new("notice", entry),
        })
        .collect()
}
