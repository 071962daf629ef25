// Per-call render options: layout choice and call-site function values

use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::Response,
};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::call::RenderCall;
use super::Renderer;
use crate::context::RequestContext;
use crate::error::RenderError;
use crate::funcs::{FunctionValueSet, Html, Locals};

#[derive(Debug, Clone, PartialEq)]
enum LayoutChoice {
    /// The renderer's configured default, skipped when missing.
    Default,
    /// Must exist.
    Explicit(String),
    None,
}

/// A configured render of one or more templates. Obtained from
/// [`Renderer::template`] or [`Renderer::layout`].
#[derive(Clone)]
pub struct TemplateRender<'r> {
    renderer: &'r Renderer,
    layout: LayoutChoice,
    funcs: FunctionValueSet,
}

impl<'r> TemplateRender<'r> {
    pub(crate) fn with_default_layout(renderer: &'r Renderer) -> Self {
        Self {
            renderer,
            layout: LayoutChoice::Default,
            funcs: FunctionValueSet::new(),
        }
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = LayoutChoice::Explicit(layout.into());
        self
    }

    pub fn without_layout(mut self) -> Self {
        self.layout = LayoutChoice::None;
        self
    }

    /// Bindings that win over everything except the composition helpers.
    pub fn with_funcs(mut self, funcs: FunctionValueSet) -> Self {
        self.funcs.append_values(&funcs);
        self
    }

    pub async fn execute<T>(
        &self,
        name: &str,
        data: &T,
        ctx: &RequestContext,
    ) -> Result<Html, RenderError>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(data).map_err(|e| RenderError::InvalidData {
            template: name.to_string(),
            message: e.to_string(),
        })?;
        self.execute_value(name, &data, ctx).await
    }

    pub async fn execute_value(
        &self,
        name: &str,
        data: &JsonValue,
        ctx: &RequestContext,
    ) -> Result<Html, RenderError> {
        let funcs = self.renderer.build_funcs(ctx, &self.funcs)?;
        let call = RenderCall::new(self.renderer, name, data, ctx);
        let locals = Locals::new();

        let layout = match &self.layout {
            LayoutChoice::Default => self
                .renderer
                .settings()
                .default_layout
                .as_deref()
                .map(|layout| (layout, true)),
            LayoutChoice::Explicit(layout) => Some((layout.as_str(), false)),
            LayoutChoice::None => None,
        };

        if let Some((layout, is_default)) = layout {
            let layout_name = self.renderer.layout_name(layout);
            match call.require(&layout_name, data, &funcs, &locals, 0).await {
                Ok(html) => return Ok(html),
                Err(e) if e.is_missing(&layout_name) => {
                    if !is_default {
                        return Err(RenderError::LayoutNotFound {
                            layout: layout_name,
                        });
                    }
                    debug!(
                        layout = %layout_name,
                        template = %name,
                        "Default layout not found, rendering without layout"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        call.require(name, data, &funcs, &locals, 0).await
    }

    /// Render into `response`: the body is replaced only on success, and a
    /// Content-Type is set only when the response has none yet.
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
        let html = self.execute(name, data, ctx).await?;

        response
            .headers_mut()
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static("text/html; charset=utf-8"));
        *response.body_mut() = Body::from(html.into_string());
        Ok(())
    }
}
