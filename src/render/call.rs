// One top-level render and the nested compositions it triggers

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::warn;

use super::{FormState, Renderer};
use crate::context::RequestContext;
use crate::error::RenderError;
use crate::funcs::{Composition, FunctionValueSet, Html, Locals, Value};
use crate::template::{CompiledTemplate, Composer, Scope};

/// Deepest allowed chain of nested compositions.
pub const MAX_DEPTH: usize = 64;

/// Per-call state: the renderer to load templates from, the body template
/// that `yield` renders and the data object the call started with. A data
/// override reaches only the template it is passed to; everything nested
/// without one sees `data`.
pub(crate) struct RenderCall<'r> {
    renderer: &'r Renderer,
    body: &'r str,
    data: &'r JsonValue,
    ctx: &'r RequestContext,
}

impl<'r> RenderCall<'r> {
    pub(crate) fn new(
        renderer: &'r Renderer,
        body: &'r str,
        data: &'r JsonValue,
        ctx: &'r RequestContext,
    ) -> Self {
        Self {
            renderer,
            body,
            data,
            ctx,
        }
    }

    /// Load `name` and run it. Failures propagate unchanged.
    pub(crate) async fn require(
        &self,
        name: &str,
        data: &JsonValue,
        funcs: &FunctionValueSet,
        locals: &Locals,
        depth: usize,
    ) -> Result<Html, RenderError> {
        let template = self.renderer.load(name).await?;
        let scope = Scope {
            data,
            funcs,
            locals,
            depth,
        };
        template.execute(&scope, self).await
    }
}

#[async_trait]
impl Composer for RenderCall<'_> {
    async fn compose(
        &self,
        kind: Composition,
        args: Vec<Value>,
        scope: &Scope<'_>,
        caller: &CompiledTemplate,
    ) -> Result<Html, RenderError> {
        let fail = |message: String| RenderError::Execution {
            template: caller.name().to_string(),
            path: caller.path().to_string(),
            message,
        };

        let depth = scope.depth + 1;
        if depth > MAX_DEPTH {
            return Err(fail(format!(
                "template nesting exceeds {} levels",
                MAX_DEPTH
            )));
        }

        if kind == Composition::Yield {
            if !args.is_empty() {
                return Err(fail("yield takes no arguments".to_string()));
            }
            // The body is the page itself, not something the layout references.
            return self
                .require(self.body, self.data, scope.funcs, &Locals::new(), depth)
                .await;
        }

        let NestedArgs { name, data, locals } = NestedArgs::split(args).map_err(fail)?;
        let result = self
            .require(
                &name,
                data.as_ref().unwrap_or(self.data),
                scope.funcs,
                &locals,
                depth,
            )
            .await
            .map_err(|e| e.referenced_by(caller.name()));

        match (kind, result) {
            (Composition::Form, Ok(body)) => {
                let mut state = FormState::new(name, body.into_string());
                Ok(self.renderer.page_handlers().render_form(&mut state, self.ctx))
            }
            (Composition::Include, Err(e)) => {
                warn!(
                    template = %name,
                    caller = %caller.name(),
                    error = %e,
                    "Include failed, rendering nothing"
                );
                Ok(Html::default())
            }
            (_, result) => result,
        }
    }
}

/// `render "name" [data] [key value]...`
#[derive(Debug, PartialEq)]
struct NestedArgs {
    name: String,
    data: Option<JsonValue>,
    locals: Locals,
}

impl NestedArgs {
    fn split(args: Vec<Value>) -> Result<Self, String> {
        let mut args = args.into_iter();
        let name = match args.next() {
            Some(value) => value
                .as_str()
                .ok_or_else(|| format!("template name must be a string, got {}", value.to_text()))?
                .to_string(),
            None => return Err("missing template name".to_string()),
        };

        let mut rest: Vec<Value> = args.collect();
        // An odd count means the first value replaces the data object.
        let data = if rest.len() % 2 == 1 {
            Some(rest.remove(0).into_json())
        } else {
            None
        };

        let mut locals = Locals::new();
        let mut pairs = rest.into_iter();
        while let (Some(key), Some(value)) = (pairs.next(), pairs.next()) {
            let key = key
                .as_str()
                .ok_or_else(|| format!("local names must be strings, got {}", key.to_text()))?
                .to_string();
            locals.insert(key, value);
        }

        Ok(Self { name, data, locals })
    }
}
