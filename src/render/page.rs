// Page hooks: script and style markup for `render_scripts` / `render_styles`,
// and form hooks that rewrite the output of `form`

use std::fmt;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::HelperError;
use crate::funcs::Html;

type HookFn = dyn Fn(&RequestContext, &mut String) -> Result<(), HelperError> + Send + Sync;
type FormFn = dyn Fn(&mut FormState, &RequestContext) -> Result<(), HelperError> + Send + Sync;

/// A named handler that writes markup into the page head or footer.
#[derive(Clone)]
pub struct PageHook {
    name: String,
    handler: Arc<HookFn>,
}

impl PageHook {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&RequestContext, &mut String) -> Result<(), HelperError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    /// A hook that always writes the same markup.
    pub fn markup(name: impl Into<String>, markup: impl Into<String>) -> Self {
        let markup = markup.into();
        Self::new(name, move |_, out: &mut String| {
            out.push_str(&markup);
            Ok(())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for PageHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageHook").field("name", &self.name).finish()
    }
}

/// A rendered form on its way to the page. Hooks may rewrite `body`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub name: String,
    pub body: String,
}

impl FormState {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// A named handler run over every form rendered with `form`.
#[derive(Clone)]
pub struct FormHook {
    name: String,
    handler: Arc<FormFn>,
}

impl FormHook {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut FormState, &RequestContext) -> Result<(), HelperError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for FormHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormHook").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Script,
    Style,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Script => f.write_str("script"),
            HookKind::Style => f.write_str("style"),
        }
    }
}

/// Renderer-wide hooks. Request hooks from the RequestContext run after these.
#[derive(Debug, Clone, Default)]
pub struct PageHandlers {
    forms: Vec<FormHook>,
    scripts: Vec<PageHook>,
    styles: Vec<PageHook>,
}

impl PageHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: HookKind, hook: PageHook) {
        match kind {
            HookKind::Script => self.scripts.push(hook),
            HookKind::Style => self.styles.push(hook),
        }
    }

    pub fn add_form(&mut self, hook: FormHook) {
        self.forms.push(hook);
    }

    /// Run renderer form hooks, then request ones, over `state`. The first
    /// failure replaces the whole form with an inline marker.
    pub fn render_form(&self, state: &mut FormState, ctx: &RequestContext) -> Html {
        for hook in self.forms.iter().chain(ctx.form_handlers()) {
            if let Err(e) = (hook.handler)(state, ctx) {
                return Html::new(format!(
                    "[[render execute form handler `{}` for `{}` form failed: {}]]",
                    hook.name, state.name, e
                ));
            }
        }
        Html::new(state.body.clone())
    }

    pub fn render(&self, kind: HookKind, ctx: &RequestContext) -> Html {
        let lists = match kind {
            HookKind::Script => [self.scripts.as_slice(), ctx.script_handlers()],
            HookKind::Style => [self.styles.as_slice(), ctx.style_handlers()],
        };

        let mut out = String::new();
        for hooks in lists {
            // A failure ends its own list only.
            for hook in hooks {
                if let Err(e) = (hook.handler)(ctx, &mut out) {
                    out.push_str(&format!(
                        "[[render execute {} handler `{}` failed: {}]]",
                        kind, hook.name, e
                    ));
                    break;
                }
            }
        }
        Html::new(out)
    }
}
