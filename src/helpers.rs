// Built-in helpers: the renderer's persistent bindings and the
// `request_context` func map maker

use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::{HelperError, MakerError};
use crate::funcs::{
    Composition, FuncMapMaker, FunctionValue, FunctionValueSet, HelperResult, HelperScope, Html, Value,
};
use crate::i18n::Localizer;
use crate::render::{HookKind, PageHandlers};
use crate::security::HtmlSanitizer;

/// Produces opaque unique ids for the `genid` helper.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

fn texts(args: &[Value]) -> Vec<String> {
    args.iter().map(Value::to_text).collect()
}

// `local_url` and friends read `prefix` when called, so an override from a
// later layer is honored.
fn with_prefix(scope: &HelperScope<'_>, args: &[Value]) -> Result<Vec<String>, HelperError> {
    let prefix = match scope.resolve("prefix") {
        Some(result) => result?.to_text(),
        None => String::new(),
    };
    let mut segments = Vec::with_capacity(args.len() + 1);
    if !prefix.is_empty() {
        segments.push(prefix);
    }
    segments.extend(texts(args));
    Ok(segments)
}

/// `index x 1 "name"`: walk arrays and objects; anything missing is null.
fn index(args: &[Value]) -> HelperResult {
    let (target, keys) = args
        .split_first()
        .ok_or_else(|| HelperError::new("expected a value to index"))?;

    let mut current = target.clone().into_json();
    for key in keys {
        current = match current {
            JsonValue::Array(mut items) => key
                .as_json()
                .and_then(JsonValue::as_u64)
                .and_then(|i| usize::try_from(i).ok())
                .filter(|&i| i < items.len())
                .map(|i| items.swap_remove(i))
                .unwrap_or(JsonValue::Null),
            JsonValue::Object(mut map) => key
                .as_str()
                .and_then(|k| map.remove(k))
                .unwrap_or(JsonValue::Null),
            _ => JsonValue::Null,
        };
    }
    Ok(current.into())
}

fn len(value: &Value) -> HelperResult {
    let n = match value {
        Value::Html(html) => html.as_str().chars().count(),
        Value::Data(JsonValue::String(s)) => s.chars().count(),
        Value::Data(JsonValue::Array(items)) => items.len(),
        Value::Data(JsonValue::Object(map)) => map.len(),
        Value::Data(JsonValue::Null) => 0,
        Value::Data(other) => {
            return Err(HelperError::new(format!("len of {} is undefined", other)))
        }
    };
    Ok(JsonValue::from(n).into())
}

/// Bindings every render gets before registered functions and makers:
/// `raw`, `genid`, `locale`, `prefix`, the URL builders, `index` and `len`.
pub fn builtin_funcs(
    ctx: &RequestContext,
    sanitizer: Arc<dyn HtmlSanitizer>,
    ids: Arc<dyn IdGenerator>,
    default_locale: &str,
) -> FunctionValueSet {
    let ctx = Arc::new(ctx.clone());
    let locale = ctx.locale().unwrap_or(default_locale).to_string();

    let mut funcs = FunctionValueSet::new();

    funcs.set(
        "raw",
        FunctionValue::unary(move |v| Ok(Html::new(sanitizer.sanitize(&v.to_text())).into())),
    );
    funcs.set("genid", FunctionValue::nullary(move || Ok(ids.new_id().into())));
    funcs.set("locale", FunctionValue::constant(locale));
    funcs.set("prefix", FunctionValue::constant(""));
    funcs.set("index", FunctionValue::variadic(index));
    funcs.set("len", FunctionValue::unary(len));

    let c = ctx.clone();
    funcs.set("url", FunctionValue::variadic(move |args| Ok(c.path(texts(args)).into())));

    let c = ctx.clone();
    funcs.set(
        "static_url",
        FunctionValue::variadic(move |args| Ok(c.static_url(texts(args)).into())),
    );

    let c = ctx.clone();
    funcs.set(
        "local_url",
        FunctionValue::contextual(move |scope, args| Ok(c.path(with_prefix(scope, args)?).into())),
    );

    let c = ctx.clone();
    funcs.set(
        "local_static_url",
        FunctionValue::contextual(move |scope, args| {
            Ok(c.static_url(with_prefix(scope, args)?).into())
        }),
    );

    let c = ctx;
    funcs.set(
        "media_url",
        FunctionValue::variadic(move |args| match args {
            [path] => Ok(c.media_url("default", &path.to_text()).into()),
            [path, storage] => Ok(c.media_url(&storage.to_text(), &path.to_text()).into()),
            _ => Err(HelperError::new(format!(
                "expected a path and an optional storage name, got {} arguments",
                args.len()
            ))),
        }),
    );

    funcs
}

/// The first maker of every renderer. Request-derived values are only
/// defaults so a renderer function can replace them; `t` and `tt` always bind.
pub struct RequestContextMaker {
    default_locale: String,
    localizer: Arc<dyn Localizer>,
    page: Arc<PageHandlers>,
}

impl RequestContextMaker {
    pub const NAME: &'static str = "request_context";

    pub fn new(
        default_locale: impl Into<String>,
        localizer: Arc<dyn Localizer>,
        page: Arc<PageHandlers>,
    ) -> Self {
        Self {
            default_locale: default_locale.into(),
            localizer,
            page,
        }
    }
}

impl FuncMapMaker for RequestContextMaker {
    fn make(&self, funcs: &mut FunctionValueSet, ctx: &RequestContext) -> Result<(), MakerError> {
        let current_locale = ctx
            .cookie("locale")
            .unwrap_or(self.default_locale.as_str())
            .to_string();
        let flashes = serde_json::to_value(ctx.flashes())
            .map_err(|e| MakerError::new(format!("flashes: {}", e)))?;
        let errors = JsonValue::from(ctx.errors().to_vec());

        funcs.set_default("current_locale", FunctionValue::constant(current_locale.clone()));
        funcs.set_default("flashes", FunctionValue::constant(flashes));
        funcs.set_default("errors", FunctionValue::constant(errors));
        funcs.set_default("form", FunctionValue::Compose(Composition::Form));

        let ctx = Arc::new(ctx.clone());
        for (binding, kind) in [("render_scripts", HookKind::Script), ("render_styles", HookKind::Style)] {
            let page = self.page.clone();
            let ctx = ctx.clone();
            funcs.set_default(
                binding,
                FunctionValue::nullary(move || Ok(page.render(kind, &ctx).into())),
            );
        }

        // Messages are markup.
        let locale = ctx.locale().map(str::to_string).unwrap_or(current_locale);

        let localizer = self.localizer.clone();
        let t_locale = locale.clone();
        funcs.set(
            "t",
            FunctionValue::variadic(move |args| match args {
                [key, defaults @ ..] => {
                    let message = localizer.translate(&t_locale, &key.to_text(), defaults);
                    Ok(Html::new(message).into())
                }
                [] => Err(HelperError::new("expected a translation key")),
            }),
        );

        let localizer = self.localizer.clone();
        funcs.set(
            "tt",
            FunctionValue::variadic(move |args| match args {
                [key, data, defaults @ ..] => {
                    let data = data.clone().into_json();
                    let message = localizer.translate_data(&locale, &key.to_text(), &data, defaults);
                    Ok(Html::new(message).into())
                }
                _ => Err(HelperError::new("expected a translation key and data")),
            }),
        );

        Ok(())
    }
}
