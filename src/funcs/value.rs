// Values and helper shapes bound into templates

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::set::FunctionValueSet;
use crate::error::HelperError;

/// Markup that is emitted as-is, never escaped again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Html(String);

impl Html {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Html {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything a template expression can produce or pass to a helper.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Data(JsonValue),
    Html(Html),
}

impl Value {
    pub fn null() -> Self {
        Value::Data(JsonValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Data(JsonValue::String(s)) => Some(s),
            Value::Html(h) => Some(h.as_str()),
            _ => None,
        }
    }

    /// Plain text form: strings as-is, null as empty, everything else as JSON.
    pub fn to_text(&self) -> String {
        match self {
            Value::Data(JsonValue::String(s)) => s.clone(),
            Value::Data(JsonValue::Null) => String::new(),
            Value::Data(other) => other.to_string(),
            Value::Html(h) => h.as_str().to_string(),
        }
    }

    pub fn into_json(self) -> JsonValue {
        match self {
            Value::Data(v) => v,
            Value::Html(h) => JsonValue::String(h.into_string()),
        }
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Value::Data(v) => Some(v),
            Value::Html(_) => None,
        }
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        Value::Data(v)
    }
}

impl From<Html> for Value {
    fn from(h: Html) -> Self {
        Value::Html(h)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Data(JsonValue::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Data(JsonValue::String(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Data(JsonValue::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Data(JsonValue::from(n))
    }
}

/// Named variables passed to a nested render, visible as `$name` there only.
pub type Locals = HashMap<String, Value>;

pub type HelperResult = Result<Value, HelperError>;

type NullaryFn = dyn Fn() -> HelperResult + Send + Sync;
type UnaryFn = dyn Fn(&Value) -> HelperResult + Send + Sync;
type BinaryFn = dyn Fn(&Value, &Value) -> HelperResult + Send + Sync;
type VariadicFn = dyn Fn(&[Value]) -> HelperResult + Send + Sync;
type ContextualFn = dyn Fn(&HelperScope<'_>, &[Value]) -> HelperResult + Send + Sync;

/// Nested template invocations, dispatched back into the render engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    Render,
    Require,
    Include,
    Yield,
    /// Render a template, then pass its output through the form hooks.
    Form,
}

/// What the executing template exposes to a contextual helper.
pub struct HelperScope<'a> {
    pub data: &'a JsonValue,
    pub funcs: &'a FunctionValueSet,
    pub locals: &'a Locals,
    pub template: &'a str,
}

impl HelperScope<'_> {
    /// Evaluate another binding with no arguments, if it can be.
    pub fn resolve(&self, name: &str) -> Option<HelperResult> {
        match self.funcs.get(name)? {
            FunctionValue::Const(v) => Some(Ok(v.clone())),
            FunctionValue::Nullary(f) => Some(f()),
            FunctionValue::Variadic(f) => Some(f(&[])),
            FunctionValue::Contextual(f) => Some(f(self, &[])),
            _ => None,
        }
    }
}

/// A helper binding: a constant or one of the supported callable shapes.
#[derive(Clone)]
pub enum FunctionValue {
    Const(Value),
    Nullary(Arc<NullaryFn>),
    Unary(Arc<UnaryFn>),
    Binary(Arc<BinaryFn>),
    Variadic(Arc<VariadicFn>),
    Contextual(Arc<ContextualFn>),
    Compose(Composition),
}

impl FunctionValue {
    pub fn constant(value: impl Into<Value>) -> Self {
        FunctionValue::Const(value.into())
    }

    pub fn nullary<F>(f: F) -> Self
    where
        F: Fn() -> HelperResult + Send + Sync + 'static,
    {
        FunctionValue::Nullary(Arc::new(f))
    }

    pub fn unary<F>(f: F) -> Self
    where
        F: Fn(&Value) -> HelperResult + Send + Sync + 'static,
    {
        FunctionValue::Unary(Arc::new(f))
    }

    pub fn binary<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value) -> HelperResult + Send + Sync + 'static,
    {
        FunctionValue::Binary(Arc::new(f))
    }

    pub fn variadic<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> HelperResult + Send + Sync + 'static,
    {
        FunctionValue::Variadic(Arc::new(f))
    }

    pub fn contextual<F>(f: F) -> Self
    where
        F: Fn(&HelperScope<'_>, &[Value]) -> HelperResult + Send + Sync + 'static,
    {
        FunctionValue::Contextual(Arc::new(f))
    }

    fn shape(&self) -> &'static str {
        match self {
            FunctionValue::Const(_) | FunctionValue::Nullary(_) => "0 arguments",
            FunctionValue::Unary(_) => "1 argument",
            FunctionValue::Binary(_) => "2 arguments",
            FunctionValue::Variadic(_) | FunctionValue::Contextual(_) => "any arguments",
            FunctionValue::Compose(_) => "template",
        }
    }

    /// Capability-checked call: the argument count must fit the shape.
    pub fn call(&self, scope: &HelperScope<'_>, args: &[Value]) -> HelperResult {
        match (self, args) {
            (FunctionValue::Const(v), []) => Ok(v.clone()),
            (FunctionValue::Nullary(f), []) => f(),
            (FunctionValue::Unary(f), [a]) => f(a),
            (FunctionValue::Binary(f), [a, b]) => f(a, b),
            (FunctionValue::Variadic(f), args) => f(args),
            (FunctionValue::Contextual(f), args) => f(scope, args),
            (FunctionValue::Compose(_), _) => Err(HelperError::new(
                "template compositions are dispatched by the render engine",
            )),
            (other, args) => Err(HelperError::new(format!(
                "expected {}, got {}",
                other.shape(),
                args.len()
            ))),
        }
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::Const(v) => f.debug_tuple("Const").field(v).finish(),
            FunctionValue::Compose(c) => f.debug_tuple("Compose").field(c).finish(),
            other => write!(f, "FunctionValue({})", other.shape()),
        }
    }
}
