// Template execution against data, locals and function values

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value as JsonValue;

use super::ast::{Command, Operand, Pipeline, TemplatePart};
use super::CompiledTemplate;
use crate::error::RenderError;
use crate::funcs::{Composition, FunctionValue, FunctionValueSet, HelperScope, Html, Locals, Value};

/// What an executing template can see.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    pub data: &'a JsonValue,
    pub funcs: &'a FunctionValueSet,
    pub locals: &'a Locals,
    /// Number of enclosing compositions.
    pub depth: usize,
}

/// Runs nested template compositions on behalf of an executing template.
#[async_trait]
pub trait Composer: Send + Sync {
    async fn compose(
        &self,
        kind: Composition,
        args: Vec<Value>,
        scope: &Scope<'_>,
        caller: &CompiledTemplate,
    ) -> Result<Html, RenderError>;
}

pub(super) async fn execute(
    template: &CompiledTemplate,
    scope: &Scope<'_>,
    composer: &dyn Composer,
) -> Result<Html, RenderError> {
    let executor = Executor {
        template,
        scope,
        composer,
    };
    let mut out = String::new();

    for part in &template.body().parts {
        match part {
            TemplatePart::Literal(s) => out.push_str(s),
            TemplatePart::Action(pipeline) => {
                let value = executor.pipeline(pipeline).await?;
                write_value(&mut out, &value);
            }
        }
    }

    Ok(Html::new(out))
}

struct Executor<'a> {
    template: &'a CompiledTemplate,
    scope: &'a Scope<'a>,
    composer: &'a dyn Composer,
}

impl<'a> Executor<'a> {
    fn pipeline<'b>(&'b self, pipeline: &'b Pipeline) -> BoxFuture<'b, Result<Value, RenderError>> {
        async move {
            let mut piped: Option<Value> = None;

            for command in &pipeline.commands {
                let value = match command {
                    Command::Operand(op) => {
                        if piped.is_some() {
                            return Err(self.fail("can't pipe into a value that is not a function"));
                        }
                        self.operand(op).await?
                    }
                    Command::Call { name, args } => {
                        let mut values = Vec::with_capacity(args.len() + 1);
                        for arg in args {
                            values.push(self.operand(arg).await?);
                        }
                        values.extend(piped.take());
                        self.call(name, values).await?
                    }
                };
                piped = Some(value);
            }

            Ok(piped.unwrap_or_else(Value::null))
        }
        .boxed()
    }

    async fn operand(&self, operand: &Operand) -> Result<Value, RenderError> {
        match operand {
            Operand::Dot => Ok(Value::Data(self.scope.data.clone())),
            Operand::Field(path) => Ok(Value::Data(lookup(self.scope.data, path))),
            Operand::Local { name, path } => {
                let local = self
                    .scope
                    .locals
                    .get(name)
                    .ok_or_else(|| self.fail(format!("undefined variable ${}", name)))?;
                Ok(match local {
                    value if path.is_empty() => value.clone(),
                    Value::Data(data) => Value::Data(lookup(data, path)),
                    Value::Html(_) => Value::null(),
                })
            }
            Operand::Literal(v) => Ok(Value::Data(v.clone())),
            Operand::Ident(name) => self.call(name, Vec::new()).await,
            Operand::Sub(pipeline) => self.pipeline(pipeline).await,
        }
    }

    async fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, RenderError> {
        let func = self
            .scope
            .funcs
            .get(name)
            .ok_or_else(|| self.fail(format!("function {:?} not defined", name)))?;

        if let FunctionValue::Compose(kind) = func {
            let html = self
                .composer
                .compose(*kind, args, self.scope, self.template)
                .await?;
            return Ok(Value::Html(html));
        }

        let helper_scope = HelperScope {
            data: self.scope.data,
            funcs: self.scope.funcs,
            locals: self.scope.locals,
            template: self.template.name(),
        };
        func.call(&helper_scope, &args)
            .map_err(|e| self.fail(format!("error calling {}: {}", name, e)))
    }

    fn fail(&self, message: impl Into<String>) -> RenderError {
        RenderError::Execution {
            template: self.template.name().to_string(),
            path: self.template.path().to_string(),
            message: message.into(),
        }
    }
}

// Missing keys and out-of-range indexes are null.
fn lookup(data: &JsonValue, path: &[String]) -> JsonValue {
    path.iter()
        .try_fold(data, |node, segment| match node {
            JsonValue::Object(map) => map.get(segment),
            JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .cloned()
        .unwrap_or(JsonValue::Null)
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Html(html) => out.push_str(html.as_str()),
        Value::Data(JsonValue::Null) => {}
        Value::Data(JsonValue::String(s)) => out.push_str(&html_escape::encode_quoted_attribute(s)),
        Value::Data(other) => out.push_str(&html_escape::encode_quoted_attribute(&other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HelperError;
    use serde_json::json;

    /// Echoes the composition and its arguments instead of rendering.
    struct EchoComposer;

    #[async_trait]
    impl Composer for EchoComposer {
        async fn compose(
            &self,
            kind: Composition,
            args: Vec<Value>,
            scope: &Scope<'_>,
            caller: &CompiledTemplate,
        ) -> Result<Html, RenderError> {
            let args: Vec<String> = args.iter().map(|a| a.to_text()).collect();
            Ok(Html::new(format!(
                "<{:?} {} from {} at {}>",
                kind,
                args.join(","),
                caller.name(),
                scope.depth
            )))
        }
    }

    async fn run(source: &str, data: JsonValue, funcs: &FunctionValueSet, locals: &Locals) -> Result<String, RenderError> {
        let template = CompiledTemplate::compile("test", "memory://test.tmpl", source)?;
        let scope = Scope {
            data: &data,
            funcs,
            locals,
            depth: 0,
        };
        Ok(template.execute(&scope, &EchoComposer).await?.into_string())
    }

    fn helpers() -> FunctionValueSet {
        FunctionValueSet::new()
            .with("upper", FunctionValue::unary(|v| Ok(v.to_text().to_uppercase().into())))
            .with(
                "concat",
                FunctionValue::binary(|a, b| Ok(format!("{}{}", a.to_text(), b.to_text()).into())),
            )
            .with("bold", FunctionValue::unary(|v| {
                Ok(Html::new(format!("<b>{}</b>", html_escape::encode_quoted_attribute(&v.to_text()))).into())
            }))
            .with("site", FunctionValue::constant("layoutd"))
            .with("fail", FunctionValue::nullary(|| Err(HelperError::new("boom"))))
            .with("render", FunctionValue::Compose(Composition::Render))
            .with("yield", FunctionValue::Compose(Composition::Yield))
    }

    #[tokio::test]
    async fn test_fields_are_escaped() {
        let out = run("Hi {{.Name}}", json!({"Name": "<Ana & Bo>"}), &helpers(), &Locals::new())
            .await
            .unwrap();
        assert_eq!(out, "Hi &lt;Ana &amp; Bo&gt;");
    }

    #[tokio::test]
    async fn test_slashes_and_quotes() {
        let out = run(r#"<a href="{{.u}}">{{.t}}</a>"#, json!({"u": "/docs/intro", "t": "\"x\" 'y'"}), &helpers(), &Locals::new())
            .await
            .unwrap();
        assert_eq!(out, "<a href=\"/docs/intro\">&quot;x&quot; &#x27;y&#x27;</a>");
    }

    #[tokio::test]
    async fn test_html_values_are_raw() {
        let out = run("{{ bold .x }}", json!({"x": "<i>"}), &helpers(), &Locals::new())
            .await
            .unwrap();
        assert_eq!(out, "<b>&lt;i&gt;</b>");
    }

    #[tokio::test]
    async fn test_missing_path_is_empty() {
        let out = run("[{{.a.b.c}}][{{.list.5}}]", json!({"list": [1]}), &helpers(), &Locals::new())
            .await
            .unwrap();
        assert_eq!(out, "[][]");
    }

    #[tokio::test]
    async fn test_non_string_values_render_as_json() {
        let out = run("{{.n}} {{.ok}} {{.list.1}}", json!({"n": 3, "ok": true, "list": [1, 2]}), &helpers(), &Locals::new())
            .await
            .unwrap();
        assert_eq!(out, "3 true 2");
    }

    #[tokio::test]
    async fn test_piped_value_is_last_argument() {
        let out = run(r#"{{ .x | concat "pre-" | upper }}"#, json!({"x": "val"}), &helpers(), &Locals::new())
            .await
            .unwrap();
        assert_eq!(out, "PRE-VAL");
    }

    #[tokio::test]
    async fn test_identifiers_and_sub_pipelines() {
        let out = run(r#"{{ concat site (upper "!") }}"#, json!({}), &helpers(), &Locals::new())
            .await
            .unwrap();
        assert_eq!(out, "layoutd!");
    }

    #[tokio::test]
    async fn test_locals() {
        let mut locals = Locals::new();
        locals.insert("title".to_string(), Value::from("Home"));
        locals.insert("user".to_string(), Value::from(json!({"name": "Ana"})));

        let out = run("{{$title}}/{{$user.name}}", json!({}), &helpers(), &locals)
            .await
            .unwrap();
        assert_eq!(out, "Home/Ana");

        let err = run("{{$missing}}", json!({}), &helpers(), &locals).await.unwrap_err();
        assert!(err.to_string().contains("undefined variable $missing"));
    }

    #[tokio::test]
    async fn test_compositions_go_to_composer() {
        let out = run(r#"{{ render "nav" "k" 1 }}|{{ yield }}"#, json!({}), &helpers(), &Locals::new())
            .await
            .unwrap();
        assert_eq!(out, "<Render nav,k,1 from test at 0>|<Yield  from test at 0>");
    }

    #[tokio::test]
    async fn test_unknown_function_is_execution_error() {
        let err = run("{{ nope }}", json!({}), &helpers(), &Locals::new()).await.unwrap_err();
        assert_eq!(
            err,
            RenderError::Execution {
                template: "test".to_string(),
                path: "memory://test.tmpl".to_string(),
                message: "function \"nope\" not defined".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_helper_errors_name_the_helper() {
        let err = run("{{ upper }}", json!({}), &helpers(), &Locals::new()).await.unwrap_err();
        assert!(err.to_string().contains("error calling upper: expected 1 argument, got 0"));

        let err = run("{{ fail }}", json!({}), &helpers(), &Locals::new()).await.unwrap_err();
        assert!(err.to_string().contains("error calling fail: boom"));
    }

    #[tokio::test]
    async fn test_cannot_pipe_into_value() {
        let err = run("{{ .a | .b }}", json!({}), &helpers(), &Locals::new()).await.unwrap_err();
        assert!(matches!(err, RenderError::Execution { .. }));
    }
}
