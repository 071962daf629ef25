// Page template language: parsing and execution

mod ast;
mod executor;
mod parser;

pub use ast::{Command, Operand, Pipeline, Template, TemplatePart};
pub use executor::{Composer, Scope};
pub use parser::{ParseError, TemplateParser};

use crate::error::RenderError;
use crate::funcs::Html;

/// A parsed template ready to run any number of times, concurrently, against
/// different data and function values.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    name: String,
    path: String,
    body: Template,
}

impl CompiledTemplate {
    pub fn compile(
        name: impl Into<String>,
        path: impl Into<String>,
        source: &str,
    ) -> Result<Self, RenderError> {
        let name = name.into();
        let path = path.into();
        match TemplateParser::parse(source) {
            Ok(body) => Ok(Self { name, path, body }),
            Err(e) => Err(RenderError::Compile {
                name,
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Logical name, e.g. `layouts/application`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the source was found, for diagnostics.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &Template {
        &self.body
    }

    pub async fn execute(
        &self,
        scope: &Scope<'_>,
        composer: &dyn Composer,
    ) -> Result<Html, RenderError> {
        executor::execute(self, scope, composer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_carries_path() {
        let err = CompiledTemplate::compile("home", "views/home.tmpl", "{{ .Name ").unwrap_err();
        match err {
            RenderError::Compile { name, path, message } => {
                assert_eq!(name, "home");
                assert_eq!(path, "views/home.tmpl");
                assert!(message.contains("line 1"));
            }
            other => panic!("Expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_keeps_identity() {
        let t = CompiledTemplate::compile("home", "memory://home.tmpl", "Hi").unwrap();
        assert_eq!(t.name(), "home");
        assert_eq!(t.path(), "memory://home.tmpl");
        assert_eq!(t.body().parts.len(), 1);
    }
}
