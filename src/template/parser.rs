// Template parser using recursive descent

use serde_json::{Number, Value as JsonValue};
use thiserror::Error;

use super::ast::{Command, Operand, Pipeline, Template, TemplatePart};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

type Result<T> = std::result::Result<T, ParseError>;

pub struct TemplateParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TemplateParser<'a> {
    pub fn parse(template: &'a str) -> Result<Template> {
        let mut parser = Self {
            input: template,
            pos: 0,
        };
        parser.parse_template()
    }

    fn parse_template(&mut self) -> Result<Template> {
        let input = self.input;
        let mut parts = Vec::new();
        let mut trim_next = false;

        while self.pos < input.len() {
            let rest = &input[self.pos..];
            let literal_len = rest.find("{{").unwrap_or(rest.len());
            let mut literal = &rest[..literal_len];
            if trim_next {
                literal = literal.trim_start();
                trim_next = false;
            }
            self.pos += literal_len;

            if self.pos >= input.len() {
                push_literal(&mut parts, literal);
                break;
            }

            // "{{- " trims whitespace before the action
            self.pos += 2;
            if self.peek_char() == Some('-') && self.peek_ahead(1).is_some_and(char::is_whitespace) {
                literal = literal.trim_end();
                self.pos += 1;
            }
            push_literal(&mut parts, literal);

            self.skip_whitespace();
            if self.rest().starts_with("/*") {
                self.skip_comment()?;
            } else {
                let pipeline = self.parse_pipeline()?;
                parts.push(TemplatePart::Action(pipeline));
            }
            trim_next = self.parse_close()?;
        }

        Ok(Template::new(parts))
    }

    fn skip_comment(&mut self) -> Result<()> {
        match self.rest()[2..].find("*/") {
            Some(end) => {
                self.pos += 2 + end + 2;
                Ok(())
            }
            None => Err(self.error("unclosed comment")),
        }
    }

    // Consumes "}}" or "-}}"; returns whether the following text is trimmed.
    fn parse_close(&mut self) -> Result<bool> {
        self.skip_whitespace();
        if self.rest().starts_with("-}}") {
            self.pos += 3;
            Ok(true)
        } else if self.rest().starts_with("}}") {
            self.pos += 2;
            Ok(false)
        } else {
            match self.peek_char() {
                Some(ch) => Err(self.error(format!("expected \"}}}}\" but found '{}'", ch))),
                None => Err(self.error("unclosed action")),
            }
        }
    }

    fn parse_pipeline(&mut self) -> Result<Pipeline> {
        let mut commands = Vec::new();

        loop {
            self.skip_whitespace();
            commands.push(self.parse_command()?);
            self.skip_whitespace();

            if self.peek_char() == Some('|') {
                self.consume_char()?;
            } else {
                break;
            }
        }

        Ok(Pipeline::new(commands))
    }

    fn parse_command(&mut self) -> Result<Command> {
        if self.peek_char().is_some_and(is_ident_start) {
            let start = self.pos;
            let name = self.parse_identifier()?;
            if let Some(literal) = keyword(&name) {
                self.expect_command_end(start)?;
                return Ok(Command::Operand(Operand::Literal(literal)));
            }
            let args = self.parse_args()?;
            return Ok(Command::Call { name, args });
        }

        let start = self.pos;
        let operand = self.parse_operand()?;
        self.expect_command_end(start)?;
        Ok(Command::Operand(operand))
    }

    fn parse_args(&mut self) -> Result<Vec<Operand>> {
        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_command_end() {
                break;
            }
            args.push(self.parse_operand()?);
        }
        Ok(args)
    }

    fn expect_command_end(&mut self, start: usize) -> Result<()> {
        self.skip_whitespace();
        if self.at_command_end() {
            Ok(())
        } else {
            let operand = self.input[start..self.pos].trim_end().to_string();
            Err(self.error(format!("can't give arguments to non-function {}", operand)))
        }
    }

    fn at_command_end(&self) -> bool {
        let rest = self.rest();
        rest.is_empty()
            || rest.starts_with('|')
            || rest.starts_with(')')
            || rest.starts_with("}}")
            || rest.starts_with("-}}")
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        match self.peek_char() {
            Some('.') => {
                self.consume_char()?;
                if self.peek_char().is_some_and(is_ident_char) {
                    let mut path = vec![self.parse_segment()?];
                    path.extend(self.parse_path()?);
                    Ok(Operand::Field(path))
                } else {
                    Ok(Operand::Dot)
                }
            }
            Some('$') => {
                self.consume_char()?;
                let name = self.parse_identifier()?;
                let path = self.parse_path()?;
                Ok(Operand::Local { name, path })
            }
            Some('"') => Ok(Operand::Literal(JsonValue::String(self.parse_string()?))),
            Some('`') => Ok(Operand::Literal(JsonValue::String(self.parse_raw_string()?))),
            Some('(') => {
                self.consume_char()?;
                let pipeline = self.parse_pipeline()?;
                self.skip_whitespace();
                self.expect_char(')')?;
                Ok(Operand::Sub(pipeline))
            }
            Some(ch) if ch.is_ascii_digit() => self.parse_number(),
            Some('-') if self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.parse_number()
            }
            Some(ch) if is_ident_start(ch) => {
                let name = self.parse_identifier()?;
                Ok(match keyword(&name) {
                    Some(literal) => Operand::Literal(literal),
                    None => Operand::Ident(name),
                })
            }
            Some(ch) => Err(self.error(format!("unexpected '{}' in operand", ch))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    // Trailing `.a.b` after a local or field.
    fn parse_path(&mut self) -> Result<Vec<String>> {
        let mut path = Vec::new();
        while self.peek_char() == Some('.') && self.peek_ahead(1).is_some_and(is_ident_char) {
            self.consume_char()?;
            path.push(self.parse_segment()?);
        }
        Ok(path)
    }

    fn parse_segment(&mut self) -> Result<String> {
        let mut segment = String::new();
        while let Some(ch) = self.peek_char() {
            if is_ident_char(ch) {
                segment.push(self.consume_char()?);
            } else {
                break;
            }
        }
        if segment.is_empty() {
            return Err(self.error("expected field name"));
        }
        Ok(segment)
    }

    fn parse_string(&mut self) -> Result<String> {
        let start = self.pos;
        self.expect_char('"')?;
        let mut value = String::new();

        loop {
            match self.peek_char() {
                Some('"') => {
                    self.consume_char()?;
                    return Ok(value);
                }
                Some('\\') => {
                    self.consume_char()?;
                    let escaped = match self.peek_char() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some(ch) => return Err(self.error(format!("unknown escape '\\{}'", ch))),
                        None => break,
                    };
                    self.consume_char()?;
                    value.push(escaped);
                }
                Some(_) => value.push(self.consume_char()?),
                None => break,
            }
        }

        self.pos = start;
        Err(self.error("unterminated string"))
    }

    fn parse_raw_string(&mut self) -> Result<String> {
        self.expect_char('`')?;
        match self.rest().find('`') {
            Some(end) => {
                let value = self.rest()[..end].to_string();
                self.pos += end + 1;
                Ok(value)
            }
            None => Err(self.error("unterminated raw string")),
        }
    }

    fn parse_number(&mut self) -> Result<Operand> {
        let start = self.pos;
        if self.peek_char() == Some('-') {
            self.consume_char()?;
        }
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() || ch == '.' {
                self.consume_char()?;
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        let number = if text.contains('.') {
            text.parse::<f64>().ok().and_then(Number::from_f64)
        } else {
            text.parse::<i64>().ok().map(Number::from)
        };

        match number {
            Some(n) => Ok(Operand::Literal(JsonValue::Number(n))),
            None => {
                self.pos = start;
                Err(self.error(format!("invalid number {}", text)))
            }
        }
    }

    fn parse_identifier(&mut self) -> Result<String> {
        let mut ident = String::new();

        while let Some(ch) = self.peek_char() {
            if is_ident_char(ch) {
                ident.push(self.consume_char()?);
            } else {
                break;
            }
        }

        if ident.is_empty() {
            return Err(self.error("expected identifier"));
        }

        Ok(ident)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    fn consume_char(&mut self) -> Result<char> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += ch.len_utf8();
        Ok(ch)
    }

    fn expect_char(&mut self, expected: char) -> Result<()> {
        match self.peek_char() {
            Some(ch) if ch == expected => {
                self.consume_char()?;
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}' but found '{}'", expected, ch))),
            None => Err(self.error(format!("expected '{}' but found end of input", expected))),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let consumed = &self.input[..self.pos];
        let line = consumed.matches('\n').count() + 1;
        let column = match consumed.rfind('\n') {
            Some(nl) => consumed[nl + 1..].chars().count() + 1,
            None => consumed.chars().count() + 1,
        };
        ParseError {
            line,
            column,
            message: message.into(),
        }
    }
}

fn push_literal(parts: &mut Vec<TemplatePart>, literal: &str) {
    if literal.is_empty() {
        return;
    }
    // Two literals end up adjacent when a comment sits between them.
    if let Some(TemplatePart::Literal(prev)) = parts.last_mut() {
        prev.push_str(literal);
    } else {
        parts.push(TemplatePart::Literal(literal.to_string()));
    }
}

fn keyword(name: &str) -> Option<JsonValue> {
    match name {
        "true" => Some(JsonValue::Bool(true)),
        "false" => Some(JsonValue::Bool(false)),
        "null" | "nil" => Some(JsonValue::Null),
        _ => None,
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn single_action(source: &str) -> Pipeline {
        let template = TemplateParser::parse(source).unwrap();
        match template.parts.as_slice() {
            [TemplatePart::Action(p)] => p.clone(),
            other => panic!("Expected a single action, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_literal_and_field() {
        let template = TemplateParser::parse("Hello {{.Name}}!").unwrap();
        assert_eq!(template.parts.len(), 3);

        match &template.parts[0] {
            TemplatePart::Literal(s) => assert_eq!(s, "Hello "),
            _ => panic!("Expected literal"),
        }
        match &template.parts[1] {
            TemplatePart::Action(p) => assert_eq!(
                p.commands,
                vec![Command::Operand(Operand::Field(vec!["Name".to_string()]))]
            ),
            _ => panic!("Expected action"),
        }
    }

    #[test]
    fn test_parse_dot_and_nested_path() {
        assert_eq!(
            single_action("{{ . }}").commands,
            vec![Command::Operand(Operand::Dot)]
        );
        assert_eq!(
            single_action("{{ .user.tags.0 }}").commands,
            vec![Command::Operand(Operand::Field(vec![
                "user".to_string(),
                "tags".to_string(),
                "0".to_string()
            ]))]
        );
    }

    #[test]
    fn test_parse_call_with_arguments() {
        let pipeline = single_action(r#"{{ render "partials/nav" . "title" $title }}"#);
        assert_eq!(
            pipeline.commands,
            vec![Command::Call {
                name: "render".to_string(),
                args: vec![
                    Operand::Literal(json!("partials/nav")),
                    Operand::Dot,
                    Operand::Literal(json!("title")),
                    Operand::Local {
                        name: "title".to_string(),
                        path: vec![]
                    },
                ],
            }]
        );
    }

    #[test]
    fn test_parse_pipeline_chain() {
        let pipeline = single_action("{{ .Name | upper | printf }}");
        assert_eq!(pipeline.commands.len(), 3);
        assert!(matches!(&pipeline.commands[1], Command::Call { name, args } if name == "upper" && args.is_empty()));
    }

    #[test]
    fn test_parse_sub_pipeline_and_literals() {
        let pipeline = single_action(r#"{{ join (list 1 -2 3.5) ", " true null }}"#);
        match &pipeline.commands[0] {
            Command::Call { name, args } => {
                assert_eq!(name, "join");
                assert_eq!(args.len(), 4);
                match &args[0] {
                    Operand::Sub(inner) => assert_eq!(
                        inner.commands,
                        vec![Command::Call {
                            name: "list".to_string(),
                            args: vec![
                                Operand::Literal(json!(1)),
                                Operand::Literal(json!(-2)),
                                Operand::Literal(json!(3.5)),
                            ],
                        }]
                    ),
                    _ => panic!("Expected sub pipeline"),
                }
                assert_eq!(args[2], Operand::Literal(json!(true)));
                assert_eq!(args[3], Operand::Literal(JsonValue::Null));
            }
            _ => panic!("Expected call"),
        }
    }

    #[test]
    fn test_parse_string_escapes() {
        let pipeline = single_action(r#"{{ "a \"b\"\n\\" }}"#);
        assert_eq!(
            pipeline.commands,
            vec![Command::Operand(Operand::Literal(json!("a \"b\"\n\\")))]
        );
        let raw = single_action(r"{{ `C:\dir` }}");
        assert_eq!(
            raw.commands,
            vec![Command::Operand(Operand::Literal(json!(r"C:\dir")))]
        );
    }

    #[test]
    fn test_parse_comment_merges_literals() {
        let template = TemplateParser::parse("a{{/* note }} */}}b").unwrap();
        assert_eq!(template.parts, vec![TemplatePart::Literal("ab".to_string())]);
    }

    #[test]
    fn test_parse_trim_markers() {
        let template = TemplateParser::parse("<ul>\n  {{- .x -}}\n</ul>").unwrap();
        assert_eq!(template.parts.len(), 3);
        assert_eq!(template.parts[0], TemplatePart::Literal("<ul>".to_string()));
        assert_eq!(template.parts[2], TemplatePart::Literal("</ul>".to_string()));
    }

    #[test]
    fn test_parse_calls_lists_function_names() {
        let template = TemplateParser::parse(r#"{{ t "a" }} {{ .x | upper }} {{ f (g 1) h }}"#).unwrap();
        assert_eq!(template.calls(), vec!["t", "upper", "f", "g", "h"]);
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = TemplateParser::parse("line one\n  {{ .Name ").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("unclosed action"));

        let err = TemplateParser::parse("{{ \"open }}").unwrap_err();
        assert_eq!((err.line, err.column), (1, 4));
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_parse_rejects_arguments_to_operand() {
        let err = TemplateParser::parse("{{ .Name 1 }}").unwrap_err();
        assert!(err.message.contains("non-function .Name"));
    }

    #[test]
    fn test_parse_rejects_empty_action_and_bad_close() {
        assert!(TemplateParser::parse("{{ }}").is_err());
        assert!(TemplateParser::parse("{{ .a ) }}").is_err());
        assert!(TemplateParser::parse("{{/* never closed").is_err());
    }
}
