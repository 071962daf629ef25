// Abstract Syntax Tree types for page templates

use serde_json::Value as JsonValue;

/// A parsed template: literal text interleaved with `{{ ... }}` actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub parts: Vec<TemplatePart>,
}

impl Template {
    pub fn new(parts: Vec<TemplatePart>) -> Self {
        Self { parts }
    }

    /// Names of every function value the template calls, in source order.
    pub fn calls(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for part in &self.parts {
            if let TemplatePart::Action(pipeline) = part {
                pipeline.collect_calls(&mut names);
            }
        }
        names
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Action(Pipeline),
}

/// Commands chained with `|`. Each result is passed as the last argument
/// of the next command.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

impl Pipeline {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    fn collect_calls<'a>(&'a self, names: &mut Vec<&'a str>) {
        for command in &self.commands {
            match command {
                Command::Call { name, args } => {
                    names.push(name);
                    for arg in args {
                        arg.collect_calls(names);
                    }
                }
                Command::Operand(op) => op.collect_calls(names),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A value on its own: `.Name`, `"text"`, `(sub pipeline)`.
    Operand(Operand),
    /// A function value applied to arguments: `t "home.title"`.
    Call { name: String, args: Vec<Operand> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `.`
    Dot,
    /// `.User.Name`
    Field(Vec<String>),
    /// `$title` or `$user.Name`
    Local { name: String, path: Vec<String> },
    Literal(JsonValue),
    /// A function value used as an argument, called with no arguments.
    Ident(String),
    Sub(Pipeline),
}

impl Operand {
    fn collect_calls<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Operand::Ident(name) => names.push(name),
            Operand::Sub(pipeline) => pipeline.collect_calls(names),
            _ => {}
        }
    }
}
