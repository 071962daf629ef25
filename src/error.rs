// Error handling for layoutd

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::fmt;
use thiserror::Error;

/// Failure of a render call chain.
///
/// Cloneable so one failed compilation can be reported to every caller that
/// was waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("failed to find template {name:?}{}", referenced_from(.referrer))]
    TemplateNotFound {
        name: String,
        referrer: Option<String>,
    },

    #[error("failed to read template {name:?}: {message}")]
    AssetRead { name: String, message: String },

    #[error("failed to parse template {name:?} ({path}): {message}")]
    Compile {
        name: String,
        path: String,
        message: String,
    },

    #[error("func map maker `{maker}` failed while building helpers: {message}")]
    Maker { maker: String, message: String },

    #[error("failed to execute template {template:?} ({path}): {message}")]
    Execution {
        template: String,
        path: String,
        message: String,
    },

    #[error("layout {layout:?} not found")]
    LayoutNotFound { layout: String },

    #[error("data for template {template:?} is not serializable: {message}")]
    InvalidData { template: String, message: String },
}

fn referenced_from(referrer: &Option<String>) -> String {
    match referrer {
        Some(r) => format!(" (referenced from {:?})", r),
        None => String::new(),
    }
}

impl RenderError {
    /// True when `name` itself is the template that could not be found.
    pub fn is_missing(&self, name: &str) -> bool {
        matches!(self, RenderError::TemplateNotFound { name: n, .. } if n == name)
    }

    /// Record which template asked for a missing one, keeping the first
    /// (innermost) referrer.
    pub fn referenced_by(self, template: &str) -> Self {
        match self {
            RenderError::TemplateNotFound { name, referrer: None } => {
                RenderError::TemplateNotFound {
                    name,
                    referrer: Some(template.to_string()),
                }
            }
            other => other,
        }
    }
}

/// Failure returned by a helper function value.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct HelperError(pub String);

impl HelperError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure returned by a func map maker.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct MakerError(pub String);

impl MakerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Application error type for the HTTP host
#[derive(Debug)]
pub enum AppError {
    TemplateRender(String),
    NotFound(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::TemplateRender(msg) => write!(f, "Template rendering error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Implement IntoResponse so Axum can convert errors to HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::TemplateRender(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Template error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, format!("Not found: {}", msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {}", msg),
            ),
        };

        let error_html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Error - layoutd</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            max-width: 600px;
            margin: 100px auto;
            text-align: center;
        }}
        h1 {{ color: #d32f2f; }}
        p {{ color: #666; }}
    </style>
</head>
<body>
    <h1>{}</h1>
    <p>{}</p>
    <p><a href="/">Return to home</a></p>
</body>
</html>"#,
            status.as_str(),
            html_escape::encode_text(&message)
        );

        (status, Html(error_html)).into_response()
    }
}

// A page that does not exist is a 404; anything that goes wrong further down
// the chain is a server-side template problem.
impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::TemplateNotFound {
                ref name,
                referrer: None,
            } => AppError::NotFound(name.clone()),
            other => AppError::TemplateRender(other.to_string()),
        }
    }
}
