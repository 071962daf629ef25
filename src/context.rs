// Per-request state consumed by func map makers

use serde::Serialize;
use std::collections::HashMap;

use crate::render::{FormHook, PageHook};

/// A one-shot message carried from a previous request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flash {
    pub kind: String,
    pub message: String,
}

impl Flash {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// What a render call knows about the request it serves: locale, cookies,
/// flashes, validation errors, and how to build URLs for this mount point.
#[derive(Clone, Default)]
pub struct RequestContext {
    locale: Option<String>,
    cookies: HashMap<String, String>,
    flashes: Vec<Flash>,
    errors: Vec<String>,
    mount_path: String,
    static_prefix: String,
    media: HashMap<String, String>,
    forms: Vec<FormHook>,
    scripts: Vec<PageHook>,
    styles: Vec<PageHook>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flashes.push(flash);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_mount_path(mut self, mount_path: impl Into<String>) -> Self {
        self.mount_path = mount_path.into();
        self
    }

    pub fn with_static_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.static_prefix = prefix.into();
        self
    }

    pub fn with_media(mut self, storage: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.media.insert(storage.into(), base_url.into());
        self
    }

    pub fn with_form_handler(mut self, hook: FormHook) -> Self {
        self.forms.push(hook);
        self
    }

    pub fn with_script_handler(mut self, hook: PageHook) -> Self {
        self.scripts.push(hook);
        self
    }

    pub fn with_style_handler(mut self, hook: PageHook) -> Self {
        self.styles.push(hook);
        self
    }

    /// Locale chosen for this request, if the host picked one.
    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|s| s.as_str())
    }

    pub fn flashes(&self) -> &[Flash] {
        &self.flashes
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn form_handlers(&self) -> &[FormHook] {
        &self.forms
    }

    pub fn script_handlers(&self) -> &[PageHook] {
        &self.scripts
    }

    pub fn style_handlers(&self) -> &[PageHook] {
        &self.styles
    }

    /// Application path under the mount point, e.g. `path(["users", "7"])`.
    pub fn path<I, S>(&self, segments: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        join_url(&self.mount_path, segments)
    }

    /// URL of a static asset under the static prefix.
    pub fn static_url<I, S>(&self, segments: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        join_url(&self.static_prefix, segments)
    }

    /// URL of a stored media file. Unknown storages are served from
    /// `<mount>/media/<storage>`.
    pub fn media_url(&self, storage: &str, path: &str) -> String {
        match self.media.get(storage) {
            Some(base) => join_url(base, [path]),
            None => self.path(["media", storage, path]),
        }
    }
}

fn join_url<I, S>(base: &str, segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.as_ref().trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        url.push('/');
        url.push_str(segment);
    }
    if url.is_empty() {
        url.push('/');
    }
    url
}
