// Localization context behind the `t` and `tt` helpers

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::funcs::Value;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read translations {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid translations YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid translations: {0}")]
    Shape(String),
}

/// Looks up translated messages. Messages are markup.
pub trait Localizer: Send + Sync {
    fn translate(&self, locale: &str, key: &str, defaults: &[Value]) -> String;

    /// Like `translate`, filling `{name}` placeholders from `data`.
    fn translate_data(&self, locale: &str, key: &str, data: &JsonValue, defaults: &[Value])
        -> String;
}

/// Translations loaded from YAML: `locale -> key -> message`, nested maps
/// flattened into dotted keys.
#[derive(Debug, Clone, Default)]
pub struct YamlCatalog {
    default_locale: String,
    messages: HashMap<String, HashMap<String, String>>,
}

impl YamlCatalog {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            messages: HashMap::new(),
        }
    }

    pub fn from_yaml_str(yaml: &str, default_locale: impl Into<String>) -> Result<Self, CatalogError> {
        let root: YamlValue = serde_yaml::from_str(yaml)?;
        let mut catalog = Self::new(default_locale);

        let YamlValue::Mapping(locales) = root else {
            return Err(CatalogError::Shape("top level must map locales to messages".to_string()));
        };

        for (locale, tree) in locales {
            let locale = locale
                .as_str()
                .ok_or_else(|| CatalogError::Shape("locale names must be strings".to_string()))?
                .to_string();
            let mut flat = HashMap::new();
            flatten(&tree, String::new(), &mut flat)?;
            catalog.messages.insert(locale, flat);
        }

        Ok(catalog)
    }

    pub fn from_file(path: &Path, default_locale: impl Into<String>) -> Result<Self, CatalogError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml, default_locale)
    }

    pub fn insert(&mut self, locale: &str, key: &str, message: &str) {
        self.messages
            .entry(locale.to_string())
            .or_default()
            .insert(key.to_string(), message.to_string());
    }

    /// Exact locale, then its language (`pt_BR` -> `pt`), then the default.
    fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        let language = locale.split(['_', '-']).next().unwrap_or(locale);
        [locale, language, self.default_locale.as_str()]
            .into_iter()
            .find_map(|l| self.messages.get(l).and_then(|m| m.get(key)))
            .map(|s| s.as_str())
    }

    fn message(&self, locale: &str, key: &str, defaults: &[Value]) -> String {
        match self.lookup(locale, key) {
            Some(message) => message.to_string(),
            None => defaults
                .first()
                .map(|d| d.to_text())
                .unwrap_or_else(|| key.to_string()),
        }
    }
}

fn flatten(tree: &YamlValue, prefix: String, out: &mut HashMap<String, String>) -> Result<(), CatalogError> {
    match tree {
        YamlValue::Mapping(map) => {
            for (k, v) in map {
                let k = k
                    .as_str()
                    .ok_or_else(|| CatalogError::Shape(format!("non-string key under {:?}", prefix)))?;
                let key = if prefix.is_empty() {
                    k.to_string()
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten(v, key, out)?;
            }
        }
        YamlValue::String(s) => {
            out.insert(prefix, s.clone());
        }
        YamlValue::Number(n) => {
            out.insert(prefix, n.to_string());
        }
        YamlValue::Bool(b) => {
            out.insert(prefix, b.to_string());
        }
        other => {
            return Err(CatalogError::Shape(format!(
                "unsupported message {:?} at {:?}",
                other, prefix
            )))
        }
    }
    Ok(())
}

impl Localizer for YamlCatalog {
    fn translate(&self, locale: &str, key: &str, defaults: &[Value]) -> String {
        self.message(locale, key, defaults)
    }

    fn translate_data(&self, locale: &str, key: &str, data: &JsonValue, defaults: &[Value]) -> String {
        interpolate(&self.message(locale, key, defaults), data)
    }
}

// Replace `{path}` with the escaped text at `path` in `data`. Unknown
// placeholders are left as written.
fn interpolate(message: &str, data: &JsonValue) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let path = after[..end].trim();
                match lookup_path(data, path) {
                    Some(v) => out.push_str(&html_escape::encode_quoted_attribute(&Value::Data(v.clone()).to_text())),
                    None => out.push_str(&rest[start..start + end + 2]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn lookup_path<'a>(data: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(data, |node, segment| match node {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CATALOG: &str = r#"
en:
  greeting: "Hello"
  home:
    title: "Welcome, {user.name}!"
pt:
  greeting: "Olá"
"#;

    #[test]
    fn test_locale_fallback_chain() {
        let catalog = YamlCatalog::from_yaml_str(CATALOG, "en").unwrap();
        assert_eq!(catalog.translate("pt_BR", "greeting", &[]), "Olá");
        assert_eq!(catalog.translate("de", "greeting", &[]), "Hello");
        assert_eq!(catalog.translate("pt", "home.title", &[]), "Welcome, {user.name}!");
    }

    #[test]
    fn test_missing_key_uses_default_then_key() {
        let catalog = YamlCatalog::from_yaml_str(CATALOG, "en").unwrap();
        assert_eq!(catalog.translate("en", "nope", &["Fallback".into()]), "Fallback");
        assert_eq!(catalog.translate("en", "nope", &[]), "nope");
    }

    #[test]
    fn test_translate_data_escapes_values() {
        let catalog = YamlCatalog::from_yaml_str(CATALOG, "en").unwrap();
        let data = json!({"user": {"name": "<Ana>"}});
        assert_eq!(
            catalog.translate_data("en", "home.title", &data, &[]),
            "Welcome, &lt;Ana&gt;!"
        );
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        assert_eq!(interpolate("a {missing} b", &json!({})), "a {missing} b");
        assert_eq!(interpolate("open { only", &json!({})), "open { only");
    }

    #[test]
    fn test_rejects_non_mapping() {
        assert!(YamlCatalog::from_yaml_str("- a\n- b\n", "en").is_err());
    }
}
