// Renderer settings loaded from YAML

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LAYOUT: &str = "application";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid settings YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    /// Layout wrapping every page unless a render picks another; `null`
    /// disables it.
    pub default_layout: Option<String>,
    /// Log the store path of every template that gets compiled.
    pub debug_files: bool,
    pub default_locale: String,
    pub template_extension: String,
    pub layout_prefix: String,
    /// Search roots, first match wins.
    pub template_paths: Vec<PathBuf>,
    pub static_prefix: String,
    /// Directory served under `static_prefix` by the HTTP host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
    pub mount_path: String,
    /// Keep failed compilations until invalidated instead of retrying.
    pub cache_failures: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translations: Option<PathBuf>,
    /// Storage name -> base URL for `media_url`.
    pub media: HashMap<String, String>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            default_layout: Some(DEFAULT_LAYOUT.to_string()),
            debug_files: false,
            default_locale: locale_from_lang(std::env::var("LANG").ok().as_deref()),
            template_extension: ".tmpl".to_string(),
            layout_prefix: "layouts".to_string(),
            template_paths: vec![PathBuf::from("templates")],
            static_prefix: "/static".to_string(),
            static_dir: None,
            mount_path: String::new(),
            cache_failures: false,
            translations: None,
            media: HashMap::new(),
        }
    }
}

impl RenderSettings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SettingsError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, SettingsError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }
}

/// `en_US.UTF-8` -> `en_US`. Unset, empty, `C` and `POSIX` fall back to `en`.
pub fn locale_from_lang(lang: Option<&str>) -> String {
    let locale = lang
        .and_then(|l| l.split(['.', '@']).next())
        .unwrap_or_default();
    match locale {
        "" | "C" | "POSIX" => "en".to_string(),
        other => other.to_string(),
    }
}
