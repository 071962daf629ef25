pub mod settings;

pub use settings::{locale_from_lang, RenderSettings, SettingsError, DEFAULT_LAYOUT};
