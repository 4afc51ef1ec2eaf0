use crate::api::DEFAULT_BASE_URL;
use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use crate::core::reasoning::ReasoningPolicy;
use crate::utils::url::validate_base_url;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const SUPPORTED_LANGUAGES: [&str; 9] = ["en", "es", "pl", "fr", "de", "it", "zh", "ja", "tr"];

/// Keys accepted by `set` and `unset`.
pub const CONFIG_KEYS: [&str; 5] = [
    "base-url",
    "default-model",
    "language",
    "system-prompt",
    "reasoning-heuristic",
];

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(invalid(key, format!("expected on or off, got {other:?}"))),
    }
}

impl Config {
    pub fn base_url_or_default(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn language_or_default(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn reasoning_policy(&self) -> ReasoningPolicy {
        ReasoningPolicy::from_heuristic_flag(self.reasoning_heuristic.unwrap_or(false))
    }

    pub fn set_base_url(&mut self, url: &str) -> Result<(), ConfigError> {
        let normalized = validate_base_url(url).ok_or_else(|| {
            invalid("base-url", format!("expected an http:// or https:// URL, got {url:?}"))
        })?;
        self.base_url = Some(normalized);
        Ok(())
    }

    /// Accepts a supported code, or a locale such as `pl-PL` reduced to its language.
    pub fn set_language(&mut self, language: &str) -> Result<(), ConfigError> {
        let code = language
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !SUPPORTED_LANGUAGES.contains(&code.as_str()) {
            return Err(invalid(
                "language",
                format!("expected one of {}", SUPPORTED_LANGUAGES.join(", ")),
            ));
        }
        self.language = Some(code);
        Ok(())
    }

    pub fn set_default_model(&mut self, model: &str) {
        let model = model.trim();
        self.default_model = (!model.is_empty()).then(|| model.to_string());
    }

    /// Set a value by its command-line key.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "base-url" => self.set_base_url(value),
            "default-model" => {
                self.set_default_model(value);
                Ok(())
            }
            "language" => self.set_language(value),
            "system-prompt" => {
                let prompt = value.trim();
                self.system_prompt = (!prompt.is_empty()).then(|| prompt.to_string());
                Ok(())
            }
            "reasoning-heuristic" => {
                self.reasoning_heuristic = Some(parse_bool(key, value)?);
                Ok(())
            }
            other => Err(ConfigError::UnknownKey(other.to_string())),
        }
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "base-url" => self.base_url = None,
            "default-model" => self.default_model = None,
            "language" => self.language = None,
            "system-prompt" => self.system_prompt = None,
            "reasoning-heuristic" => self.reasoning_heuristic = None,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}
