use super::data::{path_display, Config};
use super::defaults::{CONFIG_KEYS, SUPPORTED_LANGUAGES};
use super::io::ConfigError;
use super::orchestrator::ConfigOrchestrator;
use crate::core::reasoning::ReasoningPolicy;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn config_orchestrator_detects_external_updates() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    let orchestrator = ConfigOrchestrator::new(config_path.clone());

    orchestrator
        .mutate(|config| {
            config.default_model = Some("first".to_string());
            Ok(())
        })
        .expect("mutate failed");

    let persisted = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(persisted.default_model.as_deref(), Some("first"));

    let cached = orchestrator.load_with_cache().expect("cached load failed");
    assert_eq!(cached.default_model.as_deref(), Some("first"));

    std::thread::sleep(Duration::from_millis(1100));

    let external = Config {
        default_model: Some("second".to_string()),
        ..Default::default()
    };
    external
        .save_to_path(&config_path)
        .expect("external save failed");

    let reloaded = orchestrator.load_with_cache().expect("reload failed");
    assert_eq!(reloaded.default_model.as_deref(), Some("second"));
}

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config
        .set_value("base-url", "http://gpu-box:11434/")
        .expect("base-url");
    config
        .set_value("system-prompt", "Answer briefly.")
        .expect("system-prompt");
    config.set_default_model("llama3:8b");
    config.save_to_path(&config_path).expect("Failed to save config");

    let loaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded.base_url.as_deref(), Some("http://gpu-box:11434"));
    assert_eq!(loaded.system_prompt.as_deref(), Some("Answer briefly."));
    assert_eq!(loaded.default_model.as_deref(), Some("llama3:8b"));

    let mut loaded = loaded;
    loaded.unset_value("base-url").expect("unset");
    loaded.save_to_path(&config_path).expect("Failed to save config");
    let reloaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(reloaded.base_url, None);
    assert_eq!(reloaded.base_url_or_default(), "http://localhost:11434");
}

#[test]
fn test_invalid_toml_reports_path() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "base_url = [").expect("write");

    let err = Config::load_from_path(&config_path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn test_set_value_validation() {
    let mut config = Config::default();

    assert!(matches!(
        config.set_value("base-url", "localhost:11434"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        config.set_value("theme", "dark"),
        Err(ConfigError::UnknownKey(_))
    ));
    assert!(config.set_value("language", "xx").is_err());
    assert_eq!(config, Config::default());
}

#[test]
fn test_language_accepts_locales() {
    let mut config = Config::default();
    assert_eq!(config.language_or_default(), "en");

    config.set_language("pl-PL").expect("pl-PL");
    assert_eq!(config.language.as_deref(), Some("pl"));

    for code in SUPPORTED_LANGUAGES {
        config.set_language(code).expect("supported language");
    }
}

#[test]
fn test_reasoning_heuristic_toggle() {
    let mut config = Config::default();
    assert_eq!(config.reasoning_policy(), ReasoningPolicy::MarkersOnly);

    config
        .set_value("reasoning-heuristic", "on")
        .expect("toggle on");
    assert_eq!(config.reasoning_policy(), ReasoningPolicy::LeadInHeuristic);

    assert!(config.set_value("reasoning-heuristic", "maybe").is_err());
    config.unset_value("reasoning-heuristic").expect("unset");
    assert_eq!(config.reasoning_policy(), ReasoningPolicy::MarkersOnly);
}

#[test]
fn test_every_key_can_be_unset() {
    let mut config = Config::default();
    for key in CONFIG_KEYS {
        config.unset_value(key).expect("known key");
    }
}

#[test]
fn test_mutate_uses_test_override() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    Config::set_test_config_path(config_path.clone());

    Config::mutate(|config| {
        config.set_default_model("qwen2.5");
        Ok(())
    })
    .expect("mutate");
    let loaded = Config::load().expect("load");
    Config::clear_test_config_override();

    assert_eq!(loaded.default_model.as_deref(), Some("qwen2.5"));
    assert!(config_path.exists());
}

#[test]
#[cfg(unix)]
fn test_path_display_uses_tilde() {
    if let Some(home) = std::env::var_os("HOME") {
        let path = std::path::PathBuf::from(home).join(".config/ollachat/config.toml");
        assert_eq!(path_display(&path), "~/.config/ollachat/config.toml");
    }
}
