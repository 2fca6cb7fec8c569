//! Configuration resolution tests
//!
//! Note: tests that manipulate CANTOLEX_CONFIG are marked #[serial] to
//! prevent environment-variable races between parallel tests.

use std::path::PathBuf;

use cantolex_common::config::{PipelineConfig, CONFIG_ENV_VAR};
use serial_test::serial;

fn write_config(dir: &std::path::Path, body: &str) -> PathBuf {
    let path = dir.join("cantolex.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
#[serial]
fn cli_path_has_highest_priority() {
    let dir = tempfile::tempdir().unwrap();
    let cli_config = write_config(
        dir.path(),
        r#"
        [limits]
        translation_checkpoint = 25
        "#,
    );

    std::env::set_var(CONFIG_ENV_VAR, "/nonexistent/ignored.toml");
    let config = PipelineConfig::load(Some(&cli_config)).unwrap();
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.limits.translation_checkpoint, 25);
}

#[test]
#[serial]
fn env_var_names_the_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
        [services]
        translator_min_interval_ms = 500
        "#,
    );

    std::env::set_var(CONFIG_ENV_VAR, &path);
    let config = PipelineConfig::load(None).unwrap();
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.services.translator_min_interval_ms, 500);
    // Untouched sections fall back to defaults
    assert_eq!(config.limits.translation_checkpoint, 100);
}

#[test]
#[serial]
fn missing_config_file_is_an_error_when_named_explicitly() {
    std::env::remove_var(CONFIG_ENV_VAR);
    let result = PipelineConfig::load(Some(std::path::Path::new("/nonexistent/cantolex.toml")));
    assert!(result.is_err());
}

#[test]
#[serial]
fn no_config_anywhere_means_compiled_defaults() {
    std::env::remove_var(CONFIG_ENV_VAR);
    // Running from the crate directory: no ./cantolex.toml is present
    let config = PipelineConfig::load(None).unwrap();
    assert_eq!(config.limits.max_examples_per_word, 10);
}
