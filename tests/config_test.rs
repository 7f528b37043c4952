//! Integration tests for Settings config loading with layered merge semantics.
//!
//! These tests write explicit config files into temp directories. A global
//! config on the test machine would sit below them in precedence.

use std::fs;

use tempfile::TempDir;

use threadrank::application::ApplicationError;
use threadrank::config::Settings;

#[test]
fn given_explicit_config_when_load_then_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("threadrank.toml");
    fs::write(
        &path,
        r#"
snapshot_path = "/tmp/forum.json"
viewer = 42

[scoring]
gravity = 1.5
precision = 6
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(&path)).expect("load settings");

    assert_eq!(settings.snapshot_path.to_str(), Some("/tmp/forum.json"));
    assert_eq!(settings.viewer, Some(42));
    assert_eq!(settings.scoring.gravity, 1.5);
    assert_eq!(settings.scoring.precision, 6);
    assert_eq!(settings.scoring.age_offset_hours, 2.0);
}

#[test]
fn given_tilde_snapshot_path_when_load_then_expanded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("threadrank.toml");
    fs::write(&path, "snapshot_path = \"~/forum.json\"\n").unwrap();

    let settings = Settings::load(Some(&path)).unwrap();

    assert!(!settings.snapshot_path.starts_with("~"));
    assert!(settings.snapshot_path.ends_with("forum.json"));
}

#[test]
fn given_negative_gravity_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("threadrank.toml");
    fs::write(&path, "[scoring]\ngravity = -1.0\n").unwrap();

    let err = Settings::load(Some(&path)).unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
    assert!(err.to_string().contains("gravity"));
}

#[test]
fn given_unparsable_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("threadrank.toml");
    fs::write(&path, "viewer = [not toml").unwrap();

    assert!(matches!(
        Settings::load(Some(&path)),
        Err(ApplicationError::Config { .. })
    ));
}

#[test]
fn given_missing_explicit_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    assert!(Settings::load(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn given_env_override_when_load_then_env_wins_over_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("threadrank.toml");
    fs::write(&path, "[scoring]\ndecay = 0.25\n").unwrap();
    std::env::set_var("THREADRANK_SCORING__DECAY", "0.75");

    let settings = Settings::load(Some(&path));
    std::env::remove_var("THREADRANK_SCORING__DECAY");

    assert_eq!(settings.unwrap().scoring.decay, 0.75);
}

#[test]
fn given_settings_when_to_toml_then_round_trips() {
    let settings = Settings::default();
    let rendered = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&rendered).unwrap();
    assert_eq!(parsed, settings);
}
