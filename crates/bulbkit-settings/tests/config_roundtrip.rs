use bulbkit_fragments::FragmentKind;
use bulbkit_settings::{Config, ConfigError, LogFormat, ParticipantSettings, SettingsError};
use tempfile::TempDir;

fn custom_config() -> Config {
    let mut config = Config::default();
    config.participants.push(ParticipantSettings::new(
        "mfe4",
        "Fragment 4",
        FragmentKind::DomMount,
        &["mfe4", "host"],
    ));
    config.bus.max_history_size = 10;
    config.logging.format = LogFormat::Json;
    config
}

#[test]
fn test_toml_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let config = custom_config();

    config.save_to_file(&path).unwrap();
    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_json_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let config = custom_config();

    config.save_to_file(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"custom-element\""));

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_or_default_for_missing_file() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [[participants]]
        id = "host"
        kind = "host"
        initial_targets = ["host", "nobody"]
        "#,
    )
    .unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(
        err,
        SettingsError::Config(ConfigError::UnknownParticipant { .. })
    ));
}

#[test]
fn test_malformed_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::JsonError(_))
    ));
}

#[test]
fn test_missing_explicit_file_names_the_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    match Config::load_from_file(&path) {
        Err(SettingsError::LoadError(msg)) => assert!(msg.contains("absent.toml")),
        other => panic!("expected LoadError, got {:?}", other),
    }
}
