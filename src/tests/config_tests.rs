//! Tests for the configuration module.

use crate::config::{ConfigLoader, KiaiConfig, LogConfig, ReplayConfig, ReputationConfig, Validate};
use crate::error::config::ConfigError;
use crate::tests::TestFixture;
use test_case::test_case;

/// Test that default configuration can be created and is valid.
#[test]
fn test_default_config_is_valid() {
    let config = KiaiConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.reputation.target_fpr, 0.01);
    assert_eq!(config.reputation.bulk_target_fpr(), 0.005);
    assert_eq!(config.replay.ip_column, "Src IP");
}

#[test_case(|c: &mut ReputationConfig| c.target_fpr = 0.0 ; "zero fpr")]
#[test_case(|c: &mut ReputationConfig| c.target_fpr = 1.0 ; "fpr of one")]
#[test_case(|c: &mut ReputationConfig| c.target_fpr = f64::NAN ; "nan fpr")]
#[test_case(|c: &mut ReputationConfig| c.bulk_fpr_headroom = 1.5 ; "headroom above one")]
#[test_case(|c: &mut ReputationConfig| c.load_factor_limit = 0.0 ; "zero load limit")]
#[test_case(|c: &mut ReputationConfig| c.growth_factor = 1 ; "growth of one")]
#[test_case(|c: &mut ReputationConfig| c.max_kicks = 0 ; "no kicks")]
#[test_case(|c: &mut ReputationConfig| c.initial_capacity = 1 ; "single slot")]
#[test_case(|c: &mut ReputationConfig| c.expected_items = 0 ; "no expected items")]
fn test_reputation_validation(mutate: fn(&mut ReputationConfig)) {
    let mut config = ReputationConfig::default();
    mutate(&mut config);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValueOutOfRange { .. })
    ));
}

/// Test that validation catches invalid replay and log values.
#[test]
fn test_replay_and_log_validation() {
    let mut replay = ReplayConfig::default();
    replay.batch_size = 0;
    assert!(replay.validate().is_err());

    let mut replay = ReplayConfig::default();
    replay.ip_column = "  ".to_string();
    assert!(matches!(
        replay.validate(),
        Err(ConfigError::ValidationError(_))
    ));

    let log = LogConfig {
        level: "verbose".to_string(),
        ..LogConfig::default()
    };
    assert!(log.validate().is_err());
}

/// Test loading configuration from a file.
#[test]
fn test_load_config_from_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .write_file(
            "kiai.toml",
            r#"
            [reputation]
            target_fpr = 0.001
            max_kicks = 64

            [replay]
            batch_size = 500
            "#,
        )
        .unwrap();

    let config = ConfigLoader::new(Some(&path), "TEST_FILE").load().unwrap();

    assert_eq!(config.reputation.target_fpr, 0.001);
    assert_eq!(config.reputation.max_kicks, 64);
    assert_eq!(config.replay.batch_size, 500);

    // Other values should be defaults
    assert_eq!(config.reputation.growth_factor, 2);
    assert_eq!(config.log, LogConfig::default());
}

/// Test loading configuration with environment variable overrides.
#[test]
fn test_env_var_override() {
    let mut fixture = TestFixture::new().unwrap();
    let path = fixture
        .write_file("kiai.toml", "[reputation]\nload_factor_limit = 0.8\n")
        .unwrap();

    fixture.set_env("TEST_ENV__REPUTATION__LOAD_FACTOR_LIMIT", "0.75");
    fixture.set_env("TEST_ENV__REPLAY__IP_COLUMN", "source");

    let config = ConfigLoader::new(Some(&path), "TEST_ENV").load().unwrap();

    assert_eq!(config.reputation.load_factor_limit, 0.75);
    assert_eq!(config.replay.ip_column, "source");
}

/// Test that values failing validation are rejected at load time.
#[test]
fn test_load_rejects_out_of_range_values() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .write_file("bad.toml", "[reputation]\ngrowth_factor = 1\n")
        .unwrap();

    let err = ConfigLoader::new(Some(&path), "TEST_RANGE").load().unwrap_err();
    assert!(matches!(err, ConfigError::ValueOutOfRange { ref key, .. } if key == "reputation.growth_factor"));
}

/// Test that loading an invalid configuration file returns an error.
#[test]
fn test_load_invalid_config() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .write_file("invalid.toml", "[reputation\ntarget_fpr = ")
        .unwrap();

    let loader = ConfigLoader::new(Some(&path), "TEST_INVALID");
    assert!(matches!(loader.load(), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_missing_file_and_unknown_extension() {
    let fixture = TestFixture::new().unwrap();

    let missing = fixture.temp_dir.path().join("absent.toml");
    assert!(matches!(
        ConfigLoader::new(Some(&missing), "TEST_MISSING").load(),
        Err(ConfigError::FileNotFound(_))
    ));

    let ini = fixture.write_file("kiai.ini", "").unwrap();
    assert!(matches!(
        ConfigLoader::new(Some(&ini), "TEST_EXT").load(),
        Err(ConfigError::ParseError(_))
    ));
}

/// Generated configuration round-trips through TOML.
#[test]
fn test_default_config_toml_round_trip() {
    let toml = toml::to_string_pretty(&KiaiConfig::default()).unwrap();
    let parsed: KiaiConfig = toml::from_str(&toml).unwrap();
    assert_eq!(parsed, KiaiConfig::default());
}
