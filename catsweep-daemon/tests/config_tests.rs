//! Configuration loading and validation tests.
//!
//! Tests the shipped example config, environment variable overrides,
//! and the conversion into the sweeper's typed configuration.

use std::env;
use std::path::PathBuf;

use catsweep_core::config::{CatMode, CatSweepConfig, Format};
use catsweep_sweeper::SweepConfig;

fn example_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("catsweep.toml.example")
}

#[tokio::test]
async fn test_example_config_loads() {
    // Given: The example config shipped at the repository root
    let path = example_config_path();

    // When: Loading it
    let config = CatSweepConfig::load(&path)
        .await
        .expect("example config should load");

    // Then: The sweep section converts to a typed sweeper config
    let sweep = SweepConfig::from_core(&config.sweep).expect("sweep section should be valid");
    assert_eq!(sweep.format, Format::Tsv);
    assert_eq!(sweep.cat_mode, CatMode::Line);
    assert_eq!(
        sweep.keys,
        vec!["hdfs_path", "unixtimestamp", "label", "message"]
    );
    assert!(sweep.move_to.is_some());
    assert!(!config.metrics.enabled);
}

#[test]
fn test_minimal_config() {
    // Given: Only the required sweep options
    let toml_str = r#"
[sweep]
file_path_with_glob = "/var/spool/in/*"
format = "json"
waiting_seconds = 10
"#;

    // When: Parsing and converting
    let config = CatSweepConfig::parse(toml_str).expect("should parse");
    config.validate().expect("should validate");
    let sweep = SweepConfig::from_core(&config.sweep).expect("should convert");

    // Then: Defaults fill in the rest
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(sweep.tag, "cat_sweep");
    assert_eq!(sweep.message_key, "message");
    assert_eq!(sweep.error_file_suffix, ".error");
    assert_eq!(sweep.line_terminated_by, "\n");
    assert!((sweep.run_interval_secs - 5.0).abs() < f64::EPSILON);
    assert!(sweep.move_to.is_none());
    assert!(sweep.oneline_max_bytes.is_none());
}

#[test]
fn test_tsv_without_message_key_is_rejected() {
    let toml_str = r#"
[sweep]
file_path_with_glob = "/var/spool/in/*"
format = "tsv"
keys = "a,b,c"
waiting_seconds = 10
"#;
    let config = CatSweepConfig::parse(toml_str).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_log_format_is_rejected() {
    let toml_str = r#"
[general]
log_format = "xml"

[sweep]
file_path_with_glob = "/var/spool/in/*"
format = "none"
waiting_seconds = 10
"#;
    let config = CatSweepConfig::parse(toml_str).unwrap();
    assert!(config.validate().is_err());
}

#[test]
#[serial_test::serial]
fn test_env_override_waiting_seconds() {
    // Given: An environment override
    let original = env::var("CATSWEEP_SWEEP_WAITING_SECONDS").ok();
    unsafe {
        env::set_var("CATSWEEP_SWEEP_WAITING_SECONDS", "42");
    }

    let toml_str = r#"
[sweep]
file_path_with_glob = "/var/spool/in/*"
format = "none"
waiting_seconds = 10
"#;

    // When: Applying overrides
    let mut config = CatSweepConfig::parse(toml_str).unwrap();
    config.apply_env_overrides();

    // Then: Environment wins over the file
    assert_eq!(config.sweep.waiting_seconds, Some(42));

    unsafe {
        match original {
            Some(val) => env::set_var("CATSWEEP_SWEEP_WAITING_SECONDS", val),
            None => env::remove_var("CATSWEEP_SWEEP_WAITING_SECONDS"),
        }
    }
}

#[test]
#[serial_test::serial]
fn test_env_override_cat_mode_invalid_is_ignored() {
    let original = env::var("CATSWEEP_SWEEP_CAT_MODE").ok();
    unsafe {
        env::set_var("CATSWEEP_SWEEP_CAT_MODE", "chunked");
    }

    let toml_str = r#"
[sweep]
file_path_with_glob = "/var/spool/in/*"
format = "none"
waiting_seconds = 10
cat_mode = "stream"
"#;
    let mut config = CatSweepConfig::parse(toml_str).unwrap();
    config.apply_env_overrides();
    assert_eq!(config.sweep.cat_mode, CatMode::Stream);

    unsafe {
        match original {
            Some(val) => env::set_var("CATSWEEP_SWEEP_CAT_MODE", val),
            None => env::remove_var("CATSWEEP_SWEEP_CAT_MODE"),
        }
    }
}
