//! Integration tests for the configuration system.
//!
//! Covers validation, presets, environment parsing and file round-trips.

use super::*;
use crate::error::FatBufError;
use std::env;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_all_config_defaults() {
    assert!(ArrayConfig::default().validate().is_ok());
    assert!(HashTableConfig::default().validate().is_ok());
}

#[test]
fn test_all_presets_valid() {
    assert!(ArrayConfig::performance_preset().validate().is_ok());
    assert!(ArrayConfig::memory_preset().validate().is_ok());
    assert!(ArrayConfig::balanced_preset().validate().is_ok());

    assert!(HashTableConfig::performance_preset().validate().is_ok());
    assert!(HashTableConfig::memory_preset().validate().is_ok());
    assert!(HashTableConfig::balanced_preset().validate().is_ok());
}

#[test]
fn test_preset_characteristics() {
    let perf = ArrayConfig::performance_preset();
    let mem = ArrayConfig::memory_preset();
    assert!(perf.default_size_bytes > mem.default_size_bytes);
    assert_eq!(mem.growth, GrowthStrategy::Exact);

    let perf = HashTableConfig::performance_preset();
    let mem = HashTableConfig::memory_preset();
    assert!(perf.store_hashes);
    assert!(!mem.store_hashes);
    assert!(mem.neighborhood_size >= perf.neighborhood_size);

    assert_eq!(HashTableConfig::balanced_preset(), HashTableConfig::default());
}

#[test]
fn test_environment_variable_parsing() {
    unsafe { env::set_var("FBTEST_ARRAY_DEFAULT_SIZE_BYTES", "64"); }
    unsafe { env::set_var("FBTEST_ARRAY_GROWTH", "exact"); }
    unsafe { env::set_var("FBTEST_HASH_NEIGHBORHOOD_SIZE", "12"); }
    unsafe { env::set_var("FBTEST_HASH_MAX_FAIL_RETRIES", "7"); }
    unsafe { env::set_var("FBTEST_HASH_STORE_HASHES", "yes"); }

    let array = ArrayConfig::from_env_with_prefix("FBTEST_")
        .expect("Failed to parse ArrayConfig from environment");
    assert_eq!(array.default_size_bytes, 64);
    assert_eq!(array.growth, GrowthStrategy::Exact);

    let table = HashTableConfig::from_env_with_prefix("FBTEST_")
        .expect("Failed to parse HashTableConfig from environment");
    assert_eq!(table.neighborhood_size, 12);
    assert_eq!(table.max_fail_retries, 7);
    assert!(table.store_hashes);

    unsafe { env::remove_var("FBTEST_ARRAY_DEFAULT_SIZE_BYTES"); }
    unsafe { env::remove_var("FBTEST_ARRAY_GROWTH"); }
    unsafe { env::remove_var("FBTEST_HASH_NEIGHBORHOOD_SIZE"); }
    unsafe { env::remove_var("FBTEST_HASH_MAX_FAIL_RETRIES"); }
    unsafe { env::remove_var("FBTEST_HASH_STORE_HASHES"); }
}

#[test]
fn test_environment_invalid_values() {
    // Unparsable values fall back to the default
    unsafe { env::set_var("FBBAD_HASH_MAX_FAIL_RETRIES", "many"); }
    let table = HashTableConfig::from_env_with_prefix("FBBAD_").unwrap();
    assert_eq!(table.max_fail_retries, 5);

    // Parsable but invalid values are rejected
    unsafe { env::set_var("FBBAD_HASH_NEIGHBORHOOD_SIZE", "40"); }
    let err = HashTableConfig::from_env_with_prefix("FBBAD_").unwrap_err();
    assert!(matches!(err, FatBufError::Configuration { .. }));

    unsafe { env::remove_var("FBBAD_HASH_MAX_FAIL_RETRIES"); }
    unsafe { env::remove_var("FBBAD_HASH_NEIGHBORHOOD_SIZE"); }
}

#[test]
fn test_environment_boolean_parsing() {
    let test_cases = [
        ("true", true),
        ("TRUE", true),
        ("1", true),
        ("yes", true),
        ("on", true),
        ("false", false),
        ("0", false),
        ("no", false),
        ("off", false),
        ("garbage", false),
    ];

    for (value, expected) in test_cases.iter() {
        unsafe { env::set_var("FBTEST_BOOL_VALUE", value); }
        let result = parse_env_bool("FBTEST_BOOL_VALUE", false);
        assert_eq!(result, *expected, "Failed for value: '{}'", value);
    }

    unsafe { env::remove_var("FBTEST_BOOL_VALUE"); }
    assert!(parse_env_bool("FBTEST_BOOL_VALUE", true));
}

#[test]
fn test_file_serialization() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let array = ArrayConfig::builder()
        .default_size_bytes(128)
        .growth(GrowthStrategy::Exact)
        .build()?;
    let array_path = temp_dir.path().join("array_config.json");
    array.save_to_file(&array_path)?;
    assert_eq!(ArrayConfig::load_from_file(&array_path)?, array);

    let table = HashTableConfig::builder()
        .neighborhood_size(16)
        .store_hashes(true)
        .build()?;
    let table_path = temp_dir.path().join("table_config.json");
    table.save_to_file(&table_path)?;
    assert_eq!(HashTableConfig::load_from_file(&table_path)?, table);

    Ok(())
}

#[test]
fn test_invalid_file_contents() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let garbage = temp_dir.path().join("garbage.json");
    fs::write(&garbage, "not json").unwrap();
    let err = HashTableConfig::load_from_file(&garbage).unwrap_err();
    assert_eq!(err.category(), "config");

    let invalid = temp_dir.path().join("invalid.json");
    fs::write(
        &invalid,
        r#"{"neighborhood_size": 0, "max_fail_retries": 5, "store_hashes": false}"#,
    )
    .unwrap();
    assert!(HashTableConfig::load_from_file(&invalid).is_err());

    let missing = temp_dir.path().join("missing.json");
    let err = ArrayConfig::load_from_file(&missing).unwrap_err();
    assert!(matches!(err, FatBufError::Io(_)));
    assert!(err.is_recoverable());
}

#[test]
fn test_validation_error_display() {
    let err = ValidationError::new("neighborhood_size", "0", "too small").with_suggestion("1 to 31");
    let text = err.to_string();
    assert!(text.contains("neighborhood_size"));
    assert!(text.contains("1 to 31"));

    let converted: FatBufError = err.into();
    assert!(matches!(converted, FatBufError::Configuration { .. }));
}
