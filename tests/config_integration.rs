//! Integration tests for configuration loading
//!
//! Tests that verify config loading from files and environment variables.

use rust2d::config::AppConfig;
use serial_test::serial;

#[test]
#[serial]
fn test_env_override() {
    std::env::set_var("R2D_DEBUG__LOG_LEVEL", "trace");
    let config = AppConfig::load().unwrap();
    assert_eq!(config.debug.log_level, "trace");
    std::env::remove_var("R2D_DEBUG__LOG_LEVEL");
}

#[test]
#[serial]
fn test_env_override_numeric() {
    std::env::set_var("R2D_SIMULATION__TIME_STEP", "0.02");
    std::env::set_var("R2D_WORLD__TRACE_LENGTH", "4");
    let config = AppConfig::load().unwrap();
    assert_eq!(config.simulation.time_step, 0.02);
    assert_eq!(config.to_world_config().trace_length, 4);
    std::env::remove_var("R2D_SIMULATION__TIME_STEP");
    std::env::remove_var("R2D_WORLD__TRACE_LENGTH");
}

#[test]
#[serial]
fn test_default_file_loading() {
    std::env::remove_var("R2D_DEBUG__LOG_LEVEL");

    let cwd = std::env::current_dir().unwrap();
    assert!(cwd.join("config/default.toml").exists());

    let config = AppConfig::load().unwrap();
    assert_eq!(config.demo.level, "orbit");
    assert_eq!(config.world.trace_max_segments, 1000);
}

#[test]
#[serial]
fn test_missing_directory_uses_defaults() {
    let config = AppConfig::load_from("does/not/exist").unwrap();
    assert_eq!(config.simulation.time_step, 5e-3);
    assert_eq!(config.demo.seed, 7);
}

#[test]
#[serial]
fn test_bad_value_is_an_error() {
    std::env::set_var("R2D_SIMULATION__TIME_STEP", "fast");
    let result = AppConfig::load();
    std::env::remove_var("R2D_SIMULATION__TIME_STEP");
    let err = result.unwrap_err();
    assert!(err.to_string().starts_with("Configuration error"));
}
