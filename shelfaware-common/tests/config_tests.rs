//! Tests for configuration loading and graceful degradation
//!
//! Missing config files must not prevent startup: compiled defaults apply
//! with a warning. An explicitly requested path that does not exist is an
//! error, and malformed TOML is reported as a configuration error.

use shelfaware_common::config::{ServiceConfig, DEFAULT_VISION_BASE_URL};
use shelfaware_common::Error;
use std::io::Write;

#[test]
fn load_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
port = 9000
vision_base_url = "http://vision.local:5001"
store_base_url = "https://rows.example.com"
store_api_key = "test-key"
poll_interval_ms = 500
"#
    )
    .unwrap();

    let config = ServiceConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.port, 9000);
    assert_eq!(config.vision_base_url, "http://vision.local:5001");
    assert_eq!(config.store_base_url, "https://rows.example.com");
    assert_eq!(config.poll_interval_ms, 500);
    // Unset keys fall back to compiled defaults
    assert_eq!(config.max_start_attempts, 3);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let result = ServiceConfig::load(Some(std::path::Path::new(
        "/nonexistent/shelfaware/config.toml",
    )));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn malformed_toml_is_a_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = \"not a number").unwrap();

    let result = ServiceConfig::load(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn invalid_poll_interval_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "poll_interval_ms = 0").unwrap();

    let result = ServiceConfig::load(Some(file.path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn defaults_used_when_nothing_configured() {
    let config = ServiceConfig::default();
    assert_eq!(config.vision_base_url, DEFAULT_VISION_BASE_URL);
    assert!(config.store_base_url.is_empty());
}
