// Configuration unit tests

use linkstore::config::*;
use linkstore::transform::TransformConfig;

#[test]
fn test_can_deserialize_full_yaml_config() {
    let yaml = r#"
store:
  backend: memory
linkstore:
  backend: memory
  max_entries: 500
transform:
  max_width: 1024
  max_height: 768
  max_source_pixels: 4000000
  jpeg_quality: 75
resolver:
  timeout_ms: 250
  race_on_hit: false
logging:
  level: "linkstore=debug"
  format: text
"#;
    let config = Config::from_yaml_with_env(yaml).expect("Failed to parse config");
    assert_eq!(config.store.backend, StoreBackend::Memory);
    assert_eq!(config.linkstore.backend, LinkStoreBackend::Memory);
    assert_eq!(config.linkstore.max_entries, 500);
    assert_eq!(config.transform.max_height, 768);
    assert_eq!(config.transform.max_source_pixels, 4_000_000);
    assert_eq!(config.transform.jpeg_quality, 75);
    assert_eq!(config.resolver.timeout_ms, 250);
    assert!(!config.resolver.race_on_hit);
    assert_eq!(config.logging.level, "linkstore=debug");
    assert_eq!(config.logging.format, LogFormat::Text);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_sections_keep_defaults() {
    let yaml = r#"
transform:
  jpeg_quality: 60
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    let defaults = TransformConfig::default();
    assert_eq!(config.transform.jpeg_quality, 60);
    assert_eq!(config.transform.max_width, defaults.max_width);
    assert_eq!(config.linkstore.path, LinkStoreConfig::default().path);
}

#[test]
fn test_validation_rejects_bad_values() {
    let cases = [
        "transform:\n  jpeg_quality: 0",
        "transform:\n  jpeg_quality: 101",
        "transform:\n  max_width: 0",
        "transform:\n  max_source_pixels: 0",
        "store:\n  backend: fs\n  root: \"\"",
        "linkstore:\n  backend: log\n  path: \"\"",
        "linkstore:\n  backend: memory\n  max_entries: 0",
        "store:\n  backend: memory\nlinkstore:\n  backend: log",
    ];
    for yaml in cases {
        let config = Config::from_yaml_with_env(yaml).unwrap();
        assert!(config.validate().is_err(), "{}", yaml);
    }
}

#[test]
fn test_unknown_backend_is_rejected() {
    assert!(Config::from_yaml_with_env("store:\n  backend: s3").is_err());
}

#[test]
fn test_multiple_env_vars_substituted() {
    std::env::set_var("LINKSTORE_UT_ROOT", "/srv/blobs");
    std::env::set_var("LINKSTORE_UT_LOG", "/srv/links.log");
    let yaml = r#"
store:
  backend: fs
  root: "${LINKSTORE_UT_ROOT}"
linkstore:
  path: "${LINKSTORE_UT_LOG}"
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.store.root, "/srv/blobs");
    assert_eq!(config.linkstore.path, "/srv/links.log");
    std::env::remove_var("LINKSTORE_UT_ROOT");
    std::env::remove_var("LINKSTORE_UT_LOG");
}
