//! Environment settings and profile directory resolution.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use metricgate_core::error::GateError;
use metricgate_gateway::config::{ProfileSource, ProfilesDir, Settings};

fn settings(pairs: &[(&str, &str)]) -> Result<Settings, GateError> {
    let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    Settings::from_lookup(|key| env.get(key).cloned())
}

const KEYS: [(&str, &str); 2] = [("MF_API_KEY", "read"), ("MF_ADMIN_KEY", "admin")];

#[test]
fn defaults_apply() {
    let s = settings(&KEYS).unwrap();
    assert_eq!(s.api_key, "read");
    assert_eq!(s.admin_key, "admin");
    assert_eq!(s.dbt_profiles_dir, Path::new("/app/.dbt"));
    assert_eq!(s.profiles_b64, None);
    assert_eq!(s.dbt_profile_name, "metricflow_server");
    assert_eq!(s.host, "0.0.0.0");
    assert_eq!(s.port, 8080);
    assert_eq!(s.log_level, "info");
    assert_eq!(s.max_manifest_bytes, 64 * 1024 * 1024);
}

#[test]
fn overrides_apply() {
    let mut pairs = KEYS.to_vec();
    pairs.extend([
        ("MF_PORT", "9000"),
        ("MF_HOST", "127.0.0.1"),
        ("MF_DBT_PROFILE_NAME", "jaffle"),
        ("MF_LOG_LEVEL", "debug"),
        ("MF_MAX_MANIFEST_BYTES", "1024"),
    ]);
    let s = settings(&pairs).unwrap();
    assert_eq!(s.port, 9000);
    assert_eq!(s.host, "127.0.0.1");
    assert_eq!(s.dbt_profile_name, "jaffle");
    assert_eq!(s.max_manifest_bytes, 1024);

    let loc = s.profile_location("/tmp/p".into());
    assert_eq!(loc.profile_name, "jaffle");
}

#[test]
fn keys_are_required() {
    assert!(matches!(settings(&[("MF_API_KEY", "read")]), Err(GateError::BadRequest(m)) if m.contains("MF_ADMIN_KEY")));
    assert!(matches!(
        settings(&[("MF_API_KEY", "  "), ("MF_ADMIN_KEY", "admin")]),
        Err(GateError::BadRequest(m)) if m.contains("MF_API_KEY")
    ));
}

#[test]
fn bad_numbers_are_rejected() {
    for (key, value) in [("MF_PORT", "http"), ("MF_PORT", "0"), ("MF_PORT", "70000"), ("MF_MAX_MANIFEST_BYTES", "0")] {
        let mut pairs = KEYS.to_vec();
        pairs.push((key, value));
        assert!(settings(&pairs).is_err(), "{key}={value}");
    }
}

#[test]
fn debug_output_redacts_keys() {
    let s = settings(&KEYS).unwrap();
    let shown = format!("{s:?}");
    assert!(!shown.contains("\"read\""));
    assert!(!shown.contains("\"admin\""));
    assert!(shown.contains("<redacted>"));
}

#[test]
fn directory_source_is_passed_through() {
    let mut pairs = KEYS.to_vec();
    pairs.push(("MF_DBT_PROFILES_DIR", "/srv/dbt"));
    let s = settings(&pairs).unwrap();

    let mut dir = ProfilesDir::resolve(&s).unwrap();
    assert_eq!(dir.source(), ProfileSource::Directory);
    assert_eq!(dir.path(), Path::new("/srv/dbt"));
    dir.cleanup().unwrap();
}

#[test]
fn embedded_profiles_are_materialised_and_cleaned() {
    let yaml = "metricflow_server:\n  target: dev\n  outputs:\n    dev:\n      type: sqlite\n";
    let blob = STANDARD.encode(yaml);
    let mut pairs = KEYS.to_vec();
    pairs.push(("MF_PROFILES_B64", &blob));
    let s = settings(&pairs).unwrap();

    let mut dir = ProfilesDir::resolve(&s).unwrap();
    assert_eq!(dir.source(), ProfileSource::Embedded);
    let root = dir.path().to_path_buf();
    assert!(root.file_name().unwrap().to_string_lossy().starts_with("mfserver_profiles_"));
    assert_eq!(fs::read_to_string(root.join("profiles.yml")).unwrap(), yaml);

    dir.cleanup().unwrap();
    assert!(!root.exists());
    dir.cleanup().unwrap();
}

#[test]
fn invalid_base64_is_rejected() {
    assert!(matches!(ProfilesDir::from_base64("not base64!!"), Err(GateError::BadRequest(_))));
}

#[test]
fn missing_env_file_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    Settings::load_env_file(&dir.path().join(".env")).unwrap();
}

#[test]
fn malformed_env_file_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env");
    fs::write(&path, "this line is not an assignment\n").unwrap();

    let err = Settings::load_env_file(&path).unwrap_err();
    assert!(matches!(err, GateError::BadRequest(ref m) if m.starts_with(".env could not be loaded")), "{err}");
}
