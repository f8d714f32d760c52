use std::io::Write;
use std::sync::Arc;

use license_gate::{Config, Fixture, LicenseClient, MemoryBackend, ValidateOptions};

use crate::common::*;

fn write_fixture(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_fixture_drives_backend() {
    let file = write_fixture(
        r#"{
            "fingerprint": "fp-from-fixture",
            "machine_name": "build-box",
            "licenses": [
                {
                    "key": "ABC-123",
                    "policy_id": "pol_pro",
                    "entitlements": ["EXPORT"],
                    "expires_at": "2999-01-01T00:00:00Z",
                    "metadata": {"seats": 5}
                }
            ]
        }"#,
    );

    let fixture = Fixture::load(file.path()).unwrap();
    let backend = Arc::new(MemoryBackend::from_fixture(fixture, &Config::default()));
    assert_eq!(backend.fingerprint(), "fp-from-fixture");

    let client = LicenseClient::new(backend.clone());
    let license = client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

    assert!(license.valid);
    assert_eq!(license.metadata["seats"], 5);

    let record = backend.record(KEY).await.unwrap();
    assert_eq!(record.machines[0].fingerprint, "fp-from-fixture");
    assert_eq!(record.machines[0].name.as_deref(), Some("build-box"));
}

#[test]
fn test_fixture_falls_back_to_config_fingerprint() {
    let config = Config::from_lookup(|name| {
        (name == "LICENSE_GATE_FINGERPRINT").then(|| "fp-from-env".to_string())
    });

    let backend = MemoryBackend::from_fixture(Fixture::default(), &config);

    assert_eq!(backend.fingerprint(), "fp-from-env");
}

#[test]
fn test_missing_fixture_is_io_failure() {
    let err = Fixture::load("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, license_gate::Failure::Io(_)));
}

#[test]
fn test_broken_fixture_is_malformed() {
    let file = write_fixture("{ not json");
    let err = Fixture::load(file.path()).unwrap_err();
    assert!(matches!(err, license_gate::Failure::Malformed(_)));
}

#[test]
fn test_explicit_fingerprint_beats_fixture() {
    let fixture: Fixture = serde_json::from_str(r#"{"fingerprint": "fp-fixture"}"#).unwrap();
    let config = Config::from_lookup(|name| {
        (name == "LICENSE_GATE_FINGERPRINT").then(|| "fp-from-flag".to_string())
    });

    let backend = MemoryBackend::from_fixture(
        fixture.with_fingerprint(Some("fp-from-flag".to_string())),
        &config,
    );

    assert_eq!(backend.fingerprint(), "fp-from-flag");
}

#[test]
fn test_absent_override_keeps_fixture_fingerprint() {
    let fixture: Fixture = serde_json::from_str(r#"{"fingerprint": "fp-fixture"}"#).unwrap();

    let backend = MemoryBackend::from_fixture(fixture.with_fingerprint(None), &Config::default());

    assert_eq!(backend.fingerprint(), "fp-fixture");
}
