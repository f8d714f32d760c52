use serde_json::json;

use crate::common::*;
use license_gate::{Command, Failure, ValidateOptions};

#[tokio::test]
async fn test_no_machine_activates_once_and_returns_second_result() {
    let (backend, client) = scripted_client();
    backend.reply("validate_key", license_reply("NO_MACHINE", false));
    backend.reply("activate", json!({"id": "m1", "fingerprint": "fp"}));
    backend.reply("validate_key", license_reply("VALID", true));

    let license = client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

    assert!(license.valid);
    assert_eq!(license.code, "VALID");
    assert_eq!(backend.call_names(), vec!["validate_key", "activate", "validate_key"]);

    // both validations carry identical arguments
    let calls = backend.calls();
    assert_eq!(calls[0], calls[2]);
}

#[tokio::test]
async fn test_every_activation_code_triggers_activation() {
    for code in ["NO_MACHINE", "NO_MACHINES", "FINGERPRINT_SCOPE_MISMATCH"] {
        let (backend, client) = scripted_client();
        backend.reply("validate_key", license_reply(code, false));
        backend.reply("validate_key", license_reply("VALID", true));

        let license = client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

        assert_eq!(license.code, "VALID", "code {code}");
        assert_eq!(backend.count("activate"), 1, "code {code}");
        assert_eq!(backend.count("validate_key"), 2, "code {code}");
    }
}

#[tokio::test]
async fn test_other_codes_skip_activation() {
    for code in ["VALID", "SUSPENDED", "TOO_MANY_MACHINES", "BANNED", "SOMETHING_NEW"] {
        let (backend, client) = scripted_client();
        backend.reply("validate_key", license_reply(code, code == "VALID"));

        let license = client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

        assert_eq!(license.code, code);
        assert_eq!(backend.call_names(), vec!["validate_key"], "code {code}");
    }
}

#[tokio::test]
async fn test_expired_license_is_returned_unchanged() {
    let (backend, client) = scripted_client();
    backend.reply(
        "validate_key",
        json!({
            "key": "ABC-123",
            "code": "EXPIRED",
            "detail": "has expired",
            "expiry": "2024-01-01T00:00:00Z",
            "valid": false,
            "policyId": "pol_pro",
            "entitlements": [],
            "metadata": {},
        }),
    );

    let license = client.validate_key(ValidateOptions::new("ABC-123")).await.unwrap();

    assert!(!license.valid);
    assert_eq!(license.code, "EXPIRED");
    assert_eq!(license.detail, "has expired");
    assert_eq!(license.expiry.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
    assert_eq!(backend.count("activate"), 0);
}

#[tokio::test]
async fn test_no_second_activation_when_still_unbound() {
    let (backend, client) = scripted_client();
    backend.reply("validate_key", license_reply("NO_MACHINE", false));
    backend.reply("validate_key", license_reply("FINGERPRINT_SCOPE_MISMATCH", false));
    backend.reply("validate_key", license_reply("VALID", true));

    let license = client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

    assert_eq!(license.code, "FINGERPRINT_SCOPE_MISMATCH");
    assert!(!license.valid);
    assert_eq!(backend.call_names(), vec!["validate_key", "activate", "validate_key"]);
}

#[tokio::test]
async fn test_activation_failure_is_surfaced() {
    let (backend, client) = scripted_client();
    backend.reply("validate_key", license_reply("NO_MACHINE", false));
    backend.fail(
        "activate",
        Failure::rejected("MACHINE_LIMIT_EXCEEDED", "machine count has exceeded maximum"),
    );

    let err = client.validate_key(ValidateOptions::new(KEY)).await.unwrap_err();

    assert_eq!(err.code, "MACHINE_LIMIT_EXCEEDED");
    assert_eq!(err.detail, "machine count has exceeded maximum");
    assert_eq!(backend.count("validate_key"), 1);
}

#[tokio::test]
async fn test_unknown_failure_gets_unknown_code() {
    let (backend, client) = scripted_client();
    backend.fail("validate_key", Failure::Rejected(json!("boom")));

    let err = client.validate_key(ValidateOptions::new(KEY)).await.unwrap_err();

    assert_eq!(err.code, "unknown");
    assert_eq!(err.detail, "boom");
}

#[tokio::test]
async fn test_transport_failure_gets_unknown_code() {
    let (backend, client) = scripted_client();
    backend.fail("validate_key", Failure::Transport("host went away".into()));

    let err = client.validate_key(ValidateOptions::new(KEY)).await.unwrap_err();

    assert!(err.is_unknown());
    assert!(err.detail.contains("host went away"));
}

#[tokio::test]
async fn test_malformed_reply_is_an_error() {
    let (backend, client) = scripted_client();
    backend.reply("validate_key", json!({"valid": true}));

    let err = client.validate_key(ValidateOptions::new(KEY)).await.unwrap_err();

    assert!(err.is_unknown());
    assert!(err.detail.starts_with("malformed response"));
}

#[tokio::test]
async fn test_cache_flag_is_threaded_through() {
    let (backend, client) = scripted_client();
    backend.reply("validate_key", license_reply("NO_MACHINE", false));
    backend.reply("validate_key", license_reply("VALID", true));
    backend.reply("validate_key", license_reply("VALID", true));

    client
        .validate_key(ValidateOptions::new(KEY).entitlement("EXPORT"))
        .await
        .unwrap();
    client
        .validate_key(ValidateOptions::new(KEY).cache_valid_response(false))
        .await
        .unwrap();

    let flags: Vec<bool> = backend
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Command::ValidateKey {
                cache_valid_response,
                ..
            } => Some(cache_valid_response),
            _ => None,
        })
        .collect();
    assert_eq!(flags, vec![true, true, false]);

    match &backend.calls()[0] {
        Command::ValidateKey { key, entitlements, .. } => {
            assert_eq!(key, KEY);
            assert!(entitlements.contains("EXPORT"));
        }
        other => panic!("unexpected first call {other:?}"),
    }
}
