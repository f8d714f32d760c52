use chrono::Duration;
use std::sync::Arc;

use license_gate::{LicenseClient, MemoryBackend, ValidateOptions};

use crate::common::*;

#[tokio::test]
async fn test_cached_valid_response_survives_going_offline() {
    let (backend, client) = memory_client(vec![activated_record()]);
    client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

    backend.set_offline(true).await;
    let license = client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

    assert!(license.valid);
    assert_eq!(license.key, KEY);
}

#[tokio::test]
async fn test_uncached_validation_fails_offline() {
    let (backend, client) = memory_client(vec![activated_record()]);
    client
        .validate_key(ValidateOptions::new(KEY).cache_valid_response(false))
        .await
        .unwrap();

    backend.set_offline(true).await;
    let err = client.validate_key(ValidateOptions::new(KEY)).await.unwrap_err();

    assert_eq!(err.code, "REQUEST_ERROR");
}

#[tokio::test]
async fn test_invalid_responses_are_not_cached() {
    let mut record = activated_record();
    record.suspended = true;
    let (backend, client) = memory_client(vec![record]);

    client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

    assert_eq!(backend.cached_responses().await, 0);
}

#[tokio::test]
async fn test_responses_without_expiry_are_not_cached() {
    let mut record = activated_record();
    record.expires_at = None;
    let (backend, client) = memory_client(vec![record]);

    let license = client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

    assert!(license.valid);
    assert_eq!(backend.cached_responses().await, 0);
}

#[tokio::test]
async fn test_cache_is_scoped_by_entitlements() {
    let (backend, client) = memory_client(vec![activated_record()]);
    client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

    backend.set_offline(true).await;
    let err = client
        .validate_key(ValidateOptions::new(KEY).entitlement("EXPORT"))
        .await
        .unwrap_err();

    assert_eq!(err.code, "REQUEST_ERROR");
}

#[tokio::test]
async fn test_stale_cache_is_ignored() {
    let backend = Arc::new(
        MemoryBackend::new(FINGERPRINT)
            .with_cache_lifetime(Duration::zero())
            .with_records(vec![activated_record()]),
    );
    let client = LicenseClient::new(backend.clone());
    client.validate_key(ValidateOptions::new(KEY)).await.unwrap();

    backend.set_offline(true).await;
    let err = client.validate_key(ValidateOptions::new(KEY)).await.unwrap_err();

    assert_eq!(err.code, "REQUEST_ERROR");
}

#[tokio::test]
async fn test_activation_needs_network() {
    let (backend, client) = memory_client(vec![fresh_record()]);
    backend.set_offline(true).await;

    // nothing cached for an unbound key
    let err = client.validate_key(ValidateOptions::new(KEY)).await.unwrap_err();

    assert_eq!(err.code, "REQUEST_ERROR");
    assert_eq!(backend.call_count("activate").await, 0);
}
