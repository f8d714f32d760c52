use super::LicenseClient;
use crate::error::Result;
use crate::models::{CheckoutOptions, Command, License, ValidateOptions};
use crate::util::bound_ttl;

impl LicenseClient {
    /// Validate freshly and, if the license is valid, check out an offline lease.
    ///
    /// Validation always bypasses the backend's response cache. An invalid
    /// license is returned as-is without a checkout.
    pub async fn validate_checkout_key(&self, options: CheckoutOptions) -> Result<License> {
        let CheckoutOptions {
            key,
            entitlements,
            ttl_seconds,
            ttl_forever,
        } = options;

        let license = self
            .validate_key(ValidateOptions {
                key,
                entitlements,
                cache_valid_response: false,
            })
            .await?;

        if !license.valid {
            tracing::debug!(key = %license.key, code = %license.code, "license invalid, skipping checkout");
            return Ok(license);
        }

        let requested = ttl_seconds.unwrap_or(self.default_ttl_seconds);
        let ttl_seconds = bound_ttl(requested, self.ttl_policy);
        if ttl_seconds != requested {
            tracing::info!(requested, ttl_seconds, "checkout ttl out of bounds, using default");
        }

        self.send(Command::CheckoutMachine {
            ttl_seconds,
            ttl_forever,
        })
        .await?;

        tracing::info!(key = %license.key, ttl_seconds, ttl_forever, "license checked out");

        Ok(license)
    }
}
