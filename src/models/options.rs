use std::collections::BTreeSet;

/// Arguments for [`LicenseClient::validate_key`](crate::LicenseClient::validate_key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateOptions {
    pub key: String,
    pub entitlements: BTreeSet<String>,
    /// Hint for the backend's response cache. Defaults to `true`.
    pub cache_valid_response: bool,
}

impl ValidateOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entitlements: BTreeSet::new(),
            cache_valid_response: true,
        }
    }

    pub fn entitlement(mut self, entitlement: impl Into<String>) -> Self {
        self.entitlements.insert(entitlement.into());
        self
    }

    pub fn entitlements<I, S>(mut self, entitlements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entitlements.extend(entitlements.into_iter().map(Into::into));
        self
    }

    pub fn cache_valid_response(mut self, cache: bool) -> Self {
        self.cache_valid_response = cache;
        self
    }
}

/// Arguments for [`LicenseClient::validate_checkout_key`](crate::LicenseClient::validate_checkout_key).
///
/// There is no cache flag: checkouts always validate fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOptions {
    pub key: String,
    pub entitlements: BTreeSet<String>,
    /// Requested lease length; `None` uses the configured default
    pub ttl_seconds: Option<u64>,
    pub ttl_forever: bool,
}

impl CheckoutOptions {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entitlements: BTreeSet::new(),
            ttl_seconds: None,
            ttl_forever: false,
        }
    }

    pub fn entitlement(mut self, entitlement: impl Into<String>) -> Self {
        self.entitlements.insert(entitlement.into());
        self
    }

    pub fn entitlements<I, S>(mut self, entitlements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entitlements.extend(entitlements.into_iter().map(Into::into));
        self
    }

    pub fn ttl_seconds(mut self, ttl: u64) -> Self {
        self.ttl_seconds = Some(ttl);
        self
    }

    pub fn ttl_forever(mut self, forever: bool) -> Self {
        self.ttl_forever = forever;
        self
    }
}
