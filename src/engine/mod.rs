//! License client: validation, activation, checkout and session queries.
//!
//! Every operation issues at most a handful of sequential backend calls and
//! keeps no state of its own. The current key, license and response cache
//! all live in the backend.

mod checkout;
mod session;
mod validate;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::Backend;
use crate::config::{CheckoutTtlPolicy, Config};
use crate::error::{Failure, Result, normalize};
use crate::models::Command;
use crate::util::DEFAULT_CHECKOUT_TTL;

#[derive(Clone)]
pub struct LicenseClient {
    backend: Arc<dyn Backend>,
    ttl_policy: CheckoutTtlPolicy,
    default_ttl_seconds: u64,
}

impl LicenseClient {
    /// Create a client with the default TTL policy and lease length
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            ttl_policy: CheckoutTtlPolicy::default(),
            default_ttl_seconds: DEFAULT_CHECKOUT_TTL,
        }
    }

    /// Create a client using the TTL settings from `config`
    pub fn with_config(backend: Arc<dyn Backend>, config: &Config) -> Self {
        Self {
            backend,
            ttl_policy: config.ttl_policy,
            default_ttl_seconds: config.default_ttl_seconds,
        }
    }

    /// Replace the checkout TTL policy
    pub fn with_ttl_policy(mut self, policy: CheckoutTtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Get the checkout TTL policy
    pub fn ttl_policy(&self) -> CheckoutTtlPolicy {
        self.ttl_policy
    }

    /// Invoke one backend command, normalizing any failure.
    async fn send(&self, command: Command) -> Result<Value> {
        tracing::debug!(command = command.name(), "backend call");
        self.backend
            .invoke(command)
            .await
            .map_err(|failure| normalize(&failure))
    }

    /// Invoke and decode the reply into our own type.
    async fn fetch<T: DeserializeOwned>(&self, command: Command) -> Result<T> {
        let reply = self.send(command).await?;
        serde_json::from_value(reply).map_err(|e| normalize(&Failure::Malformed(e)))
    }
}

impl std::fmt::Debug for LicenseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseClient")
            .field("ttl_policy", &self.ttl_policy)
            .field("default_ttl_seconds", &self.default_ttl_seconds)
            .finish()
    }
}
