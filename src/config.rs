use std::env;
use std::path::PathBuf;

use strum::{AsRefStr, EnumString};

/// How a requested checkout TTL is bounded before it reaches the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CheckoutTtlPolicy {
    /// Out-of-window values fall back to the minimum
    #[default]
    Clamp,
    /// Forward unchanged and let the backend enforce bounds
    #[strum(serialize = "passthrough", serialize = "pass-through")]
    PassThrough,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ttl_policy: CheckoutTtlPolicy,
    /// Lease length used when a checkout doesn't ask for one
    pub default_ttl_seconds: u64,
    /// Fingerprint the simulated backend presents
    pub fingerprint: String,
    /// How long a cached valid response is honored while offline
    pub cache_lifetime_minutes: i64,
    /// JSON fixture loaded by the CLI
    pub fixture_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable lookup. Unparseable values use defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let ttl_policy: CheckoutTtlPolicy = lookup("LICENSE_GATE_TTL_POLICY")
            .and_then(|v| v.to_lowercase().parse().ok())
            .unwrap_or_default();

        let default_ttl_seconds: u64 = lookup("LICENSE_GATE_DEFAULT_TTL")
            .and_then(|v| v.parse().ok())
            .unwrap_or(crate::util::DEFAULT_CHECKOUT_TTL);

        let fingerprint = lookup("LICENSE_GATE_FINGERPRINT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let cache_lifetime_minutes: i64 = lookup("LICENSE_GATE_CACHE_LIFETIME_MINUTES")
            .and_then(|v| v.parse().ok())
            .filter(|v: &i64| *v >= 0)
            .unwrap_or(1440);

        Self {
            ttl_policy,
            default_ttl_seconds,
            fingerprint,
            cache_lifetime_minutes,
            fixture_path: lookup("LICENSE_GATE_FIXTURE").map(PathBuf::from),
        }
    }
}
