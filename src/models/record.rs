use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, EnumString};

/// When a license's expiry clock starts.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpirationBasis {
    #[default]
    FromCreation,
    FromFirstActivation,
}

/// A license as the simulated backend stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub key: String,
    pub policy_id: String,
    #[serde(default)]
    pub entitlements: BTreeSet<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub banned: bool,
    /// Payment past due
    #[serde(default)]
    pub overdue: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiration_basis: ExpirationBasis,
    /// Lifetime applied on first activation (`FromFirstActivation` only)
    #[serde(default)]
    pub duration_days: Option<i32>,
    /// Stay valid after expiry instead of restricting access
    #[serde(default)]
    pub maintain_access: bool,
    /// Floating policies may move between machines
    #[serde(default)]
    pub floating: bool,
    /// 0 = unlimited
    #[serde(default = "default_machine_limit")]
    pub machine_limit: u32,
    #[serde(default)]
    pub machines: Vec<Machine>,
}

fn default_machine_limit() -> u32 {
    1
}

impl LicenseRecord {
    pub fn new(key: impl Into<String>, policy_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            policy_id: policy_id.into(),
            entitlements: BTreeSet::new(),
            metadata: Map::new(),
            suspended: false,
            banned: false,
            overdue: false,
            expires_at: None,
            expiration_basis: ExpirationBasis::FromCreation,
            duration_days: None,
            maintain_access: false,
            floating: false,
            machine_limit: default_machine_limit(),
            machines: Vec::new(),
        }
    }

    pub fn is_bound_to(&self, fingerprint: &str) -> bool {
        self.machines.iter().any(|m| m.fingerprint == fingerprint)
    }
}

/// A machine bound to a license.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub id: String,
    pub fingerprint: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    pub activated_at: i64,
}

/// An offline lease issued by a checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub id: String,
    pub key: String,
    pub fingerprint: String,
    pub issued_at: DateTime<Utc>,
    /// `None` = leased forever
    pub expires_at: Option<DateTime<Utc>>,
}

impl Lease {
    /// Whether this lease still covers `fingerprint` at `now`. Leases issued
    /// in the future are treated as tampered with.
    pub fn is_live(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        self.fingerprint == fingerprint
            && self.issued_at <= now
            && self.expires_at.is_none_or(|exp| exp > now)
    }
}
