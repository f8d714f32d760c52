use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::LicenseCode;

/// Validated state of a license key for the current machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub key: String,
    /// Machine-readable status token, see [`LicenseCode`]
    pub code: String,
    pub detail: String,
    /// Absent until the policy starts its expiry clock
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    pub valid: bool,
    pub policy_id: String,
    #[serde(default)]
    pub entitlements: BTreeSet<String>,
    /// Passed through untouched
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl License {
    /// Parsed status code, `None` for codes this crate doesn't know.
    pub fn status(&self) -> Option<LicenseCode> {
        self.code.parse().ok()
    }

    pub fn has_entitlement(&self, entitlement: &str) -> bool {
        self.entitlements.contains(entitlement)
    }

    /// Whether the license no longer covers `now`.
    ///
    /// A license without an expiry counts as expired here: its clock hasn't
    /// started, so nothing is covered yet.
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_none_or(|expiry| expiry <= now)
    }

    /// Valid despite being expired, i.e. governed by a maintain-access policy.
    pub fn should_maintain_access(&self) -> bool {
        self.valid && self.status() == Some(LicenseCode::Expired)
    }
}
