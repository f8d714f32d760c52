use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One request on the backend call interface.
///
/// Serializes as `{"cmd": "validate_key", "args": {...}}` so hosts can
/// forward it verbatim over their invoke boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "cmd",
    content = "args",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    GetLicense,
    GetLicenseKey,
    ValidateKey {
        key: String,
        entitlements: BTreeSet<String>,
        cache_valid_response: bool,
    },
    /// Bind the current machine; the backend derives the fingerprint
    Activate,
    CheckoutMachine {
        ttl_seconds: u64,
        ttl_forever: bool,
    },
    ResetLicense {
        hard_reset: bool,
    },
    ResetLicenseKey,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::GetLicense => "get_license",
            Command::GetLicenseKey => "get_license_key",
            Command::ValidateKey { .. } => "validate_key",
            Command::Activate => "activate",
            Command::CheckoutMachine { .. } => "checkout_machine",
            Command::ResetLicense { .. } => "reset_license",
            Command::ResetLicenseKey => "reset_license_key",
        }
    }
}
