use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Status tokens reported inside a [`License`](super::License).
///
/// These are normal outcomes, not errors. Callers branch on them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseCode {
    Valid,
    NotFound,
    Suspended,
    Expired,
    Overdue,
    NoMachine,
    NoMachines,
    TooManyMachines,
    TooManyCores,
    TooManyProcesses,
    FingerprintScopeMismatch,
    Banned,
    EntitlementsMissing,
    HeartbeatNotStarted,
    HeartbeatDead,
    ProductScopeMismatch,
    PolicyScopeMismatch,
    MachineScopeMismatch,
}

impl LicenseCode {
    /// Key is genuine but this machine isn't bound to it yet.
    pub fn requires_activation(self) -> bool {
        matches!(
            self,
            Self::NoMachine | Self::NoMachines | Self::FingerprintScopeMismatch
        )
    }

    /// Whether `code` is an activation-required token.
    pub fn code_requires_activation(code: &str) -> bool {
        code.parse::<Self>().is_ok_and(Self::requires_activation)
    }
}
