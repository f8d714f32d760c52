//! Error types and the failure normalizer.
//!
//! Every backend call fails with a [`Failure`]. Before anything reaches a
//! caller it is folded into a [`LicenseError`], which always carries a
//! switchable `code`. Failures that don't look like `{code, detail}` get the
//! [`UNKNOWN_CODE`] sentinel.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Code used when a failure carries no recognizable `{code, detail}` pair.
pub const UNKNOWN_CODE: &str = "unknown";

/// Error surfaced by every license operation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("license error: {code}: {detail}")]
pub struct LicenseError {
    /// Stable, machine-readable code
    pub code: String,
    /// Human-readable explanation
    pub detail: String,
}

impl LicenseError {
    /// Create a new error
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
        }
    }

    /// Create an error with the `unknown` code
    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::new(UNKNOWN_CODE, detail)
    }

    /// Check if this error carries the `unknown` code
    pub fn is_unknown(&self) -> bool {
        self.code == UNKNOWN_CODE
    }

    /// Build an error from an arbitrary failure value.
    ///
    /// The value is serialized and duck-checked for string `code` and
    /// `detail` fields. Anything else becomes an `unknown` error whose detail
    /// is the best message we can extract. Never panics, including when the
    /// value refuses to serialize.
    pub fn from_unknown<T: Serialize + Debug + ?Sized>(failure: &T) -> Self {
        match serde_json::to_value(failure) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Self::unknown(format!("{failure:?}")),
        }
    }

    fn from_value(value: &Value) -> Self {
        if let Some((code, detail)) = coded_fields(value) {
            return Self::new(code, detail);
        }
        Self::unknown(best_effort_message(value))
    }
}

/// Failure raised by a backend call, before normalization.
#[derive(Debug, Error)]
pub enum Failure {
    /// The backend answered with a failure payload
    #[error("backend rejected the call: {0}")]
    Rejected(Value),

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Failure {
    /// Shorthand for a `{code, detail}` rejection payload.
    pub fn rejected(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Rejected(serde_json::json!({
            "code": code.into(),
            "detail": detail.into(),
        }))
    }
}

/// Fold any backend failure into a [`LicenseError`].
pub fn normalize(failure: &Failure) -> LicenseError {
    match failure {
        Failure::Rejected(value) => LicenseError::from_value(value),
        other => LicenseError::unknown(other.to_string()),
    }
}

impl From<Failure> for LicenseError {
    fn from(failure: Failure) -> Self {
        normalize(&failure)
    }
}

/// Whether `value` exposes both `code` and `detail` as strings.
pub fn is_coded_error(value: &Value) -> bool {
    coded_fields(value).is_some()
}

fn coded_fields(value: &Value) -> Option<(&str, &str)> {
    let code = value.get("code")?.as_str()?;
    let detail = value.get("detail")?.as_str()?;
    Some((code, detail))
}

/// Extract a readable message from an unknown failure value.
///
/// Strings are used as-is, objects with a string `message` yield that
/// message, and everything else is rendered as JSON.
pub fn best_effort_message(value: &Value) -> String {
    if let Value::String(s) = value {
        return s.clone();
    }
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

/// Result type for license operations
pub type Result<T> = std::result::Result<T, LicenseError>;
