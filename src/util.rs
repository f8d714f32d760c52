//! Shared TTL and expiry helpers.

use chrono::{DateTime, Duration, Utc};

use crate::config::CheckoutTtlPolicy;

const SECONDS_PER_DAY: i64 = 86400;

/// Shortest lease a checkout may request (1 hour).
pub const MIN_CHECKOUT_TTL: u64 = 3600;

/// Longest lease a checkout may request (1 year).
pub const MAX_CHECKOUT_TTL: u64 = 31_556_952;

/// Lease length used when the caller doesn't specify one (1 day).
pub const DEFAULT_CHECKOUT_TTL: u64 = 86400;

/// Apply the TTL policy to a requested lease length.
///
/// Under [`CheckoutTtlPolicy::Clamp`] anything outside
/// `MIN_CHECKOUT_TTL..=MAX_CHECKOUT_TTL` is replaced by `MIN_CHECKOUT_TTL`
/// rather than pinned to the nearest bound.
pub fn bound_ttl(ttl_seconds: u64, policy: CheckoutTtlPolicy) -> u64 {
    match policy {
        CheckoutTtlPolicy::Clamp
            if !(MIN_CHECKOUT_TTL..=MAX_CHECKOUT_TTL).contains(&ttl_seconds) =>
        {
            MIN_CHECKOUT_TTL
        }
        _ => ttl_seconds,
    }
}

/// Expiry for a lifetime of `days` starting at `base_time`.
pub fn expiry_from_days(days: Option<i32>, base_time: DateTime<Utc>) -> Option<DateTime<Utc>> {
    days.and_then(|days| {
        Duration::try_seconds(i64::from(days) * SECONDS_PER_DAY)
            .and_then(|lifetime| base_time.checked_add_signed(lifetime))
    })
}

/// Seconds from `now` until `expiry`, floored at zero.
pub fn seconds_until(expiry: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from(expiry.signed_duration_since(now).num_seconds()).unwrap_or(0)
}
