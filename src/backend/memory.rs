//! In-process license backend.
//!
//! Simulates what a real backend does for the host: evaluates keys against
//! stored license records, binds machines, issues checkout leases and keeps
//! the current key and license between calls. Useful for tests, demos and
//! the CLI.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::Backend;
use crate::config::Config;
use crate::error::Failure;
use crate::models::{
    Command, ExpirationBasis, Lease, License, LicenseCode, LicenseRecord, Machine,
};
use crate::util::{expiry_from_days, seconds_until};

/// Licenses and machine identity loaded from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub machine_name: Option<String>,
    #[serde(default)]
    pub licenses: Vec<LicenseRecord>,
}

impl Fixture {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Failure> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Replace the fixture's fingerprint when an explicit one is given.
    pub fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        if let Some(fingerprint) = fingerprint {
            self.fingerprint = Some(fingerprint);
        }
        self
    }
}

/// Oldest commands are dropped once the call log reaches this size.
pub const CALL_LOG_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct CachedResponse {
    license: License,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    records: HashMap<String, LicenseRecord>,
    current_key: Option<String>,
    current_license: Option<License>,
    response_cache: HashMap<String, CachedResponse>,
    leases: Vec<Lease>,
    calls: VecDeque<Command>,
    scripted: HashMap<String, VecDeque<Failure>>,
    offline: bool,
}

pub struct MemoryBackend {
    fingerprint: String,
    machine_name: Option<String>,
    platform: String,
    cache_lifetime: Duration,
    state: Mutex<State>,
}

impl MemoryBackend {
    /// Create an empty backend presenting `fingerprint` as this machine.
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            machine_name: None,
            platform: format!("{} - {}", std::env::consts::OS, std::env::consts::ARCH),
            cache_lifetime: Duration::days(1),
            state: Mutex::new(State::default()),
        }
    }

    /// Build from a fixture, falling back to the configured fingerprint.
    pub fn from_fixture(fixture: Fixture, config: &Config) -> Self {
        let fingerprint = fixture
            .fingerprint
            .unwrap_or_else(|| config.fingerprint.clone());

        let mut backend = Self::new(fingerprint)
            .with_cache_lifetime(
                Duration::try_minutes(config.cache_lifetime_minutes).unwrap_or(Duration::days(1)),
            )
            .with_records(fixture.licenses);
        backend.machine_name = fixture.machine_name;
        backend
    }

    pub fn with_records(mut self, records: impl IntoIterator<Item = LicenseRecord>) -> Self {
        let state = self.state.get_mut();
        for record in records {
            state.records.insert(record.key.clone(), record);
        }
        self
    }

    pub fn with_cache_lifetime(mut self, lifetime: Duration) -> Self {
        self.cache_lifetime = lifetime;
        self
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub async fn insert(&self, record: LicenseRecord) {
        let mut state = self.state.lock().await;
        state.records.insert(record.key.clone(), record);
    }

    pub async fn record(&self, key: &str) -> Option<LicenseRecord> {
        self.state.lock().await.records.get(key).cloned()
    }

    /// While offline, validation is answered from the response cache only.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Make the next call of `command` (e.g. `"activate"`) fail with `failure`.
    pub async fn fail_next(&self, command: &str, failure: Failure) {
        let mut state = self.state.lock().await;
        state
            .scripted
            .entry(command.to_string())
            .or_default()
            .push_back(failure);
    }

    /// Commands received, oldest first. Holds at most [`CALL_LOG_CAPACITY`].
    pub async fn calls(&self) -> Vec<Command> {
        self.state.lock().await.calls.iter().cloned().collect()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn call_count(&self, command: &str) -> usize {
        let state = self.state.lock().await;
        state.calls.iter().filter(|c| c.name() == command).count()
    }

    pub async fn leases(&self) -> Vec<Lease> {
        self.state.lock().await.leases.clone()
    }

    pub async fn cached_responses(&self) -> usize {
        self.state.lock().await.response_cache.len()
    }

    fn validate_key(
        &self,
        state: &mut State,
        key: &str,
        entitlements: &BTreeSet<String>,
        cache_valid_response: bool,
    ) -> Result<Value, Failure> {
        let key = key.trim_end();
        let cache_key = response_cache_key(key, entitlements);
        let now = Utc::now();

        if state.offline {
            let view: &State = state;
            let license = self
                .cached_response(view, &cache_key, now)
                .or_else(|| self.leased_license(view, key, entitlements, now))
                .ok_or_else(offline_failure)?;
            return self.remember(state, license);
        }

        let record = state
            .records
            .get(key)
            .ok_or_else(|| Failure::rejected(LicenseCode::NotFound.as_ref(), "does not exist"))?;

        let (code, detail, valid) = evaluate(record, &self.fingerprint, entitlements, now);
        let license = License {
            key: record.key.clone(),
            code: code.to_string(),
            detail: detail.to_string(),
            expiry: record.expires_at,
            valid,
            policy_id: record.policy_id.clone(),
            entitlements: record.entitlements.clone(),
            metadata: record.metadata.clone(),
        };

        if cache_valid_response && license.valid && license.expiry.is_some() {
            state.response_cache.insert(
                cache_key,
                CachedResponse {
                    license: license.clone(),
                    cached_at: now,
                },
            );
        }

        self.remember(state, license)
    }

    fn cached_response(&self, state: &State, cache_key: &str, now: DateTime<Utc>) -> Option<License> {
        let cached = state
            .response_cache
            .get(cache_key)
            .filter(|c| now.signed_duration_since(c.cached_at) < self.cache_lifetime)?;

        tracing::debug!(key = %cached.license.key, "answering validation from response cache");
        Some(cached.license.clone())
    }

    /// A valid license backed by a live lease checked out on this machine.
    fn leased_license(
        &self,
        state: &State,
        key: &str,
        entitlements: &BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Option<License> {
        let lease = state
            .leases
            .iter()
            .rev()
            .find(|lease| lease.key == key && lease.is_live(&self.fingerprint, now))?;

        let record = state.records.get(key)?;
        if !entitlements.is_subset(&record.entitlements) {
            return None;
        }

        tracing::debug!(key = %key, lease_id = %lease.id, "answering validation from checkout lease");
        Some(License {
            key: record.key.clone(),
            code: LicenseCode::Valid.to_string(),
            detail: "is valid".to_string(),
            expiry: record.expires_at,
            valid: true,
            policy_id: record.policy_id.clone(),
            entitlements: record.entitlements.clone(),
            metadata: record.metadata.clone(),
        })
    }

    fn remember(&self, state: &mut State, license: License) -> Result<Value, Failure> {
        let value = serde_json::to_value(&license)?;
        state.current_key = Some(license.key.clone());
        state.current_license = Some(license);
        Ok(value)
    }

    fn activate(&self, state: &mut State) -> Result<Value, Failure> {
        if state.offline {
            return Err(offline_failure());
        }

        let license = state.current_license.as_ref().ok_or_else(|| {
            Failure::rejected(
                "NO_LICENSE",
                "Can't activate a machine. No license is loaded. Validate a key first.",
            )
        })?;

        if self.fingerprint.is_empty() {
            return Err(Failure::rejected(
                "NO_FINGERPRINT",
                "Can't activate this machine. Machine fingerprint is empty",
            ));
        }

        let record = state
            .records
            .get_mut(&license.key)
            .ok_or_else(|| Failure::rejected(LicenseCode::NotFound.as_ref(), "does not exist"))?;

        if record.is_bound_to(&self.fingerprint) {
            return Err(Failure::rejected("FINGERPRINT_TAKEN", "has already been taken"));
        }

        let machine_count = record.machines.len();
        if record.machine_limit > 0 && machine_count >= record.machine_limit as usize {
            return Err(Failure::rejected(
                "MACHINE_LIMIT_EXCEEDED",
                format!(
                    "machine count has exceeded maximum allowed by current policy ({}/{})",
                    machine_count, record.machine_limit
                ),
            ));
        }

        let now = Utc::now();
        let machine = Machine {
            id: Uuid::new_v4().to_string(),
            fingerprint: self.fingerprint.clone(),
            name: self.machine_name.clone(),
            platform: Some(self.platform.clone()),
            activated_at: now.timestamp(),
        };
        record.machines.push(machine.clone());

        if record.expiration_basis == ExpirationBasis::FromFirstActivation
            && record.expires_at.is_none()
        {
            record.expires_at = expiry_from_days(record.duration_days, now);
        }

        tracing::info!(
            key = %record.key,
            machine_id = %machine.id,
            machines = record.machines.len(),
            "machine activated"
        );

        Ok(serde_json::to_value(&machine)?)
    }

    fn checkout(&self, state: &mut State, ttl_seconds: u64, ttl_forever: bool) -> Result<Value, Failure> {
        if state.offline {
            return Err(offline_failure());
        }

        let license = state.current_license.as_ref().ok_or_else(|| {
            Failure::rejected(
                "NO_LICENSE",
                "Can't checkout machine file. No license is loaded. Validate a key first.",
            )
        })?;

        if !license.valid {
            return Err(Failure::rejected(
                "INVALID_LICENSE",
                "Can't checkout machine file. Current license is invalid",
            ));
        }

        let Some(expiry) = license.expiry else {
            return Err(Failure::rejected(
                "NOT_ACTIVATED",
                "Can't checkout machine file. License hasn't been fully activated. Expiry still null",
            ));
        };

        let now = Utc::now();
        // a lease never outlives the license unless it is meant to last forever
        let expires_at = if ttl_forever || license.should_maintain_access() {
            None
        } else {
            let ttl = i64::try_from(ttl_seconds.min(seconds_until(expiry, now))).unwrap_or(i64::MAX);
            Some(
                Duration::try_seconds(ttl)
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .unwrap_or(expiry),
            )
        };

        let lease = Lease {
            id: Uuid::new_v4().to_string(),
            key: license.key.clone(),
            fingerprint: self.fingerprint.clone(),
            issued_at: now,
            expires_at,
        };

        tracing::info!(key = %lease.key, expires_at = ?lease.expires_at, "machine checked out");
        state.leases.push(lease);

        Ok(Value::Null)
    }

    fn reset_license(&self, state: &mut State, hard_reset: bool) {
        let license = state.current_license.take();
        if !hard_reset {
            return;
        }

        // a prior soft reset leaves only the stored key to go on
        let Some(key) = license.map(|l| l.key).or_else(|| state.current_key.clone()) else {
            return;
        };
        state.response_cache.retain(|_, cached| cached.license.key != key);
        state.leases.retain(|lease| lease.key != key);
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn invoke(&self, command: Command) -> Result<Value, Failure> {
        let mut state = self.state.lock().await;
        if state.calls.len() >= CALL_LOG_CAPACITY {
            state.calls.pop_front();
        }
        state.calls.push_back(command.clone());
        tracing::debug!(command = command.name(), "memory backend call");

        if let Some(failure) = state
            .scripted
            .get_mut(command.name())
            .and_then(VecDeque::pop_front)
        {
            return Err(failure);
        }

        match command {
            Command::GetLicense => Ok(serde_json::to_value(&state.current_license)?),
            Command::GetLicenseKey => Ok(serde_json::to_value(&state.current_key)?),
            Command::ValidateKey {
                key,
                entitlements,
                cache_valid_response,
            } => self.validate_key(&mut state, &key, &entitlements, cache_valid_response),
            Command::Activate => self.activate(&mut state),
            Command::CheckoutMachine {
                ttl_seconds,
                ttl_forever,
            } => self.checkout(&mut state, ttl_seconds, ttl_forever),
            Command::ResetLicense { hard_reset } => {
                self.reset_license(&mut state, hard_reset);
                Ok(Value::Null)
            }
            Command::ResetLicenseKey => {
                state.current_key = None;
                Ok(Value::Null)
            }
        }
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("fingerprint", &self.fingerprint)
            .field("cache_lifetime", &self.cache_lifetime)
            .finish()
    }
}

/// Status of `record` as seen from the machine `fingerprint`.
fn evaluate(
    record: &LicenseRecord,
    fingerprint: &str,
    entitlements: &BTreeSet<String>,
    now: DateTime<Utc>,
) -> (LicenseCode, &'static str, bool) {
    if record.banned {
        return (LicenseCode::Banned, "is banned", false);
    }

    if record.suspended {
        return (LicenseCode::Suspended, "is suspended", false);
    }

    let expired = record.expires_at.is_some_and(|exp| exp <= now);
    if expired && !record.maintain_access {
        return (LicenseCode::Expired, "is expired", false);
    }

    if record.overdue {
        return (LicenseCode::Overdue, "is overdue", false);
    }

    if !entitlements.is_subset(&record.entitlements) {
        return (
            LicenseCode::EntitlementsMissing,
            "is missing one or more required entitlements",
            false,
        );
    }

    if record.machine_limit > 0 && record.machines.len() > record.machine_limit as usize {
        return (
            LicenseCode::TooManyMachines,
            "has too many associated machines",
            false,
        );
    }

    if record.machines.is_empty() {
        return if record.floating {
            (LicenseCode::NoMachines, "has no associated machines", false)
        } else {
            (LicenseCode::NoMachine, "has no associated machine", false)
        };
    }

    if !record.is_bound_to(fingerprint) {
        return (
            LicenseCode::FingerprintScopeMismatch,
            "fingerprint is not activated (does not match any associated machines)",
            false,
        );
    }

    if expired {
        return (LicenseCode::Expired, "is expired", true);
    }

    (LicenseCode::Valid, "is valid", true)
}

fn response_cache_key(key: &str, entitlements: &BTreeSet<String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    for entitlement in entitlements {
        hasher.update(b":");
        hasher.update(entitlement.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn offline_failure() -> Failure {
    Failure::rejected(
        "REQUEST_ERROR",
        "Failed sending request: Check your internet",
    )
}
