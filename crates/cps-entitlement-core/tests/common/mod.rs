// crates/cps-entitlement-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for cps-entitlement-core tests.
// Purpose: Provide recording audit sinks, faulty stores, and session builders.
// Dependencies: cps-entitlement-core
// ============================================================================

//! ## Overview
//! Provides shared helpers for entitlement session tests.

#![allow(
    dead_code,
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use cps_entitlement_core::EntitlementAuditSink;
use cps_entitlement_core::EntitlementSession;
use cps_entitlement_core::InMemorySessionStore;
use cps_entitlement_core::SessionKey;
use cps_entitlement_core::SessionParams;
use cps_entitlement_core::SessionStore;
use cps_entitlement_core::StaticCodeValidator;
use cps_entitlement_core::StoragePolicy;
use cps_entitlement_core::StoreError;
use cps_entitlement_core::UserId;
use cps_entitlement_core::runtime::AccessAuditEvent;
use cps_entitlement_core::runtime::FeatureAuditEvent;
use cps_entitlement_core::runtime::StorageAuditEvent;
use cps_entitlement_core::runtime::TierAuditEvent;

/// Access code accepted by sessions built with [`open_session`].
pub const SECRET: &str = "CPS-Advocate-2024";

/// Audit sink that keeps serialized events in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Serialized events in arrival order.
    events: Mutex<Vec<serde_json::Value>>,
}

impl RecordingAuditSink {
    /// Returns the recorded event labels in order.
    pub fn labels(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// Returns all recorded events.
    pub fn events(&self) -> Vec<serde_json::Value> {
        self.events.lock().unwrap().clone()
    }

    /// Appends one serialized event.
    fn push<T: serde::Serialize>(&self, event: &T) {
        self.events.lock().unwrap().push(serde_json::to_value(event).unwrap());
    }
}

impl EntitlementAuditSink for RecordingAuditSink {
    fn record_tier(&self, event: &TierAuditEvent) {
        self.push(event);
    }

    fn record_access(&self, event: &AccessAuditEvent) {
        self.push(event);
    }

    fn record_feature(&self, event: &FeatureAuditEvent) {
        self.push(event);
    }

    fn record_storage(&self, event: &StorageAuditEvent) {
        self.push(event);
    }
}

/// Store wrapper whose reads and writes can be switched to fail.
#[derive(Clone, Default)]
pub struct FlakyStore {
    /// Backing store used while healthy.
    inner: InMemorySessionStore,
    /// Fail every load when set.
    fail_loads: Arc<AtomicBool>,
    /// Fail every save and remove when set.
    fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    /// Creates a healthy store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles load failures.
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Toggles write failures.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the backing store.
    pub fn inner(&self) -> &InMemorySessionStore {
        &self.inner
    }
}

impl SessionStore for FlakyStore {
    fn load(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Io("disk unavailable".to_string()));
        }
        self.inner.load(key)
    }

    fn save(&self, key: SessionKey, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io("disk full".to_string()));
        }
        self.inner.save(key, value)
    }

    fn remove(&self, key: SessionKey) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io("disk full".to_string()));
        }
        self.inner.remove(key)
    }
}

/// Opens a session for `user-1` over `store` with a recording audit sink.
pub fn open_session<S: SessionStore + 'static>(
    store: S,
    policy: StoragePolicy,
) -> (EntitlementSession, Arc<RecordingAuditSink>) {
    try_open_session(store, policy).expect("open session")
}

/// Opens a session, returning any error to the caller.
pub fn try_open_session<S: SessionStore + 'static>(
    store: S,
    policy: StoragePolicy,
) -> Result<(EntitlementSession, Arc<RecordingAuditSink>), cps_entitlement_core::EntitlementError>
{
    let audit = Arc::new(RecordingAuditSink::default());
    let session = EntitlementSession::open(SessionParams {
        user_id: UserId::new("user-1"),
        store: Box::new(store),
        validator: Arc::new(StaticCodeValidator::new(SECRET)),
        audit: audit.clone(),
        policy,
    })?;
    Ok((session, audit))
}
