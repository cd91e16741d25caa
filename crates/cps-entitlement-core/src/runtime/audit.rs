// crates/cps-entitlement-core/src/runtime/audit.rs
// ============================================================================
// Module: Entitlement Audit Logging
// Description: Structured audit events for entitlement state changes.
// Purpose: Emit redacted JSON-line audit logs without hard dependencies.
// Dependencies: crate::core, crate::interfaces, serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines audit event payloads and sinks for entitlement
//! sessions. Events are serialized as one JSON object per line so
//! deployments can route them to their preferred logging pipeline.
//!
//! Security posture: access codes are never recorded; only their length and
//! the accept/reject outcome are.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::Tier;
use crate::core::UserId;
use crate::interfaces::SessionKey;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum number of characters of an unknown feature name kept in events.
const MAX_FEATURE_NAME_CHARS: usize = 64;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Tier change audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct TierAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Session owner.
    pub user_id: UserId,
    /// Stored tier before the change.
    pub previous: Tier,
    /// Stored tier after the change.
    pub tier: Tier,
    /// Whether special access was active at the time.
    pub special_access: bool,
}

impl TierAuditEvent {
    /// Creates a tier change event.
    #[must_use]
    pub fn new(user_id: UserId, previous: Tier, tier: Tier, special_access: bool) -> Self {
        Self {
            event: "tier_changed",
            timestamp_ms: now_millis(),
            user_id,
            previous,
            tier,
            special_access,
        }
    }
}

/// Special-access audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AccessAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Session owner.
    pub user_id: UserId,
    /// Whether special access is active after the action.
    pub special_access: bool,
    /// Whether the presented code was accepted (code checks only).
    pub accepted: Option<bool>,
    /// Length in bytes of the presented code (code checks only).
    pub code_length: Option<usize>,
}

impl AccessAuditEvent {
    /// Creates an access code check event.
    #[must_use]
    pub fn code_checked(
        user_id: UserId,
        accepted: bool,
        code_length: usize,
        special_access: bool,
    ) -> Self {
        Self {
            event: "access_code_checked",
            timestamp_ms: now_millis(),
            user_id,
            special_access,
            accepted: Some(accepted),
            code_length: Some(code_length),
        }
    }

    /// Creates a special-access removal event.
    #[must_use]
    pub fn removed(user_id: UserId) -> Self {
        Self {
            event: "special_access_removed",
            timestamp_ms: now_millis(),
            user_id,
            special_access: false,
            accepted: None,
            code_length: None,
        }
    }
}

/// Unknown feature lookup audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Session owner.
    pub user_id: UserId,
    /// Requested feature name, truncated.
    pub feature: String,
}

impl FeatureAuditEvent {
    /// Creates an unknown feature event.
    #[must_use]
    pub fn unknown(user_id: UserId, feature: &str) -> Self {
        Self {
            event: "unknown_feature",
            timestamp_ms: now_millis(),
            user_id,
            feature: feature.chars().take(MAX_FEATURE_NAME_CHARS).collect(),
        }
    }
}

/// Storage audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct StorageAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Session owner.
    pub user_id: UserId,
    /// Affected key when known.
    pub key: Option<SessionKey>,
    /// Operation label (`load`, `save`, `remove`, `open`).
    pub operation: &'static str,
    /// Failure or validation message.
    pub message: String,
}

impl StorageAuditEvent {
    /// Creates an event for a session falling back to in-memory state.
    #[must_use]
    pub fn degraded(
        user_id: UserId,
        key: Option<SessionKey>,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event: "storage_degraded",
            timestamp_ms: now_millis(),
            user_id,
            key,
            operation,
            message: message.into(),
        }
    }

    /// Creates an event for a stored value that could not be interpreted.
    #[must_use]
    pub fn invalid_value(user_id: UserId, key: SessionKey, message: impl Into<String>) -> Self {
        Self {
            event: "invalid_stored_value",
            timestamp_ms: now_millis(),
            user_id,
            key: Some(key),
            operation: "load",
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for entitlement events.
pub trait EntitlementAuditSink: Send + Sync {
    /// Record a tier change event.
    fn record_tier(&self, event: &TierAuditEvent);

    /// Record a special-access event.
    fn record_access(&self, _event: &AccessAuditEvent) {}

    /// Record an unknown feature lookup.
    fn record_feature(&self, _event: &FeatureAuditEvent) {}

    /// Record a storage event.
    fn record_storage(&self, _event: &StorageAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl EntitlementAuditSink for StderrAuditSink {
    fn record_tier(&self, event: &TierAuditEvent) {
        write_stderr(event);
    }

    fn record_access(&self, event: &AccessAuditEvent) {
        write_stderr(event);
    }

    fn record_feature(&self, event: &FeatureAuditEvent) {
        write_stderr(event);
    }

    fn record_storage(&self, event: &StorageAuditEvent) {
        write_stderr(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl EntitlementAuditSink for FileAuditSink {
    fn record_tier(&self, event: &TierAuditEvent) {
        self.append(event);
    }

    fn record_access(&self, event: &AccessAuditEvent) {
        self.append(event);
    }

    fn record_feature(&self, event: &FeatureAuditEvent) {
        self.append(event);
    }

    fn record_storage(&self, event: &StorageAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl EntitlementAuditSink for NoopAuditSink {
    fn record_tier(&self, _event: &TierAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current unix epoch in milliseconds.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Writes one serialized event to stderr.
fn write_stderr<T: Serialize>(event: &T) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(std::io::stderr(), "{payload}");
    }
}
