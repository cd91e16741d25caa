// crates/cps-entitlement-config/src/runtime.rs
// ============================================================================
// Module: Entitlement Runtime Wiring
// Description: Builds stores, validators, and audit sinks from config.
// Purpose: Open entitlement sessions from a validated configuration.
// Dependencies: cps-entitlement-core, cps-entitlement-store-sqlite
// ============================================================================

//! ## Overview
//! [`EntitlementRuntime`] is built once per process from an
//! [`EntitlementConfig`] and hands out one [`EntitlementSession`] per user
//! session. The runtime owns the shared store so every session for the same
//! user sees the same persisted state.
//!
//! When the `SQLite` database cannot be opened and
//! `storage.on_unavailable = "session_only"`, the runtime still starts; every
//! session it opens is session-only and records a `storage_degraded` event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use cps_entitlement_core::CodeValidator;
use cps_entitlement_core::DisabledCodeValidator;
use cps_entitlement_core::EntitlementAuditSink;
use cps_entitlement_core::EntitlementError;
use cps_entitlement_core::EntitlementSession;
use cps_entitlement_core::InMemorySessionStore;
use cps_entitlement_core::NoopAuditSink;
use cps_entitlement_core::SessionParams;
use cps_entitlement_core::SessionStore;
use cps_entitlement_core::StaticCodeValidator;
use cps_entitlement_core::StoragePolicy;
use cps_entitlement_core::UserId;
use cps_entitlement_core::runtime::FileAuditSink;
use cps_entitlement_core::runtime::StderrAuditSink;
use cps_entitlement_core::runtime::StorageAuditEvent;
use cps_entitlement_store_sqlite::SqliteSessionStore;
use thiserror::Error;

use crate::config::AuditConfig;
use crate::config::AuditSinkKind;
use crate::config::ConfigError;
use crate::config::EntitlementConfig;
use crate::config::StorageBackend;
use crate::config::StorageConfig;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building a runtime or opening a session.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration could not be applied.
    #[error("entitlement runtime config error: {0}")]
    Config(#[from] ConfigError),
    /// Durable storage could not be opened under the fail policy.
    #[error("entitlement runtime storage unavailable: {0}")]
    Storage(String),
    /// The session could not be opened.
    #[error("entitlement runtime session error: {0}")]
    Session(#[from] EntitlementError),
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Backing storage shared by every session the runtime opens.
enum RuntimeStorage {
    /// Process-local stores keyed by user. Entries live until evicted or
    /// until the runtime is dropped.
    Memory(Mutex<BTreeMap<UserId, InMemorySessionStore>>),
    /// Durable `SQLite` store.
    Sqlite(SqliteSessionStore),
    /// Durable storage failed to open; sessions run session-only.
    Unavailable(String),
}

/// Process-wide entitlement wiring built from configuration.
pub struct EntitlementRuntime {
    /// Shared session storage.
    storage: RuntimeStorage,
    /// Special-access code validator.
    validator: Arc<dyn CodeValidator>,
    /// Audit sink.
    audit: Arc<dyn EntitlementAuditSink>,
    /// Storage failure policy.
    policy: StoragePolicy,
}

impl EntitlementRuntime {
    /// Builds a runtime from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] when the access-code secret cannot be
    /// resolved or the audit log cannot be opened, and
    /// [`RuntimeError::Storage`] when the database cannot be opened under
    /// [`StoragePolicy::Fail`].
    pub fn from_config(config: &EntitlementConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let validator: Arc<dyn CodeValidator> = match config.access_code.resolve_secret()? {
            Some(secret) => Arc::new(StaticCodeValidator::new(secret)),
            None => Arc::new(DisabledCodeValidator),
        };
        Ok(Self {
            storage: build_storage(&config.storage)?,
            validator,
            audit: build_audit_sink(&config.audit)?,
            policy: config.storage.on_unavailable,
        })
    }

    /// Replaces the audit sink used for sessions opened afterwards.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn EntitlementAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns true when sessions persist beyond the process.
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        matches!(self.storage, RuntimeStorage::Sqlite(_))
    }

    /// Opens a session for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Session`] when the session cannot be opened.
    pub fn open_session(&self, user_id: UserId) -> Result<EntitlementSession, RuntimeError> {
        let store: Box<dyn SessionStore> = match &self.storage {
            RuntimeStorage::Memory(stores) => {
                let mut stores = stores.lock().unwrap_or_else(PoisonError::into_inner);
                Box::new(stores.entry(user_id.clone()).or_default().clone())
            }
            RuntimeStorage::Sqlite(store) => Box::new(store.for_user(user_id.clone())),
            RuntimeStorage::Unavailable(message) => {
                let session = EntitlementSession::session_only(
                    user_id.clone(),
                    Arc::clone(&self.validator),
                    Arc::clone(&self.audit),
                )?;
                self.audit.record_storage(&StorageAuditEvent::degraded(
                    user_id,
                    None,
                    "open",
                    message.clone(),
                ));
                return Ok(session);
            }
        };
        let session = EntitlementSession::open(SessionParams {
            user_id,
            store,
            validator: Arc::clone(&self.validator),
            audit: Arc::clone(&self.audit),
            policy: self.policy,
        })?;
        Ok(session)
    }

    /// Drops the process-local state held for `user_id`.
    ///
    /// The memory backend keeps one store per user ever opened; long-lived
    /// processes call this when a user signs out. Sessions already open keep
    /// their handle. Durable and unavailable backends hold no per-user state,
    /// so this returns false for them.
    #[must_use]
    pub fn evict_user(&self, user_id: &UserId) -> bool {
        match &self.storage {
            RuntimeStorage::Memory(stores) => {
                stores.lock().unwrap_or_else(PoisonError::into_inner).remove(user_id).is_some()
            }
            RuntimeStorage::Sqlite(_) | RuntimeStorage::Unavailable(_) => false,
        }
    }
}

impl EntitlementConfig {
    /// Builds a one-off runtime and opens a session for `user_id`.
    ///
    /// Processes serving many sessions should build one
    /// [`EntitlementRuntime`] and reuse it instead.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the runtime cannot be built or the
    /// session cannot be opened.
    pub fn open_session(&self, user_id: UserId) -> Result<EntitlementSession, RuntimeError> {
        EntitlementRuntime::from_config(self)?.open_session(user_id)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens the configured storage backend, applying the failure policy.
fn build_storage(config: &StorageConfig) -> Result<RuntimeStorage, RuntimeError> {
    match config.backend {
        StorageBackend::Memory => Ok(RuntimeStorage::Memory(Mutex::new(BTreeMap::new()))),
        StorageBackend::Sqlite => {
            let sqlite = config.sqlite_config().ok_or_else(|| {
                ConfigError::Invalid("sqlite storage requires path".to_string())
            })?;
            match SqliteSessionStore::new(&sqlite) {
                Ok(store) => Ok(RuntimeStorage::Sqlite(store)),
                Err(err) => match config.on_unavailable {
                    StoragePolicy::Fail => Err(RuntimeError::Storage(err.to_string())),
                    StoragePolicy::SessionOnly => Ok(RuntimeStorage::Unavailable(err.to_string())),
                },
            }
        }
    }
}

/// Builds the configured audit sink.
fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn EntitlementAuditSink>, ConfigError> {
    match (config.sink, &config.path) {
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkKind::File, Some(path)) => {
            let sink = FileAuditSink::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
            Ok(Arc::new(sink))
        }
        (AuditSinkKind::File, None) => {
            Err(ConfigError::Invalid("file audit sink requires path".to_string()))
        }
    }
}
