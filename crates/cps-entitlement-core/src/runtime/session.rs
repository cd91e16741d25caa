// crates/cps-entitlement-core/src/runtime/session.rs
// ============================================================================
// Module: Entitlement Session
// Description: Per-user entitlement state with write-through persistence.
// Purpose: Answer "what can this session do right now" and persist changes.
// Dependencies: crate::core, crate::interfaces, crate::runtime::audit
// ============================================================================

//! ## Overview
//! An [`EntitlementSession`] is constructed when a user session starts and
//! dropped when it ends. It rehydrates the stored tier and special-access
//! flag on open, writes every mutation through to its [`SessionStore`], and
//! answers capability queries from an [`Entitlement`].
//!
//! Storage failures follow the configured [`StoragePolicy`]: either the
//! session degrades to in-memory state for the rest of its life, or the error
//! is returned and in-memory state is left untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::CapabilitySnapshot;
use crate::core::Entitlement;
use crate::core::Feature;
use crate::core::FeatureTableError;
use crate::core::Limit;
use crate::core::QuotaDecision;
use crate::core::QuotaMetric;
use crate::core::Tier;
use crate::core::UserId;
use crate::core::validate_feature_table;
use crate::interfaces::CodeValidator;
use crate::interfaces::SPECIAL_ACCESS_GRANTED;
use crate::interfaces::SessionKey;
use crate::interfaces::SessionStore;
use crate::interfaces::StoreError;
use crate::runtime::audit::AccessAuditEvent;
use crate::runtime::audit::EntitlementAuditSink;
use crate::runtime::audit::FeatureAuditEvent;
use crate::runtime::audit::StorageAuditEvent;
use crate::runtime::audit::TierAuditEvent;
use crate::runtime::store::InMemorySessionStore;

// ============================================================================
// SECTION: Policy + Errors
// ============================================================================

/// Behavior when the session store cannot be read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoragePolicy {
    /// Keep serving from in-memory state and stop persisting.
    #[default]
    SessionOnly,
    /// Surface the storage error to the caller.
    Fail,
}

/// Entitlement session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntitlementError {
    /// Session storage failed under [`StoragePolicy::Fail`].
    #[error("entitlement storage failure: {0}")]
    Storage(#[from] StoreError),
    /// The compiled feature table is inconsistent.
    #[error("entitlement feature table invalid: {0}")]
    FeatureTable(#[from] FeatureTableError),
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Inputs required to open a session.
pub struct SessionParams {
    /// Session owner.
    pub user_id: UserId,
    /// Durable storage scoped to the owner.
    pub store: Box<dyn SessionStore>,
    /// Special-access code validator.
    pub validator: Arc<dyn CodeValidator>,
    /// Audit sink.
    pub audit: Arc<dyn EntitlementAuditSink>,
    /// Storage failure policy.
    pub policy: StoragePolicy,
}

/// Entitlement state for one user session.
///
/// # Invariants
/// - Every capability query is answered from [`Entitlement::effective_tier`].
/// - While `persistent` is true, in-memory state matches the store after each
///   successful mutation.
pub struct EntitlementSession {
    /// Session owner.
    user_id: UserId,
    /// Current entitlement.
    entitlement: Entitlement,
    /// Durable storage.
    store: Box<dyn SessionStore>,
    /// Special-access code validator.
    validator: Arc<dyn CodeValidator>,
    /// Audit sink.
    audit: Arc<dyn EntitlementAuditSink>,
    /// Storage failure policy.
    policy: StoragePolicy,
    /// False once the session has degraded to in-memory state.
    persistent: bool,
}

impl EntitlementSession {
    /// Opens a session and rehydrates its persisted state.
    ///
    /// Missing entries fall back to the defaults (`free`, no special access).
    /// Unrecognised stored values also fall back to the defaults and are
    /// reported as `invalid_stored_value` audit events.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::FeatureTable`] when the feature table is
    /// inconsistent, or [`EntitlementError::Storage`] when the store cannot be
    /// read under [`StoragePolicy::Fail`].
    pub fn open(params: SessionParams) -> Result<Self, EntitlementError> {
        validate_feature_table()?;
        let mut session = Self {
            user_id: params.user_id,
            entitlement: Entitlement::default(),
            store: params.store,
            validator: params.validator,
            audit: params.audit,
            policy: params.policy,
            persistent: true,
        };
        match session.rehydrate() {
            Ok(entitlement) => session.entitlement = entitlement,
            Err(err) => match session.policy {
                StoragePolicy::Fail => return Err(err.into()),
                StoragePolicy::SessionOnly => session.degrade(None, "load", &err),
            },
        }
        Ok(session)
    }

    /// Opens a fresh session that never touches durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::FeatureTable`] when the feature table is
    /// inconsistent.
    pub fn session_only(
        user_id: UserId,
        validator: Arc<dyn CodeValidator>,
        audit: Arc<dyn EntitlementAuditSink>,
    ) -> Result<Self, EntitlementError> {
        validate_feature_table()?;
        Ok(Self {
            user_id,
            entitlement: Entitlement::default(),
            store: Box::new(InMemorySessionStore::new()),
            validator,
            audit,
            policy: StoragePolicy::SessionOnly,
            persistent: false,
        })
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Sets the stored tier. Special access, if active, stays active.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::Storage`] when the write fails under
    /// [`StoragePolicy::Fail`]; state is unchanged in that case.
    pub fn set_tier(&mut self, tier: Tier) -> Result<(), EntitlementError> {
        self.write(SessionKey::UserTier, Some(tier.as_str()))?;
        let previous = self.entitlement.stored_tier();
        self.entitlement = self.entitlement.with_tier(tier);
        self.audit.record_tier(&TierAuditEvent::new(
            self.user_id.clone(),
            previous,
            tier,
            self.entitlement.is_overridden(),
        ));
        Ok(())
    }

    /// Checks an access code and grants special access on an exact match.
    ///
    /// A mismatch returns `Ok(false)` and leaves state unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::Storage`] when persisting a granted code
    /// fails under [`StoragePolicy::Fail`]; state is unchanged in that case.
    pub fn check_access_code(&mut self, code: &str) -> Result<bool, EntitlementError> {
        let accepted = self.validator.validate(code);
        if accepted {
            self.write(SessionKey::SpecialAccess, Some(SPECIAL_ACCESS_GRANTED))?;
            self.entitlement = self.entitlement.with_special_access(true);
        }
        self.audit.record_access(&AccessAuditEvent::code_checked(
            self.user_id.clone(),
            accepted,
            code.len(),
            self.entitlement.is_overridden(),
        ));
        Ok(accepted)
    }

    /// Clears special access. The stored tier is not changed.
    ///
    /// # Errors
    ///
    /// Returns [`EntitlementError::Storage`] when the removal fails under
    /// [`StoragePolicy::Fail`]; state is unchanged in that case.
    pub fn remove_special_access(&mut self) -> Result<(), EntitlementError> {
        self.write(SessionKey::SpecialAccess, None)?;
        self.entitlement = self.entitlement.with_special_access(false);
        self.audit.record_access(&AccessAuditEvent::removed(self.user_id.clone()));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Checks a feature by name.
    ///
    /// Unknown names are denied unless special access is active, and are
    /// always reported as `unknown_feature` audit events.
    #[must_use]
    pub fn check_feature_access(&self, feature: &str) -> bool {
        let parsed = feature.parse::<Feature>();
        if parsed.is_err() {
            self.audit.record_feature(&FeatureAuditEvent::unknown(self.user_id.clone(), feature));
        }
        if self.entitlement.is_overridden() {
            return true;
        }
        parsed.is_ok_and(|feature| self.has_feature(feature))
    }

    /// Checks a feature.
    #[must_use]
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.entitlement.has_feature(feature)
    }

    /// Returns the document limit.
    #[must_use]
    pub const fn document_limit(&self) -> Limit {
        self.entitlement.document_limit()
    }

    /// Returns the viewable violation limit.
    #[must_use]
    pub const fn violation_limit(&self) -> Limit {
        self.entitlement.violation_limit()
    }

    /// Returns true when full violation details are visible.
    #[must_use]
    pub const fn can_see_full_violation_details(&self) -> bool {
        self.entitlement.can_see_full_violation_details()
    }

    /// Returns the AI credit allowance.
    #[must_use]
    pub const fn ai_credits_limit(&self) -> u32 {
        self.entitlement.ai_credits_limit()
    }

    /// Evaluates whether one more unit of `metric` may be consumed.
    #[must_use]
    pub const fn check_quota(&self, metric: QuotaMetric, used: u32) -> QuotaDecision {
        self.entitlement.check_quota(metric, used)
    }

    /// Returns the full answer set for UI consumers.
    #[must_use]
    pub fn snapshot(&self) -> CapabilitySnapshot {
        CapabilitySnapshot::from(self.entitlement)
    }

    /// Returns the session owner.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the stored tier.
    #[must_use]
    pub const fn tier(&self) -> Tier {
        self.entitlement.stored_tier()
    }

    /// Returns the tier capability queries are answered for.
    #[must_use]
    pub const fn effective_tier(&self) -> Tier {
        self.entitlement.effective_tier()
    }

    /// Returns true when special access is active.
    #[must_use]
    pub const fn has_special_access(&self) -> bool {
        self.entitlement.is_overridden()
    }

    /// Returns the current entitlement.
    #[must_use]
    pub const fn entitlement(&self) -> Entitlement {
        self.entitlement
    }

    /// Returns false once the session stopped persisting changes.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.persistent
    }

    // ------------------------------------------------------------------------
    // Storage
    // ------------------------------------------------------------------------

    /// Loads persisted state, falling back to defaults for bad values.
    fn rehydrate(&self) -> Result<Entitlement, StoreError> {
        let tier = match self.load_value(SessionKey::UserTier)? {
            None => Tier::default(),
            Some(raw) => raw.parse::<Tier>().unwrap_or_else(|err| {
                self.record_invalid(SessionKey::UserTier, err.to_string());
                Tier::default()
            }),
        };
        let special_access = match self.load_value(SessionKey::SpecialAccess)? {
            None => false,
            Some(raw) if raw == SPECIAL_ACCESS_GRANTED => true,
            Some(_) => {
                self.record_invalid(SessionKey::SpecialAccess, "unrecognised special access value");
                false
            }
        };
        Ok(Entitlement::from_parts(tier, special_access))
    }

    /// Loads one entry; an unreadable value is reported and read as missing.
    fn load_value(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        match self.store.load(key) {
            Err(StoreError::Unreadable(message)) => {
                self.record_invalid(key, message);
                Ok(None)
            }
            other => other,
        }
    }

    /// Records an `invalid_stored_value` event for `key`.
    fn record_invalid(&self, key: SessionKey, message: impl Into<String>) {
        self.audit.record_storage(&StorageAuditEvent::invalid_value(
            self.user_id.clone(),
            key,
            message,
        ));
    }

    /// Writes or removes one entry, applying the storage policy on failure.
    fn write(&mut self, key: SessionKey, value: Option<&str>) -> Result<(), EntitlementError> {
        if !self.persistent {
            return Ok(());
        }
        let (operation, result) = match value {
            Some(value) => ("save", self.store.save(key, value)),
            None => ("remove", self.store.remove(key)),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) => match self.policy {
                StoragePolicy::Fail => Err(err.into()),
                StoragePolicy::SessionOnly => {
                    self.degrade(Some(key), operation, &err);
                    Ok(())
                }
            },
        }
    }

    /// Switches the session to in-memory state and records why.
    fn degrade(&mut self, key: Option<SessionKey>, operation: &'static str, err: &StoreError) {
        self.persistent = false;
        self.audit.record_storage(&StorageAuditEvent::degraded(
            self.user_id.clone(),
            key,
            operation,
            err.to_string(),
        ));
    }
}
