// crates/cps-entitlement-core/src/interfaces/mod.rs
// ============================================================================
// Module: Entitlement Interfaces
// Description: Backend-agnostic seams for session storage and code validation.
// Purpose: Define the contract surfaces used by the entitlement runtime.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces describe how a session persists its state and how access codes
//! are verified, without embedding backend details. Stored values are
//! untrusted; the runtime fails closed on anything it cannot parse.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Session Keys
// ============================================================================

/// Persisted session entry keys.
///
/// # Invariants
/// - [`SessionKey::as_str`] values are the on-disk key names and must match
///   existing stored sessions byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SessionKey {
    /// Stored subscription tier literal.
    #[serde(rename = "cps_user_tier")]
    UserTier,
    /// Special-access sentinel.
    #[serde(rename = "cps_special_access")]
    SpecialAccess,
}

impl SessionKey {
    /// Every persisted key.
    pub const ALL: [Self; 2] = [Self::UserTier, Self::SpecialAccess];

    /// Returns the storage key name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserTier => "cps_user_tier",
            Self::SpecialAccess => "cps_special_access",
        }
    }

    /// Parses a storage key name.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == key)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value stored under [`SessionKey::SpecialAccess`] while access is granted.
pub const SPECIAL_ACCESS_GRANTED: &str = "granted";

// ============================================================================
// SECTION: Session Store
// ============================================================================

/// Session store errors.
///
/// # Invariants
/// - Error messages never embed stored secrets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("session store io error: {0}")]
    Io(String),
    /// Store backend error.
    #[error("session store error: {0}")]
    Store(String),
    /// Store corruption detected.
    #[error("session store corruption: {0}")]
    Corrupt(String),
    /// Invalid store data or request.
    #[error("session store invalid data: {0}")]
    Invalid(String),
    /// A stored value exists but cannot be returned, for example because it
    /// exceeds the backend size limit. Readers treat it as unrecognised.
    #[error("session store unreadable value: {0}")]
    Unreadable(String),
}

/// Durable key/value storage for one user's session entries.
///
/// Implementations are scoped to a single user; concurrent writers from other
/// processes are last-writer-wins.
pub trait SessionStore: Send + Sync {
    /// Loads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read, or
    /// [`StoreError::Unreadable`] when the entry exists but its value cannot
    /// be returned.
    fn load(&self, key: SessionKey) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be written.
    fn save(&self, key: SessionKey, value: &str) -> Result<(), StoreError>;

    /// Removes the value stored under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be written.
    fn remove(&self, key: SessionKey) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Code Validator
// ============================================================================

/// Verifies special-access codes.
///
/// The session only asks whether a presented code is valid; issuance,
/// expiry, and per-user binding belong to the implementation.
pub trait CodeValidator: Send + Sync {
    /// Returns true when `code` grants special access.
    fn validate(&self, code: &str) -> bool;
}
