// crates/cps-entitlement-core/src/runtime/validator.rs
// ============================================================================
// Module: Access Code Validators
// Description: Built-in special-access code validators.
// Purpose: Compare presented codes against a configured secret in constant time.
// Dependencies: crate::interfaces, subtle
// ============================================================================

//! ## Overview
//! [`StaticCodeValidator`] accepts exactly one configured secret: the match is
//! byte-for-byte, case-sensitive, and untrimmed. [`DisabledCodeValidator`]
//! rejects everything and is used when no secret is configured.
//!
//! Security posture: the secret is never exposed through `Debug` and is
//! compared in constant time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use subtle::ConstantTimeEq;

use crate::interfaces::CodeValidator;

// ============================================================================
// SECTION: Constant-Time Comparisons
// ============================================================================

/// Compares two byte slices in constant time.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Validator that accepts a single static secret.
#[derive(Clone)]
pub struct StaticCodeValidator {
    /// Secret bytes.
    secret: Vec<u8>,
}

impl StaticCodeValidator {
    /// Creates a validator for `secret`.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into().into_bytes(),
        }
    }
}

impl fmt::Debug for StaticCodeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCodeValidator").field("secret", &"<redacted>").finish()
    }
}

impl CodeValidator for StaticCodeValidator {
    fn validate(&self, code: &str) -> bool {
        constant_time_eq(code.as_bytes(), &self.secret)
    }
}

/// Validator that rejects every code.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCodeValidator;

impl CodeValidator for DisabledCodeValidator {
    fn validate(&self, _code: &str) -> bool {
        false
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
