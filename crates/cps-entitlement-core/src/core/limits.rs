// crates/cps-entitlement-core/src/core/limits.rs
// ============================================================================
// Module: Numeric Limits
// Description: Per-tier document, violation, and AI credit limits.
// Purpose: Keep every numeric entitlement in one table keyed by tier.
// Dependencies: crate::core::tier, serde
// ============================================================================

//! ## Overview
//! Numeric limits are pure functions of a [`Tier`]. Callers resolve the
//! effective tier first (see [`crate::Entitlement::effective_tier`]) so the
//! special-access override never has to be re-applied here.
//!
//! The free-tier document limit is 1. Product copy elsewhere has advertised a
//! different number; display text must come from [`crate::PlanSummary`] so the
//! two cannot drift silently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de;

use crate::core::tier::Tier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Documents a free-tier session may analyse.
pub const FREE_DOCUMENT_LIMIT: u32 = 1;
/// Documents an essential-tier session may analyse.
pub const ESSENTIAL_DOCUMENT_LIMIT: u32 = 25;
/// Violations a free-tier session may view.
pub const FREE_VIOLATION_LIMIT: u32 = 5;
/// AI credits granted at the maximum tier and under special access.
pub const MAX_AI_CREDITS: u32 = 2_000;
/// Serialized label for [`Limit::Unlimited`].
const UNLIMITED_LABEL: &str = "unlimited";

// ============================================================================
// SECTION: Limit
// ============================================================================

/// A count limit that may be unbounded.
///
/// # Invariants
/// - Serializes as a JSON integer or the string `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    /// At most this many units.
    Finite(u32),
    /// No upper bound.
    Unlimited,
}

impl Limit {
    /// Returns true when one more unit may be consumed after `used` units.
    #[must_use]
    pub const fn allows(self, used: u32) -> bool {
        match self {
            Self::Finite(max) => used < max,
            Self::Unlimited => true,
        }
    }

    /// Returns the finite bound, or `None` when unlimited.
    #[must_use]
    pub const fn as_finite(self) -> Option<u32> {
        match self {
            Self::Finite(max) => Some(max),
            Self::Unlimited => None,
        }
    }

    /// Returns true for [`Limit::Unlimited`].
    #[must_use]
    pub const fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(max) => max.fmt(f),
            Self::Unlimited => f.write_str(UNLIMITED_LABEL),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(max) => serializer.serialize_u32(*max),
            Self::Unlimited => serializer.serialize_str(UNLIMITED_LABEL),
        }
    }
}

/// Wire representation accepted when deserializing a [`Limit`].
#[derive(Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    /// Numeric bound.
    Count(u32),
    /// Textual label; only `"unlimited"` is accepted.
    Label(String),
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match LimitRepr::deserialize(deserializer)? {
            LimitRepr::Count(max) => Ok(Self::Finite(max)),
            LimitRepr::Label(label) if label == UNLIMITED_LABEL => Ok(Self::Unlimited),
            LimitRepr::Label(label) => {
                Err(de::Error::custom(format!("invalid limit label: {label}")))
            }
        }
    }
}

// ============================================================================
// SECTION: Tier Tables
// ============================================================================

/// Returns the document limit for a tier.
#[must_use]
pub const fn document_limit(tier: Tier) -> Limit {
    match tier {
        Tier::Free => Limit::Finite(FREE_DOCUMENT_LIMIT),
        Tier::Essential => Limit::Finite(ESSENTIAL_DOCUMENT_LIMIT),
        Tier::Professional | Tier::Attorney | Tier::Enterprise => Limit::Unlimited,
    }
}

/// Returns the viewable violation limit for a tier.
#[must_use]
pub const fn violation_limit(tier: Tier) -> Limit {
    match tier {
        Tier::Free => Limit::Finite(FREE_VIOLATION_LIMIT),
        Tier::Essential | Tier::Professional | Tier::Attorney | Tier::Enterprise => {
            Limit::Unlimited
        }
    }
}

/// Returns the AI credit allowance for a tier.
#[must_use]
pub const fn ai_credits(tier: Tier) -> u32 {
    match tier {
        Tier::Free => 0,
        Tier::Essential => 25,
        Tier::Professional => 100,
        Tier::Attorney => 500,
        Tier::Enterprise => MAX_AI_CREDITS,
    }
}

/// Returns true when the tier may see full violation details.
#[must_use]
pub const fn full_violation_details(tier: Tier) -> bool {
    tier.is_paid()
}
