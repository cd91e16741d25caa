// crates/cps-entitlement-core/src/core/tier.rs
// ============================================================================
// Module: Subscription Tiers
// Description: Closed set of subscription tiers and their stable labels.
// Purpose: Give the rest of the engine a total order over entitlement levels.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`Tier`] is one of five subscription levels ordered by increasing
//! entitlement. The string literals returned by [`Tier::as_str`] are the
//! persisted form and must not change.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Tier
// ============================================================================

/// Subscription tier.
///
/// # Invariants
/// - Variant declaration order is the entitlement order
///   (`Free < Essential < Professional < Attorney < Enterprise`).
/// - Serialized names match the persisted literals exactly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Unpaid tier; the default for new sessions.
    #[default]
    Free,
    /// Entry paid tier.
    Essential,
    /// Paid tier with AI paralegal tooling.
    Professional,
    /// Paid tier for practitioners handling several clients.
    Attorney,
    /// Highest tier; also the effective tier under special access.
    Enterprise,
}

impl Tier {
    /// Every tier in ascending entitlement order.
    pub const ALL: [Self; 5] =
        [Self::Free, Self::Essential, Self::Professional, Self::Attorney, Self::Enterprise];

    /// The maximum entitlement tier.
    pub const MAX: Self = Self::Enterprise;

    /// Returns the persisted literal for the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Essential => "essential",
            Self::Professional => "professional",
            Self::Attorney => "attorney",
            Self::Enterprise => "enterprise",
        }
    }

    /// Returns the display label for the tier.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Essential => "Essential",
            Self::Professional => "Professional",
            Self::Attorney => "Attorney",
            Self::Enterprise => "Enterprise",
        }
    }

    /// Returns true for every tier other than [`Tier::Free`].
    #[must_use]
    pub const fn is_paid(self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the tier literals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == value)
            .ok_or_else(|| UnknownTier(value.to_string()))
    }
}
