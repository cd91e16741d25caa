// crates/cps-entitlement-core/src/core/entitlement.rs
// ============================================================================
// Module: Entitlement State
// Description: Tier plus special-access override as a single sum type.
// Purpose: Make the override a structural property of every capability query.
// Dependencies: crate::core::{feature, limits, tier}, serde
// ============================================================================

//! ## Overview
//! An [`Entitlement`] is either a plain tier or a tier overridden by special
//! access. All capability answers are computed from
//! [`Entitlement::effective_tier`], which is [`Tier::MAX`] whenever the
//! override is active, so the override cannot be forgotten by a query.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::feature::Feature;
use crate::core::limits;
use crate::core::limits::Limit;
use crate::core::tier::Tier;

// ============================================================================
// SECTION: Entitlement
// ============================================================================

/// Current entitlement of a session.
///
/// # Invariants
/// - `Overridden` always resolves to [`Tier::MAX`] for capability queries.
/// - The stored tier is retained under the override so removing special
///   access restores it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entitlement {
    /// Entitlement granted by the stored tier alone.
    Tier {
        /// Stored subscription tier.
        tier: Tier,
    },
    /// Special access is active; the stored tier is kept but not consulted.
    Overridden {
        /// Stored subscription tier.
        stored: Tier,
    },
}

impl Default for Entitlement {
    fn default() -> Self {
        Self::Tier {
            tier: Tier::default(),
        }
    }
}

impl Entitlement {
    /// Builds an entitlement from its two persisted components.
    #[must_use]
    pub const fn from_parts(tier: Tier, special_access: bool) -> Self {
        if special_access {
            Self::Overridden {
                stored: tier,
            }
        } else {
            Self::Tier {
                tier,
            }
        }
    }

    /// Returns the stored tier regardless of override.
    #[must_use]
    pub const fn stored_tier(self) -> Tier {
        match self {
            Self::Tier {
                tier,
            }
            | Self::Overridden {
                stored: tier,
            } => tier,
        }
    }

    /// Returns the tier every capability query is answered for.
    #[must_use]
    pub const fn effective_tier(self) -> Tier {
        match self {
            Self::Tier {
                tier,
            } => tier,
            Self::Overridden {
                ..
            } => Tier::MAX,
        }
    }

    /// Returns true when special access is active.
    #[must_use]
    pub const fn is_overridden(self) -> bool {
        matches!(self, Self::Overridden { .. })
    }

    /// Returns this entitlement with a new stored tier, keeping any override.
    #[must_use]
    pub const fn with_tier(self, tier: Tier) -> Self {
        Self::from_parts(tier, self.is_overridden())
    }

    /// Returns this entitlement with special access set or cleared.
    #[must_use]
    pub const fn with_special_access(self, special_access: bool) -> Self {
        Self::from_parts(self.stored_tier(), special_access)
    }

    /// Returns true when the feature is unlocked.
    #[must_use]
    pub fn has_feature(self, feature: Feature) -> bool {
        feature.is_included_in(self.effective_tier())
    }

    /// Returns the document limit.
    #[must_use]
    pub const fn document_limit(self) -> Limit {
        limits::document_limit(self.effective_tier())
    }

    /// Returns the viewable violation limit.
    #[must_use]
    pub const fn violation_limit(self) -> Limit {
        limits::violation_limit(self.effective_tier())
    }

    /// Returns true when full violation details are visible.
    #[must_use]
    pub const fn can_see_full_violation_details(self) -> bool {
        limits::full_violation_details(self.effective_tier())
    }

    /// Returns the AI credit allowance.
    #[must_use]
    pub const fn ai_credits_limit(self) -> u32 {
        limits::ai_credits(self.effective_tier())
    }

    /// Evaluates a quota check for `used` units already consumed.
    #[must_use]
    pub const fn check_quota(self, metric: QuotaMetric, used: u32) -> QuotaDecision {
        let limit = match metric {
            QuotaMetric::Documents => self.document_limit(),
            QuotaMetric::ViolationsViewed => self.violation_limit(),
            QuotaMetric::AiCredits => Limit::Finite(self.ai_credits_limit()),
        };
        let allowed = limit.allows(used);
        let reason = match (allowed, limit) {
            (true, Limit::Unlimited) => "unlimited",
            (true, Limit::Finite(_)) => "within_limit",
            (false, _) => "limit_reached",
        };
        QuotaDecision {
            metric,
            limit,
            used,
            allowed,
            reason,
        }
    }
}

// ============================================================================
// SECTION: Quotas
// ============================================================================

/// Consumable resource governed by a numeric limit.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaMetric {
    /// Analysed documents.
    Documents,
    /// Violations viewed in detail.
    ViolationsViewed,
    /// AI credits spent.
    AiCredits,
}

/// Outcome of a quota check.
///
/// # Invariants
/// - `allowed` is the authoritative decision for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaDecision {
    /// Metric that was checked.
    pub metric: QuotaMetric,
    /// Limit in force for the metric.
    pub limit: Limit,
    /// Units already consumed.
    pub used: u32,
    /// Whether one more unit may be consumed.
    pub allowed: bool,
    /// Stable reason label.
    pub reason: &'static str,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
