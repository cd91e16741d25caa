// crates/cps-entitlement-core/src/core/plan.rs
// ============================================================================
// Module: Plan Summaries
// Description: Serializable capability answer sets for display and UI use.
// Purpose: Derive plan copy and session snapshots from the enforcement tables.
// Dependencies: crate::core::{entitlement, feature, limits, tier}, serde
// ============================================================================

//! ## Overview
//! [`PlanSummary`] describes what a tier grants and [`CapabilitySnapshot`]
//! describes what a session can do right now. Both are computed from the same
//! tables the capability queries use, so display text cannot disagree with
//! enforcement.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::entitlement::Entitlement;
use crate::core::feature::Feature;
use crate::core::limits;
use crate::core::limits::Limit;
use crate::core::tier::Tier;

// ============================================================================
// SECTION: Plan Summary
// ============================================================================

/// What a single tier grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    /// Tier being described.
    pub tier: Tier,
    /// Display label.
    pub label: &'static str,
    /// Document limit.
    pub document_limit: Limit,
    /// Viewable violation limit.
    pub violation_limit: Limit,
    /// Whether full violation details are visible.
    pub full_violation_details: bool,
    /// AI credit allowance.
    pub ai_credits: u32,
    /// Features included in the tier.
    pub features: Vec<Feature>,
}

impl PlanSummary {
    /// Builds the summary for one tier.
    #[must_use]
    pub fn for_tier(tier: Tier) -> Self {
        Self {
            tier,
            label: tier.label(),
            document_limit: limits::document_limit(tier),
            violation_limit: limits::violation_limit(tier),
            full_violation_details: limits::full_violation_details(tier),
            ai_credits: limits::ai_credits(tier),
            features: Feature::included_in(tier),
        }
    }

    /// Returns summaries for every tier in ascending order.
    #[must_use]
    pub fn catalog() -> Vec<Self> {
        Tier::ALL.into_iter().map(Self::for_tier).collect()
    }
}

// ============================================================================
// SECTION: Capability Snapshot
// ============================================================================

/// Point-in-time answer set for a session.
///
/// # Invariants
/// - When `special_access` is true, `effective_tier` is [`Tier::MAX`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitySnapshot {
    /// Stored tier.
    pub tier: Tier,
    /// Tier the answers are computed for.
    pub effective_tier: Tier,
    /// Whether special access is active.
    pub special_access: bool,
    /// Document limit.
    pub document_limit: Limit,
    /// Viewable violation limit.
    pub violation_limit: Limit,
    /// Whether full violation details are visible.
    pub full_violation_details: bool,
    /// AI credit allowance.
    pub ai_credits: u32,
    /// Unlocked features.
    pub features: Vec<Feature>,
}

impl From<Entitlement> for CapabilitySnapshot {
    fn from(entitlement: Entitlement) -> Self {
        Self {
            tier: entitlement.stored_tier(),
            effective_tier: entitlement.effective_tier(),
            special_access: entitlement.is_overridden(),
            document_limit: entitlement.document_limit(),
            violation_limit: entitlement.violation_limit(),
            full_violation_details: entitlement.can_see_full_violation_details(),
            ai_credits: entitlement.ai_credits_limit(),
            features: Feature::included_in(entitlement.effective_tier()),
        }
    }
}
