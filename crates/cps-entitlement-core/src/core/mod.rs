// crates/cps-entitlement-core/src/core/mod.rs
// ============================================================================
// Module: Entitlement Core Types
// Description: Tiers, features, limits, and the entitlement sum type.
// Purpose: Group the pure data model used by sessions and storage.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Pure, storage-agnostic entitlement types. Nothing here performs I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod entitlement;
pub mod feature;
pub mod identifiers;
pub mod limits;
pub mod plan;
pub mod tier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use entitlement::Entitlement;
pub use entitlement::QuotaDecision;
pub use entitlement::QuotaMetric;
pub use feature::Feature;
pub use feature::FeatureTableError;
pub use feature::UnknownFeature;
pub use feature::validate_feature_table;
pub use identifiers::UserId;
pub use limits::Limit;
pub use plan::CapabilitySnapshot;
pub use plan::PlanSummary;
pub use tier::Tier;
pub use tier::UnknownTier;
