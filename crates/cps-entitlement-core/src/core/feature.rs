// crates/cps-entitlement-core/src/core/feature.rs
// ============================================================================
// Module: Feature Table
// Description: Closed feature enumeration with per-feature tier inclusion lists.
// Purpose: Map each gated feature to the tiers that unlock it.
// Dependencies: crate::core::tier, serde, thiserror
// ============================================================================

//! ## Overview
//! Every gated capability is a [`Feature`] variant. Each variant carries an
//! explicit list of the tiers that include it rather than a minimum rank, so
//! the lists of adjacent tiers must stay consistent with one another.
//! [`validate_feature_table`] checks that consistency and runs whenever a
//! session is opened.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::tier::Tier;

// ============================================================================
// SECTION: Feature
// ============================================================================

/// Gated product feature.
///
/// # Invariants
/// - Serialized names are stable snake_case identifiers used by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Core document analysis.
    BasicAnalysis,
    /// Condensed list of detected violations.
    ViolationSummary,
    /// Community discussion forum.
    CommunityForum,
    /// Export of analysis reports as PDF.
    PdfExport,
    /// Chronological case timeline view.
    CaseTimeline,
    /// AI paralegal assistant.
    AiParalegal,
    /// Cross-document analytics dashboards.
    AdvancedAnalytics,
    /// Legal research lookups.
    LegalResearch,
    /// Managing several client cases from one account.
    MultiClient,
    /// Court filing templates.
    CourtFilingTemplates,
    /// Team seats and role management.
    TeamManagement,
    /// Programmatic API access.
    ApiAccess,
    /// White-label branding.
    WhiteLabel,
}

impl Feature {
    /// Every feature, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::BasicAnalysis,
        Self::ViolationSummary,
        Self::CommunityForum,
        Self::PdfExport,
        Self::CaseTimeline,
        Self::AiParalegal,
        Self::AdvancedAnalytics,
        Self::LegalResearch,
        Self::MultiClient,
        Self::CourtFilingTemplates,
        Self::TeamManagement,
        Self::ApiAccess,
        Self::WhiteLabel,
    ];

    /// Returns the stable feature name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BasicAnalysis => "basic_analysis",
            Self::ViolationSummary => "violation_summary",
            Self::CommunityForum => "community_forum",
            Self::PdfExport => "pdf_export",
            Self::CaseTimeline => "case_timeline",
            Self::AiParalegal => "ai_paralegal",
            Self::AdvancedAnalytics => "advanced_analytics",
            Self::LegalResearch => "legal_research",
            Self::MultiClient => "multi_client",
            Self::CourtFilingTemplates => "court_filing_templates",
            Self::TeamManagement => "team_management",
            Self::ApiAccess => "api_access",
            Self::WhiteLabel => "white_label",
        }
    }

    /// Returns the tiers that include this feature.
    #[must_use]
    pub const fn tiers(self) -> &'static [Tier] {
        match self {
            Self::BasicAnalysis | Self::ViolationSummary => &[
                Tier::Free,
                Tier::Essential,
                Tier::Professional,
                Tier::Attorney,
                Tier::Enterprise,
            ],
            Self::CommunityForum | Self::PdfExport | Self::CaseTimeline => {
                &[Tier::Essential, Tier::Professional, Tier::Attorney, Tier::Enterprise]
            }
            Self::AiParalegal | Self::AdvancedAnalytics | Self::LegalResearch => {
                &[Tier::Professional, Tier::Attorney, Tier::Enterprise]
            }
            Self::MultiClient | Self::CourtFilingTemplates => &[Tier::Attorney, Tier::Enterprise],
            Self::TeamManagement | Self::ApiAccess | Self::WhiteLabel => &[Tier::Enterprise],
        }
    }

    /// Returns true when `tier` is in this feature's inclusion list.
    #[must_use]
    pub fn is_included_in(self, tier: Tier) -> bool {
        self.tiers().contains(&tier)
    }

    /// Returns every feature included in `tier`.
    #[must_use]
    pub fn included_in(tier: Tier) -> Vec<Self> {
        Self::ALL.into_iter().filter(|feature| feature.is_included_in(tier)).collect()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known feature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feature: {0}")]
pub struct UnknownFeature(pub String);

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feature| feature.as_str() == value)
            .ok_or_else(|| UnknownFeature(value.to_string()))
    }
}

// ============================================================================
// SECTION: Table Validation
// ============================================================================

/// Feature table consistency errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureTableError {
    /// A feature is not granted to any tier.
    #[error("feature {0} has an empty tier list")]
    Empty(Feature),
    /// A feature lists the same tier twice.
    #[error("feature {feature} lists tier {tier} more than once")]
    Duplicate {
        /// Offending feature.
        feature: Feature,
        /// Repeated tier.
        tier: Tier,
    },
    /// A feature skips a tier above its lowest granted tier.
    #[error("feature {feature} is granted below tier {missing} but not to it")]
    Gap {
        /// Offending feature.
        feature: Feature,
        /// Tier missing from the inclusion list.
        missing: Tier,
    },
}

/// Verifies that every inclusion list is non-empty, duplicate-free, and
/// upward-closed (which implies it contains [`Tier::MAX`]).
///
/// # Errors
///
/// Returns [`FeatureTableError`] describing the first inconsistency found.
pub fn validate_feature_table() -> Result<(), FeatureTableError> {
    for feature in Feature::ALL {
        let tiers = feature.tiers();
        let Some(lowest) = tiers.iter().min().copied() else {
            return Err(FeatureTableError::Empty(feature));
        };
        for (index, tier) in tiers.iter().enumerate() {
            if tiers[index + 1 ..].contains(tier) {
                return Err(FeatureTableError::Duplicate {
                    feature,
                    tier: *tier,
                });
            }
        }
        if let Some(missing) =
            Tier::ALL.into_iter().filter(|tier| *tier >= lowest).find(|tier| !tiers.contains(tier))
        {
            return Err(FeatureTableError::Gap {
                feature,
                missing,
            });
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Feature;
    use super::Tier;
    use super::validate_feature_table;

    #[test]
    fn shipped_table_is_consistent() {
        assert_eq!(validate_feature_table(), Ok(()));
    }

    #[test]
    fn every_feature_reaches_max_tier() {
        for feature in Feature::ALL {
            assert!(feature.is_included_in(Tier::MAX), "{feature} missing enterprise");
        }
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for feature in Feature::ALL {
            assert_eq!(feature.as_str().parse::<Feature>(), Ok(feature));
        }
        assert!("AI_PARALEGAL".parse::<Feature>().is_err());
    }
}
