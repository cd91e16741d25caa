// crates/cps-entitlement-core/tests/session.rs
// ============================================================================
// Module: Entitlement Session Tests
// Description: Scenario tests for tier changes, access codes, and queries.
// Purpose: Pin the precedence and limit rules exposed to consumers.
// Dependencies: cps-entitlement-core
// ============================================================================

//! ## Overview
//! Exercises [`EntitlementSession`] end to end over the in-memory store,
//! including simulated restarts through a shared store handle.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;

use cps_entitlement_core::DisabledCodeValidator;
use cps_entitlement_core::EntitlementSession;
use cps_entitlement_core::Feature;
use cps_entitlement_core::InMemorySessionStore;
use cps_entitlement_core::Limit;
use cps_entitlement_core::NoopAuditSink;
use cps_entitlement_core::QuotaMetric;
use cps_entitlement_core::SPECIAL_ACCESS_GRANTED;
use cps_entitlement_core::SessionKey;
use cps_entitlement_core::SessionParams;
use cps_entitlement_core::SessionStore;
use cps_entitlement_core::StoragePolicy;
use cps_entitlement_core::Tier;
use cps_entitlement_core::UserId;

use crate::common::SECRET;
use crate::common::open_session;

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn fresh_session_defaults_to_free_without_special_access() {
    let (session, _) = open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    assert_eq!(session.tier(), Tier::Free);
    assert!(!session.has_special_access());
    assert_eq!(session.ai_credits_limit(), 0);
    assert!(!session.can_see_full_violation_details());
    assert_eq!(session.document_limit(), Limit::Finite(1));
    assert_eq!(session.violation_limit(), Limit::Finite(5));
    assert!(session.is_persistent());
}

#[test]
fn fresh_session_does_not_write_defaults() {
    let store = InMemorySessionStore::new();
    let _ = open_session(store.clone(), StoragePolicy::SessionOnly);
    assert_eq!(store.load(SessionKey::UserTier).unwrap(), None);
    assert_eq!(store.load(SessionKey::SpecialAccess).unwrap(), None);
}

// ============================================================================
// SECTION: Tiers
// ============================================================================

#[test]
fn attorney_tier_is_a_superset() {
    let (mut session, _) = open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    session.set_tier(Tier::Attorney).unwrap();
    assert!(session.check_feature_access("ai_paralegal"));
    assert!(session.check_feature_access("multi_client"));
    assert!(session.check_feature_access("community_forum"));
    assert!(!session.check_feature_access("white_label"));
}

#[test]
fn document_limits_follow_tier() {
    let (mut session, _) = open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    let expected = [
        (Tier::Free, Limit::Finite(1)),
        (Tier::Essential, Limit::Finite(25)),
        (Tier::Professional, Limit::Unlimited),
        (Tier::Attorney, Limit::Unlimited),
        (Tier::Enterprise, Limit::Unlimited),
    ];
    for (tier, limit) in expected {
        session.set_tier(tier).unwrap();
        assert_eq!(session.document_limit(), limit, "tier {tier}");
    }
}

#[test]
fn violation_limit_only_caps_free_tier() {
    let (mut session, _) = open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    for tier in Tier::ALL {
        session.set_tier(tier).unwrap();
        let expected = if tier == Tier::Free { Limit::Finite(5) } else { Limit::Unlimited };
        assert_eq!(session.violation_limit(), expected, "tier {tier}");
        assert_eq!(session.can_see_full_violation_details(), tier != Tier::Free);
    }
}

#[test]
fn ai_credits_follow_tier_table() {
    let (mut session, _) = open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    let expected = [
        (Tier::Free, 0),
        (Tier::Essential, 25),
        (Tier::Professional, 100),
        (Tier::Attorney, 500),
        (Tier::Enterprise, 2_000),
    ];
    for (tier, credits) in expected {
        session.set_tier(tier).unwrap();
        assert_eq!(session.ai_credits_limit(), credits, "tier {tier}");
    }
}

#[test]
fn set_tier_survives_restart() {
    let store = InMemorySessionStore::new();
    for tier in Tier::ALL {
        let (mut session, _) = open_session(store.clone(), StoragePolicy::Fail);
        session.set_tier(tier).unwrap();
        drop(session);
        let (reopened, _) = open_session(store.clone(), StoragePolicy::Fail);
        assert_eq!(reopened.tier(), tier);
    }
    assert_eq!(store.load(SessionKey::UserTier).unwrap().as_deref(), Some("enterprise"));
}

// ============================================================================
// SECTION: Special Access
// ============================================================================

#[test]
fn access_code_requires_exact_match() {
    let (mut session, _) = open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    for near_miss in [
        format!("{SECRET} "),
        format!(" {SECRET}"),
        SECRET.to_lowercase(),
        SECRET.to_uppercase(),
        SECRET[.. SECRET.len() - 1].to_string(),
        String::new(),
    ] {
        assert!(!session.check_access_code(&near_miss).unwrap(), "accepted {near_miss:?}");
        assert!(!session.has_special_access());
    }
    assert!(session.check_access_code(SECRET).unwrap());
    assert!(session.has_special_access());
}

#[test]
fn wrong_code_after_grant_keeps_access() {
    let (mut session, _) = open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    assert!(session.check_access_code(SECRET).unwrap());
    assert!(!session.check_access_code("nope").unwrap());
    assert!(session.has_special_access());
}

#[test]
fn special_access_unlocks_everything_on_free_tier() {
    let store = InMemorySessionStore::new();
    let (mut session, _) = open_session(store.clone(), StoragePolicy::Fail);
    assert!(session.check_access_code(SECRET).unwrap());
    assert_eq!(session.tier(), Tier::Free);
    assert_eq!(session.effective_tier(), Tier::Enterprise);
    assert_eq!(session.document_limit(), Limit::Unlimited);
    assert_eq!(session.violation_limit(), Limit::Unlimited);
    assert_eq!(session.ai_credits_limit(), 2_000);
    assert!(session.can_see_full_violation_details());
    for feature in Feature::ALL {
        assert!(session.has_feature(feature), "feature {feature}");
    }
    assert_eq!(store.load(SessionKey::UserTier).unwrap(), None);
    assert_eq!(
        store.load(SessionKey::SpecialAccess).unwrap().as_deref(),
        Some(SPECIAL_ACCESS_GRANTED)
    );
}

#[test]
fn removing_special_access_restores_stored_tier() {
    let store = InMemorySessionStore::new();
    let (mut session, _) = open_session(store.clone(), StoragePolicy::Fail);
    session.set_tier(Tier::Essential).unwrap();
    assert!(session.check_access_code(SECRET).unwrap());
    session.set_tier(Tier::Professional).unwrap();
    assert!(session.has_special_access());

    session.remove_special_access().unwrap();
    assert_eq!(session.tier(), Tier::Professional);
    assert_eq!(session.effective_tier(), Tier::Professional);
    assert_eq!(session.ai_credits_limit(), 100);
    assert_eq!(store.load(SessionKey::SpecialAccess).unwrap(), None);
}

#[test]
fn remove_special_access_is_idempotent() {
    let store = InMemorySessionStore::new();
    let (mut session, _) = open_session(store.clone(), StoragePolicy::Fail);
    session.set_tier(Tier::Attorney).unwrap();
    assert!(session.check_access_code(SECRET).unwrap());

    session.remove_special_access().unwrap();
    let once = (session.snapshot(), store.load(SessionKey::SpecialAccess).unwrap());
    session.remove_special_access().unwrap();
    let twice = (session.snapshot(), store.load(SessionKey::SpecialAccess).unwrap());
    assert_eq!(once, twice);
}

#[test]
fn special_access_survives_restart() {
    let store = InMemorySessionStore::new();
    let (mut session, _) = open_session(store.clone(), StoragePolicy::Fail);
    assert!(session.check_access_code(SECRET).unwrap());
    drop(session);
    let (reopened, _) = open_session(store, StoragePolicy::Fail);
    assert!(reopened.has_special_access());
    assert_eq!(reopened.tier(), Tier::Free);
}

#[test]
fn disabled_validator_never_grants_access() {
    let mut session = EntitlementSession::open(SessionParams {
        user_id: UserId::new("user-2"),
        store: Box::new(InMemorySessionStore::new()),
        validator: Arc::new(DisabledCodeValidator),
        audit: Arc::new(NoopAuditSink),
        policy: StoragePolicy::SessionOnly,
    })
    .unwrap();
    assert!(!session.check_access_code("").unwrap());
    assert!(!session.check_access_code(SECRET).unwrap());
    assert!(!session.has_special_access());
}

// ============================================================================
// SECTION: Feature Names
// ============================================================================

#[test]
fn unknown_feature_is_denied_and_reported() {
    let (mut session, audit) =
        open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    session.set_tier(Tier::Enterprise).unwrap();
    assert!(!session.check_feature_access("time_travel"));
    assert!(!session.check_feature_access("AI_PARALEGAL"));
    let unknown: Vec<_> = audit
        .events()
        .into_iter()
        .filter(|event| event["event"] == "unknown_feature")
        .map(|event| event["feature"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(unknown, vec!["time_travel".to_string(), "AI_PARALEGAL".to_string()]);
}

#[test]
fn unknown_feature_is_granted_under_special_access_but_still_reported() {
    let (mut session, audit) =
        open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    assert!(session.check_access_code(SECRET).unwrap());
    assert!(session.check_feature_access("time_travel"));
    assert!(audit.labels().contains(&"unknown_feature".to_string()));
}

#[test]
fn special_access_grants_every_feature_name_on_every_tier() {
    for tier in Tier::ALL {
        let (mut session, audit) =
            open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
        session.set_tier(tier).unwrap();
        assert!(session.check_access_code(SECRET).unwrap());
        for feature in Feature::ALL {
            assert!(session.check_feature_access(feature.as_str()), "{tier:?} {feature:?}");
        }
        assert!(!audit.labels().contains(&"unknown_feature".to_string()));
    }
}

// ============================================================================
// SECTION: Quotas + Snapshots
// ============================================================================

#[test]
fn quota_checks_track_limits() {
    let (mut session, _) = open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    assert!(session.check_quota(QuotaMetric::Documents, 0).allowed);
    assert!(!session.check_quota(QuotaMetric::Documents, 1).allowed);
    assert!(session.check_quota(QuotaMetric::ViolationsViewed, 4).allowed);
    assert!(!session.check_quota(QuotaMetric::ViolationsViewed, 5).allowed);

    session.set_tier(Tier::Essential).unwrap();
    assert!(session.check_quota(QuotaMetric::Documents, 24).allowed);
    assert!(!session.check_quota(QuotaMetric::Documents, 25).allowed);
    assert!(session.check_quota(QuotaMetric::AiCredits, 24).allowed);

    assert!(session.check_access_code(SECRET).unwrap());
    let decision = session.check_quota(QuotaMetric::Documents, 10_000);
    assert!(decision.allowed);
    assert_eq!(decision.reason, "unlimited");
}

#[test]
fn snapshot_serializes_limits_for_ui() {
    let (mut session, _) = open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    session.set_tier(Tier::Essential).unwrap();
    let value = serde_json::to_value(session.snapshot()).unwrap();
    assert_eq!(value["tier"], "essential");
    assert_eq!(value["effective_tier"], "essential");
    assert_eq!(value["special_access"], false);
    assert_eq!(value["document_limit"], 25);
    assert_eq!(value["violation_limit"], "unlimited");
    assert_eq!(value["ai_credits"], 25);
    assert!(value["features"].as_array().unwrap().contains(&"community_forum".into()));
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[test]
fn audit_events_never_contain_the_code() {
    let (mut session, audit) =
        open_session(InMemorySessionStore::new(), StoragePolicy::SessionOnly);
    session.check_access_code("wrong-guess").unwrap();
    session.check_access_code(SECRET).unwrap();
    session.remove_special_access().unwrap();
    session.set_tier(Tier::Professional).unwrap();

    assert_eq!(
        audit.labels(),
        vec![
            "access_code_checked".to_string(),
            "access_code_checked".to_string(),
            "special_access_removed".to_string(),
            "tier_changed".to_string(),
        ]
    );
    let rendered = serde_json::to_string(&audit.events()).unwrap();
    assert!(!rendered.contains(SECRET));
    assert!(!rendered.contains("wrong-guess"));
    let events = audit.events();
    assert_eq!(events[0]["accepted"], false);
    assert_eq!(events[1]["accepted"], true);
    assert_eq!(events[1]["code_length"], SECRET.len());
    assert_eq!(events[3]["previous"], "free");
    assert_eq!(events[3]["tier"], "professional");
}
