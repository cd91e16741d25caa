// crates/cps-entitlement-core/src/lib.rs
// ============================================================================
// Module: CPS Entitlement Core Library
// Description: Public API surface for the entitlement engine.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The entitlement engine decides, for one user session, which subscription
//! tier is active, which features and numeric limits that tier unlocks, and
//! how a special-access override interacts with the tier model. State is
//! persisted through the [`SessionStore`] interface and rehydrated when a
//! session is opened.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::CodeValidator;
pub use interfaces::SPECIAL_ACCESS_GRANTED;
pub use interfaces::SessionKey;
pub use interfaces::SessionStore;
pub use interfaces::StoreError;
pub use runtime::DisabledCodeValidator;
pub use runtime::EntitlementAuditSink;
pub use runtime::EntitlementError;
pub use runtime::EntitlementSession;
pub use runtime::InMemorySessionStore;
pub use runtime::NoopAuditSink;
pub use runtime::SessionParams;
pub use runtime::StaticCodeValidator;
pub use runtime::StoragePolicy;
