// crates/cps-entitlement-core/src/runtime/mod.rs
// ============================================================================
// Module: Entitlement Runtime
// Description: Session engine, audit sinks, in-memory store, and validators.
// Purpose: Group the stateful pieces built on the core data model.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime components that hold session state and talk to storage.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod session;
pub mod store;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AccessAuditEvent;
pub use audit::EntitlementAuditSink;
pub use audit::FeatureAuditEvent;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::StorageAuditEvent;
pub use audit::TierAuditEvent;
pub use session::EntitlementError;
pub use session::EntitlementSession;
pub use session::SessionParams;
pub use session::StoragePolicy;
pub use store::InMemorySessionStore;
pub use validator::DisabledCodeValidator;
pub use validator::StaticCodeValidator;
pub use validator::constant_time_eq;
