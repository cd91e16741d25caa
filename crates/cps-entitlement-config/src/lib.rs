// crates/cps-entitlement-config/src/lib.rs
// ============================================================================
// Module: CPS Entitlement Config Library
// Description: Config model, validation, and session wiring.
// Purpose: Single source of truth for cps-entitlement.toml semantics.
// Dependencies: cps-entitlement-core, cps-entitlement-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `cps-entitlement-config` defines the configuration model for the
//! entitlement engine and turns a validated config into ready-to-use
//! [`cps_entitlement_core::EntitlementSession`] instances.
//!
//! Security posture: config inputs are untrusted and validation fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use runtime::EntitlementRuntime;
pub use runtime::RuntimeError;
