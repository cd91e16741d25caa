// crates/cps-entitlement-store-sqlite/src/lib.rs
// ============================================================================
// Module: CPS Entitlement SQLite Store Library
// Description: Public API surface for the SQLite session store.
// Purpose: Expose the durable store, its configuration, and errors.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! Durable [`cps_entitlement_core::SessionStore`] implementation backed by
//! `SQLite`. One database holds entries for many users; each session is handed
//! a handle scoped to its owner through [`SqliteSessionStore::for_user`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_VALUE_BYTES;
pub use store::SessionEntry;
pub use store::SqliteSessionStore;
pub use store::SqliteSessionStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::SqliteUserStore;
