// crates/cps-entitlement-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Session Store
// Description: Process-local session store for session-only mode and tests.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemorySessionStore`] keeps entries in a shared map. Clones share the
//! same map, so a fresh session opened on a clone observes the same state as
//! a process restart against durable storage would. Nothing survives the
//! process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::interfaces::SessionKey;
use crate::interfaces::SessionStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory session store.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionStore {
    /// Entry map protected by a mutex.
    entries: Arc<Mutex<BTreeMap<SessionKey, String>>>,
}

impl InMemorySessionStore {
    /// Creates an empty in-memory session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| StoreError::Store("session store mutex poisoned".to_string()))?;
        Ok(guard.get(&key).cloned())
    }

    fn save(&self, key: SessionKey, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Store("session store mutex poisoned".to_string()))?
            .insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: SessionKey) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Store("session store mutex poisoned".to_string()))?
            .remove(&key);
        Ok(())
    }
}
