// crates/cps-entitlement-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Session Store
// Description: Durable per-user SessionStore backed by SQLite.
// Purpose: Persist tier and special-access entries across restarts.
// Dependencies: cps-entitlement-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`SessionStore`] using `SQLite`. Entries
//! live in a single `session_entries` table keyed by user and session key;
//! each save replaces the previous value (last writer wins). A `store_meta`
//! table pins the schema version and unknown versions fail closed.
//!
//! Security posture: database contents are untrusted. Values are bounded in
//! size and returned verbatim; interpretation happens in the session layer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use cps_entitlement_core::SessionKey;
use cps_entitlement_core::SessionStore;
use cps_entitlement_core::StoreError;
use cps_entitlement_core::UserId;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum user identifier length in bytes.
const MAX_USER_ID_BYTES: usize = 256;
/// Maximum stored value size in bytes.
pub const MAX_VALUE_BYTES: usize = 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` session store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteSessionStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteSessionStoreConfig {
    /// Creates a configuration for `path` with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding stored values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored rows could not be interpreted.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid configuration or request.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Value exceeded the size limit.
    #[error("sqlite store value too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual value size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => {
                Self::Store(format!("schema version mismatch: {message}"))
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Invalid(format!(
                "value exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

/// Maps a `rusqlite` error into a store error.
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// One stored entry, as returned by [`SqliteSessionStore::list_entries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    /// Entry key.
    pub key: SessionKey,
    /// Raw stored value.
    pub value: String,
    /// Last write time (milliseconds since epoch).
    pub updated_at: i64,
}

/// `SQLite`-backed session store shared across users.
///
/// # Invariants
/// - `SQLite` connection access is serialized through a mutex.
/// - At most one value exists per `(user_id, key)` pair.
#[derive(Clone)]
pub struct SqliteSessionStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Opens (creating if needed) an `SQLite`-backed session store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid or the database
    /// cannot be opened or initialized.
    pub fn new(config: &SqliteSessionStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns a [`SessionStore`] handle scoped to `user_id`.
    #[must_use]
    pub fn for_user(&self, user_id: UserId) -> SqliteUserStore {
        SqliteUserStore {
            store: self.clone(),
            user_id,
        }
    }

    /// Loads one entry.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or the stored value
    /// exceeds [`MAX_VALUE_BYTES`].
    pub fn load_entry(
        &self,
        user_id: &UserId,
        key: SessionKey,
    ) -> Result<Option<String>, SqliteStoreError> {
        validate_user_id(user_id)?;
        let guard = self.lock()?;
        let value: Option<String> = guard
            .query_row(
                "SELECT value FROM session_entries WHERE user_id = ?1 AND key = ?2",
                params![user_id.as_str(), key.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        drop(guard);
        if let Some(value) = &value {
            ensure_value_within_limit(value)?;
        }
        Ok(value)
    }

    /// Inserts or replaces one entry.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the value is too large or the write
    /// fails.
    pub fn save_entry(
        &self,
        user_id: &UserId,
        key: SessionKey,
        value: &str,
    ) -> Result<(), SqliteStoreError> {
        validate_user_id(user_id)?;
        ensure_value_within_limit(value)?;
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO session_entries (user_id, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, key)
                 DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![user_id.as_str(), key.as_str(), value, unix_millis()],
            )
            .map_err(db_error)?;
        Ok(())
    }

    /// Removes one entry. Removing a missing entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the delete fails.
    pub fn remove_entry(&self, user_id: &UserId, key: SessionKey) -> Result<(), SqliteStoreError> {
        validate_user_id(user_id)?;
        let guard = self.lock()?;
        guard
            .execute(
                "DELETE FROM session_entries WHERE user_id = ?1 AND key = ?2",
                params![user_id.as_str(), key.as_str()],
            )
            .map_err(db_error)?;
        Ok(())
    }

    /// Lists every entry stored for `user_id`, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Corrupt`] when a row carries an unknown
    /// key, or [`SqliteStoreError::Db`] when the query fails.
    pub fn list_entries(&self, user_id: &UserId) -> Result<Vec<SessionEntry>, SqliteStoreError> {
        validate_user_id(user_id)?;
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare(
                "SELECT key, value, updated_at FROM session_entries WHERE user_id = ?1 ORDER BY \
                 key",
            )
            .map_err(db_error)?;
        let rows = stmt
            .query_map(params![user_id.as_str()], |row| {
                let key: String = row.get(0)?;
                let value: String = row.get(1)?;
                let updated_at: i64 = row.get(2)?;
                Ok((key, value, updated_at))
            })
            .map_err(db_error)?;
        let mut entries = Vec::new();
        for row in rows {
            let (key_raw, value, updated_at) = row.map_err(db_error)?;
            let Some(key) = SessionKey::from_key(&key_raw) else {
                return Err(SqliteStoreError::Corrupt(format!("unknown session key: {key_raw}")));
            };
            entries.push(SessionEntry {
                key,
                value,
                updated_at,
            });
        }
        drop(stmt);
        drop(guard);
        Ok(entries)
    }

    /// Deletes every entry stored for `user_id`, returning the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the delete fails.
    pub fn clear_user(&self, user_id: &UserId) -> Result<usize, SqliteStoreError> {
        validate_user_id(user_id)?;
        let guard = self.lock()?;
        guard
            .execute("DELETE FROM session_entries WHERE user_id = ?1", params![user_id.as_str()])
            .map_err(db_error)
    }

    /// Acquires the connection lock.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }
}

/// [`SessionStore`] handle scoped to one user.
#[derive(Clone)]
pub struct SqliteUserStore {
    /// Shared backing store.
    store: SqliteSessionStore,
    /// Owner of every entry read or written through this handle.
    user_id: UserId,
}

impl SqliteUserStore {
    /// Returns the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

impl SessionStore for SqliteUserStore {
    fn load(&self, key: SessionKey) -> Result<Option<String>, StoreError> {
        self.store.load_entry(&self.user_id, key).map_err(|err| match err {
            SqliteStoreError::TooLarge {
                ..
            } => StoreError::Unreadable(err.to_string()),
            other => StoreError::from(other),
        })
    }

    fn save(&self, key: SessionKey, value: &str) -> Result<(), StoreError> {
        self.store.save_entry(&self.user_id, key, value).map_err(StoreError::from)
    }

    fn remove(&self, key: SessionKey) -> Result<(), StoreError> {
        self.store.remove_entry(&self.user_id, key).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Rejects empty or oversized user identifiers.
fn validate_user_id(user_id: &UserId) -> Result<(), SqliteStoreError> {
    let len = user_id.as_str().len();
    if len == 0 {
        return Err(SqliteStoreError::Invalid("user_id must not be empty".to_string()));
    }
    if len > MAX_USER_ID_BYTES {
        return Err(SqliteStoreError::Invalid(format!(
            "user_id exceeds length limit: {len} bytes (max {MAX_USER_ID_BYTES})"
        )));
    }
    Ok(())
}

/// Rejects values larger than [`MAX_VALUE_BYTES`].
const fn ensure_value_within_limit(value: &str) -> Result<(), SqliteStoreError> {
    if value.len() > MAX_VALUE_BYTES {
        return Err(SqliteStoreError::TooLarge {
            max_bytes: MAX_VALUE_BYTES,
            actual_bytes: value.len(),
        });
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteSessionStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteSessionStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS session_entries (
                    user_id TEXT NOT NULL,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL,
                    PRIMARY KEY (user_id, key)
                );",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
