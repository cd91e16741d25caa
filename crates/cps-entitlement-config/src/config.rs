// crates/cps-entitlement-config/src/config.rs
// ============================================================================
// Module: CPS Entitlement Configuration
// Description: Configuration loading and validation for the entitlement engine.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: cps-entitlement-core, cps-entitlement-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys, conflicting settings, and malformed secrets are rejected.
//! Security posture: config inputs are untrusted and the access-code secret
//! never appears in `Debug` output or error messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use cps_entitlement_core::StoragePolicy;
use cps_entitlement_store_sqlite::SqliteSessionStoreConfig;
use cps_entitlement_store_sqlite::SqliteStoreMode;
use cps_entitlement_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "cps-entitlement.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CPS_ENTITLEMENT_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum access-code secret length in bytes.
pub(crate) const MAX_SECRET_LENGTH: usize = 256;
/// Maximum environment variable name length.
pub(crate) const MAX_ENV_NAME_LENGTH: usize = 128;
/// Default `SQLite` busy timeout in milliseconds.
pub(crate) const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum `SQLite` busy timeout in milliseconds.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Entitlement engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitlementConfig {
    /// Session storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Special-access code configuration.
    #[serde(default)]
    pub access_code: AccessCodeConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl EntitlementConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is `path` when given, else the value of
    /// [`CONFIG_ENV_VAR`], else `cps-entitlement.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.storage.validate()?;
        self.access_code.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Storage
// ============================================================================

/// Session storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local storage; state is lost when the process exits.
    #[default]
    Memory,
    /// Durable `SQLite` storage.
    Sqlite,
}

/// Session storage configuration.
///
/// # Invariants
/// - `path` is set if and only if `backend` is [`StorageBackend::Sqlite`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: StorageBackend,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Behavior when storage cannot be opened, read, or written.
    #[serde(default)]
    pub on_unavailable: StoragePolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            on_unavailable: StoragePolicy::default(),
        }
    }
}

impl StorageConfig {
    /// Validates storage configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.busy_timeout_ms == 0 || self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "storage.busy_timeout_ms out of range: {} (max {MAX_BUSY_TIMEOUT_MS})",
                self.busy_timeout_ms
            )));
        }
        match self.backend {
            StorageBackend::Memory => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "memory storage must not set path".to_string(),
                    ));
                }
                Ok(())
            }
            StorageBackend::Sqlite => {
                let path = self.path.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("sqlite storage requires path".to_string())
                })?;
                validate_path_string("storage.path", &path.to_string_lossy())
            }
        }
    }

    /// Returns the `SQLite` store configuration for the sqlite backend.
    #[must_use]
    pub fn sqlite_config(&self) -> Option<SqliteSessionStoreConfig> {
        match (self.backend, &self.path) {
            (StorageBackend::Sqlite, Some(path)) => Some(SqliteSessionStoreConfig {
                path: path.clone(),
                busy_timeout_ms: self.busy_timeout_ms,
                journal_mode: self.journal_mode,
                sync_mode: self.sync_mode,
            }),
            _ => None,
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Access Code
// ============================================================================

/// Special-access code configuration.
///
/// # Invariants
/// - At most one of `secret` and `secret_env` is set.
/// - When neither is set, special access is disabled.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessCodeConfig {
    /// Inline secret.
    #[serde(default)]
    pub secret: Option<String>,
    /// Name of the environment variable holding the secret.
    #[serde(default)]
    pub secret_env: Option<String>,
}

impl fmt::Debug for AccessCodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCodeConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("secret_env", &self.secret_env)
            .finish()
    }
}

impl AccessCodeConfig {
    /// Validates access-code configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (&self.secret, &self.secret_env) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(
                "access_code.secret and access_code.secret_env are mutually exclusive".to_string(),
            )),
            (Some(secret), None) => validate_secret("access_code.secret", secret),
            (None, Some(name)) => validate_env_name(name),
            (None, None) => Ok(()),
        }
    }

    /// Returns true when special access can be granted.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.secret.is_some() || self.secret_env.is_some()
    }

    /// Resolves the configured secret, reading the environment if needed.
    ///
    /// Returns `Ok(None)` when special access is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the environment variable is
    /// unset or its value violates the secret limits.
    pub fn resolve_secret(&self) -> Result<Option<String>, ConfigError> {
        if let Some(secret) = &self.secret {
            return Ok(Some(secret.clone()));
        }
        let Some(name) = &self.secret_env else {
            return Ok(None);
        };
        let value = env::var(name).map_err(|_| {
            ConfigError::Invalid(format!("access_code.secret_env variable {name} is not set"))
        })?;
        validate_secret(&format!("access_code.secret_env ({name})"), &value)?;
        Ok(Some(value))
    }
}

/// Validates a secret's length without echoing it.
fn validate_secret(field: &str, secret: &str) -> Result<(), ConfigError> {
    if secret.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if secret.len() > MAX_SECRET_LENGTH {
        return Err(ConfigError::Invalid(format!(
            "{field} exceeds max length of {MAX_SECRET_LENGTH} bytes"
        )));
    }
    Ok(())
}

/// Validates an environment variable name.
fn validate_env_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Invalid("access_code.secret_env must be non-empty".to_string()));
    }
    if name.len() > MAX_ENV_NAME_LENGTH {
        return Err(ConfigError::Invalid("access_code.secret_env exceeds max length".to_string()));
    }
    if name.contains('=') || name.contains('\0') {
        return Err(ConfigError::Invalid(
            "access_code.secret_env contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    None,
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
}

/// Audit logging configuration.
///
/// # Invariants
/// - `path` is set if and only if `sink` is [`AuditSinkKind::File`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Audit sink.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Audit log path (JSON lines) for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => {
                validate_path_string("audit.path", &path.to_string_lossy())
            }
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires path".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
