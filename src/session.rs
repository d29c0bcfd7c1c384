//! Session store: bearer credential and cached user snapshot.
//!
//! The store persists two string values under fixed keys, mirroring a
//! browser's local storage:
//!
//! | Key | Value |
//! |-----|-------|
//! | `access_token` | opaque bearer token |
//! | `user` | JSON-serialised [`UserSnapshot`] |
//!
//! Both keys are written at login and dropped together on logout or when the
//! backend answers 401. Interested components register an [`AuthListener`]
//! instead of polling the store.

use crate::error::Sheet2DeckError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "access_token";

/// Storage key of the serialised user snapshot.
pub const USER_KEY: &str = "user";

// ── User snapshot ────────────────────────────────────────────────────────

/// Subscription plan. Unknown names are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Plan {
    /// Metered plan with a monthly conversion limit. (default)
    #[default]
    Free,
    Pro,
    Other(String),
}

impl From<String> for Plan {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "free" => Plan::Free,
            "pro" => Plan::Pro,
            other => Plan::Other(other.to_string()),
        }
    }
}

impl From<Plan> for String {
    fn from(plan: Plan) -> Self {
        plan.to_string()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Free => f.write_str("free"),
            Plan::Pro => f.write_str("pro"),
            Plan::Other(name) => f.write_str(name),
        }
    }
}

/// The last user record seen from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default)]
    pub conversions_this_month: u32,
    #[serde(default)]
    pub conversions_last_month: u32,
    #[serde(default)]
    pub credits: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub last_reset_date: Option<String>,
}

impl UserSnapshot {
    /// Conversions left this month on a metered plan; `None` when unmetered.
    pub fn remaining_conversions(&self, free_limit: u32) -> Option<u32> {
        match self.plan {
            Plan::Free => Some(free_limit.saturating_sub(self.conversions_this_month)),
            _ => None,
        }
    }
}

// ── Storage backends ─────────────────────────────────────────────────────

/// Durable key→string storage.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, Sheet2DeckError>;
    fn set(&self, key: &str, value: &str) -> Result<(), Sheet2DeckError>;
    fn remove(&self, key: &str) -> Result<(), Sheet2DeckError>;
}

/// A JSON object on disk, rewritten on every change.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_err(&self, detail: impl fmt::Display) -> Sheet2DeckError {
        Sheet2DeckError::Storage {
            path: self.path.clone(),
            detail: detail.to_string(),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, Sheet2DeckError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => serde_json::from_str(&text).map_err(|e| self.storage_err(e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(self.storage_err(e)),
        }
    }

    /// Like `load`, but an unparseable file starts over empty so the next
    /// write replaces it.
    fn load_for_write(&self) -> Result<BTreeMap<String, String>, Sheet2DeckError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => match serde_json::from_str(&text) {
                Ok(map) => Ok(map),
                Err(e) => {
                    warn!("Replacing corrupt session file {}: {}", self.path.display(), e);
                    Ok(BTreeMap::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(self.storage_err(e)),
        }
    }

    /// Owner-only on unix: the file holds a bearer token.
    fn store(&self, map: &BTreeMap<String, String>) -> Result<(), Sheet2DeckError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.storage_err(e))?;
        }
        let json = serde_json::to_string_pretty(map).map_err(|e| self.storage_err(e))?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(|e| self.storage_err(e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // `mode` only applies on creation; tighten files written earlier.
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| self.storage_err(e))?;
        }
        file.write_all(json.as_bytes())
            .map_err(|e| self.storage_err(e))
    }

    fn modify(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), Sheet2DeckError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Sheet2DeckError::Internal("session file lock poisoned".into()))?;
        let mut map = self.load_for_write()?;
        f(&mut map);
        self.store(&map)
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Sheet2DeckError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Sheet2DeckError> {
        self.modify(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), Sheet2DeckError> {
        self.modify(|map| {
            map.remove(key);
        })
    }
}

/// Process-local storage for tests and embedded use.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, Sheet2DeckError> {
        self.values
            .lock()
            .map_err(|_| Sheet2DeckError::Internal("memory storage lock poisoned".into()))
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Sheet2DeckError> {
        Ok(self.values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Sheet2DeckError> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Sheet2DeckError> {
        self.values()?.remove(key);
        Ok(())
    }
}

// ── Auth change notifications ────────────────────────────────────────────

/// What happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    LoggedIn,
    LoggedOut,
    /// The backend rejected the credential.
    Expired,
    UserUpdated,
}

/// Receives session changes. Must be `Send + Sync`.
pub trait AuthListener: Send + Sync {
    fn on_auth_changed(&self, change: AuthChange, user: Option<&UserSnapshot>);
}

// ── Session store ────────────────────────────────────────────────────────

struct SessionInner {
    backend: Box<dyn StorageBackend>,
    listeners: Mutex<Vec<Arc<dyn AuthListener>>>,
}

/// Cheaply cloneable handle to the credential and user snapshot.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl SessionStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                backend: Box::new(backend),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Store backed by the file named in the config.
    pub fn from_config(config: &crate::config::ClientConfig) -> Self {
        Self::new(FileStorage::new(config.resolved_session_path()))
    }

    /// In-memory store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Current bearer token. Unreadable storage counts as logged out.
    pub fn token(&self) -> Option<String> {
        match self.inner.backend.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("Could not read session token: {}", e);
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Cached user snapshot, if any. Corrupt JSON counts as absent.
    pub fn user(&self) -> Option<UserSnapshot> {
        let raw = match self.inner.backend.get(USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Could not read cached user: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Ignoring corrupt cached user: {}", e);
                None
            }
        }
    }

    /// Persist a fresh login.
    pub fn save_login(&self, token: &str, user: &UserSnapshot) -> Result<(), Sheet2DeckError> {
        self.inner.backend.set(TOKEN_KEY, token)?;
        self.write_user(user)?;
        debug!("Session saved for {:?}", user.email);
        self.emit(AuthChange::LoggedIn, Some(user));
        Ok(())
    }

    /// Replace the cached snapshot; last write wins.
    pub fn set_user(&self, user: &UserSnapshot) -> Result<(), Sheet2DeckError> {
        self.write_user(user)?;
        self.emit(AuthChange::UserUpdated, Some(user));
        Ok(())
    }

    /// Drop credential and snapshot together.
    pub fn clear(&self, change: AuthChange) -> Result<(), Sheet2DeckError> {
        let token = self.inner.backend.remove(TOKEN_KEY);
        let user = self.inner.backend.remove(USER_KEY);
        self.emit(change, None);
        token.and(user)
    }

    /// Register a listener for every subsequent change.
    pub fn subscribe(&self, listener: Arc<dyn AuthListener>) {
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push(listener);
        }
    }

    fn write_user(&self, user: &UserSnapshot) -> Result<(), Sheet2DeckError> {
        let json = serde_json::to_string(user)
            .map_err(|e| Sheet2DeckError::Internal(format!("serialising user: {e}")))?;
        self.inner.backend.set(USER_KEY, &json)
    }

    fn emit(&self, change: AuthChange, user: Option<&UserSnapshot>) {
        // Clone out so listeners may call back into the store.
        let listeners: Vec<Arc<dyn AuthListener>> = match self.inner.listeners.lock() {
            Ok(l) => l.clone(),
            Err(_) => return,
        };
        for listener in listeners {
            listener.on_auth_changed(change, user);
        }
    }
}
