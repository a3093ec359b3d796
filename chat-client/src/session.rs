//! Durable store for the authenticated session.
//!
//! The credential and identity live under two keys (`token` and `user`)
//! and always change together. They are read once when the store opens and
//! kept in memory afterwards.
//!
//! A new pair is written as: remove the old user, remove the old token,
//! save the token, save the user. Any prefix of that sequence leaves either
//! the old pair, nothing, or a lone token on disk, and a lone token is
//! discarded on restore. A stored token is therefore never paired with
//! another user's identity.
//!
//! Persistence is best effort: a failed write is logged and the in-memory
//! session stays authoritative for the rest of the process.

use pollchat_types::{Credential, Identity};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Key of the persisted credential.
pub const TOKEN_KEY: &str = "token";
/// Key of the persisted identity.
pub const USER_KEY: &str = "user";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be encoded or decoded.
    #[error("invalid stored value: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value persistence underneath a [`SessionStore`].
///
/// Values are JSON strings. Implementations must be cheap enough to call
/// from async code without spawning a blocking task.
pub trait SessionBackend: Send + Sync {
    /// Read a value, `None` when the key is absent.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Backend storing each key as `<dir>/<key>.json`.
///
/// Files are written to a temporary name and renamed into place, with
/// owner-only permissions on Unix.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (and create if needed) a backend rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions_0700(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the session files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SessionBackend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        std::fs::write(&tmp, value)?;
        set_file_permissions_0600(&tmp)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory backend for tests.
///
/// Clones share the same map, so a clone handed to a second
/// [`SessionStore`] simulates a process restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value for a key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Store a raw value, bypassing the session encoding.
    pub fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }

    /// Make every subsequent save and remove fail.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "storage is read-only",
            )));
        }
        Ok(())
    }
}

impl SessionBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

/// The authenticated pair. Both halves are always present together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer credential.
    pub credential: Credential,
    /// The user the credential belongs to.
    pub identity: Identity,
}

struct StoreInner {
    backend: Box<dyn SessionBackend>,
    current: RwLock<Option<Session>>,
}

/// Shared handle to the current session.
///
/// Cheap to clone; every clone sees the same session. Reads never touch
/// the backend.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl SessionStore {
    /// Open a store, restoring any session persisted by an earlier run.
    ///
    /// A pair with one half missing or unreadable is treated as no session
    /// and removed from the backend.
    pub fn open(backend: impl SessionBackend + 'static) -> Self {
        let restored = restore(&backend);
        Self {
            inner: Arc::new(StoreInner {
                backend: Box::new(backend),
                current: RwLock::new(restored),
            }),
        }
    }

    /// Store backed by a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::open(MemoryBackend::new())
    }

    /// Replace the session with a new pair and persist it.
    ///
    /// The write lock is held across the backend writes so concurrent
    /// calls cannot interleave their halves.
    pub fn set_session(&self, credential: Credential, identity: Identity) {
        let session = Session {
            credential,
            identity,
        };

        let mut current = self.write();
        if let Err(e) = persist(self.inner.backend.as_ref(), &session) {
            warn!(error = %e, "Failed to persist session; keeping it in memory only");
        }

        info!(user = %session.identity.username, "Session established");
        *current = Some(session);
    }

    /// Remove both halves of the session.
    ///
    /// Returns `false` when there was nothing to clear.
    pub fn clear_session(&self) -> bool {
        let mut current = self.write();
        let previous = current.take();
        remove_pair(self.inner.backend.as_ref());
        drop(current);

        match previous {
            Some(session) => {
                info!(user = %session.identity.username, "Session cleared");
                true
            }
            None => false,
        }
    }

    /// The current session, if authenticated.
    pub fn session(&self) -> Option<Session> {
        self.read().clone()
    }

    /// The current identity, if authenticated.
    pub fn identity(&self) -> Option<Identity> {
        self.read().as_ref().map(|s| s.identity.clone())
    }

    /// The current credential, if authenticated.
    pub fn credential(&self) -> Option<Credential> {
        self.read().as_ref().map(|s| s.credential.clone())
    }

    /// Whether a session is present.
    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.inner
            .current
            .read()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.inner
            .current
            .write()
            .unwrap_or_else(|e| e.into_inner())
    }
}

fn persist(backend: &dyn SessionBackend, session: &Session) -> Result<(), StoreError> {
    let token = serde_json::to_string(&session.credential)?;
    let user = serde_json::to_string(&session.identity)?;

    // Order matters; see the module docs.
    backend.remove(USER_KEY)?;
    backend.remove(TOKEN_KEY)?;
    backend.save(TOKEN_KEY, &token)?;
    if let Err(e) = backend.save(USER_KEY, &user) {
        if let Err(rollback) = backend.remove(TOKEN_KEY) {
            warn!(error = %rollback, "Failed to roll back persisted token");
        }
        return Err(e);
    }
    Ok(())
}

/// Remove both keys, logging failures.
fn remove_pair(backend: &dyn SessionBackend) {
    for key in [USER_KEY, TOKEN_KEY] {
        if let Err(e) = backend.remove(key) {
            warn!(key, error = %e, "Failed to remove persisted session value");
        }
    }
}

fn restore(backend: &dyn SessionBackend) -> Option<Session> {
    let token = read_key::<Credential>(backend, TOKEN_KEY);
    let user = read_key::<Identity>(backend, USER_KEY);

    match (token, user) {
        (Ok(Some(credential)), Ok(Some(identity))) => {
            debug!(user = %identity.username, "Restored persisted session");
            Some(Session {
                credential,
                identity,
            })
        }
        (Ok(None), Ok(None)) => None,
        (token, user) => {
            warn!(
                token_present = matches!(token, Ok(Some(_))),
                user_present = matches!(user, Ok(Some(_))),
                "Discarding incomplete or unreadable persisted session"
            );
            remove_pair(backend);
            None
        }
    }
}

fn read_key<T: serde::de::DeserializeOwned>(
    backend: &dyn SessionBackend,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match backend.load(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
fn set_file_permissions_0600(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
fn set_dir_permissions_0700(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
