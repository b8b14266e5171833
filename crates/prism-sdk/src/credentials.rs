//! Credential stores.
//!
//! The store is the single writer of the current [`Credential`]. The
//! gateway reads the access token from it and delegates every update
//! (refreshed pair, logout, failed refresh) back to it.
//!
//! * [`MemoryCredentialStore`] – process-lifetime session.
//! * [`FileCredentialStore`] – persisted under the user config directory
//!   and hydrated when opened.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use prism_models::Credential;
use tracing::{debug, warn};

const APP_DIR: &str = "prism-admin";
const CREDENTIALS_FILE: &str = "credentials.json";

/// Owner of the current credential.
pub trait CredentialStore: Send + Sync {
    /// The current credential, if logged in.
    fn current(&self) -> Option<Credential>;

    /// Replace the current credential.
    ///
    /// Credentials without an access token are refused and leave the store
    /// unchanged.
    fn set_current(&self, credential: Credential);

    /// Forget the current credential.
    fn clear(&self);

    /// Whether persisted state has been loaded. Navigation guards should
    /// wait for this before redirecting an empty session to login.
    fn is_hydrated(&self) -> bool {
        true
    }

    /// Current access token, if any.
    fn access_token(&self) -> Option<String> {
        self.current().map(|c| c.access_token)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Credential held for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Option<Credential>>,
}

impl MemoryCredentialStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a credential.
    pub fn with_credential(credential: Credential) -> Self {
        let store = Self::new();
        store.set_current(credential);
        store
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn current(&self) -> Option<Credential> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current(&self, credential: Credential) {
        if let Err(e) = credential.validate() {
            warn!(error = %e, "refusing to store credential");
            return;
        }
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Credential persisted as JSON so that a session survives restarts.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    inner: RwLock<Option<Credential>>,
    hydrated: AtomicBool,
}

impl FileCredentialStore {
    /// Open the store at `<config dir>/prism-admin/credentials.json`.
    pub fn open_default() -> io::Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no config directory"))?
            .join(APP_DIR);
        Ok(Self::open(dir.join(CREDENTIALS_FILE)))
    }

    /// Open the store at an explicit path and hydrate it.
    ///
    /// A missing file is an empty session; an unreadable or corrupt file is
    /// logged and treated the same way.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            path: path.into(),
            inner: RwLock::new(None),
            hydrated: AtomicBool::new(false),
        };
        store.hydrate();
        store
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn hydrate(&self) {
        let loaded = match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Credential>(&content) {
                Ok(credential) if credential.validate().is_ok() => {
                    debug!(path = %self.path.display(), "credential restored");
                    Some(credential)
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "ignoring corrupt credential file");
                    None
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read credential file");
                None
            }
        };
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = loaded;
        self.hydrated.store(true, Ordering::Release);
    }

    fn persist(&self, credential: &Credential) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(credential)?;
        fs::write(&self.path, json)
    }
}

impl CredentialStore for FileCredentialStore {
    fn current(&self) -> Option<Credential> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current(&self, credential: Credential) {
        if let Err(e) = credential.validate() {
            warn!(error = %e, "refusing to store credential");
            return;
        }
        if let Err(e) = self.persist(&credential) {
            warn!(path = %self.path.display(), error = %e, "failed to persist credential");
        }
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "credential file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove credential file"),
        }
    }

    fn is_hydrated(&self) -> bool {
        self.hydrated.load(Ordering::Acquire)
    }
}
