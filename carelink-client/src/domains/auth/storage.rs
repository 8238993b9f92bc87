//! Local storage for session credentials
//!
//! Three values make up the persisted session: the access token, the refresh
//! token and the cached user profile. They live under a fixed namespace and
//! are always cleared together. The two tokens are stored as one
//! [`Credential`] so a reader can never observe half of a pair.
//!
//! Only [`SessionManager`](super::manager::SessionManager) writes to a store.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use carelink_model::{Credential, UserProfile};
use log::{debug, warn};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use super::errors::{StorageError, StorageResult};

/// Persistence backend for the session credential and profile cache.
#[async_trait]
pub trait CredentialStore: Send + Sync + fmt::Debug {
    /// Replace both tokens in one step.
    async fn save(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> StorageResult<()>;

    /// Swap the access token, keeping the stored refresh token.
    async fn replace_access_token(&self, access_token: &str)
    -> StorageResult<()>;

    async fn credential(&self) -> Option<Credential>;

    async fn access_token(&self) -> Option<String> {
        self.credential()
            .await
            .map(|c| c.access_token().to_string())
    }

    async fn refresh_token(&self) -> Option<String> {
        self.credential()
            .await
            .map(|c| c.refresh_token().to_string())
    }

    async fn save_user(&self, user: &UserProfile) -> StorageResult<()>;

    async fn cached_user(&self) -> Option<UserProfile>;

    /// Remove tokens and profile. Succeeds when nothing is stored.
    async fn clear(&self) -> StorageResult<()>;
}

/// Everything a store holds, swapped as a unit.
#[derive(Debug, Clone, Default)]
struct SessionSnapshot {
    credential: Option<Credential>,
    user: Option<UserProfile>,
}

impl SessionSnapshot {
    fn with_access_token(&self, access_token: &str) -> StorageResult<Self> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(StorageError::NoCredential)?
            .with_access_token(access_token);
        Ok(Self {
            credential: Some(credential),
            user: self.user.clone(),
        })
    }
}

/// Process-local, in-memory store.
#[derive(Default)]
pub struct MemoryCredentialStore {
    snapshot: RwLock<SessionSnapshot>,
}

impl fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot.read();
        f.debug_struct("MemoryCredentialStore")
            .field("has_credential", &snapshot.credential.is_some())
            .field("has_user", &snapshot.user.is_some())
            .finish()
    }
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn save(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> StorageResult<()> {
        self.snapshot.write().credential =
            Some(Credential::new(access_token, refresh_token));
        Ok(())
    }

    async fn replace_access_token(
        &self,
        access_token: &str,
    ) -> StorageResult<()> {
        let mut snapshot = self.snapshot.write();
        *snapshot = snapshot.with_access_token(access_token)?;
        Ok(())
    }

    async fn credential(&self) -> Option<Credential> {
        self.snapshot.read().credential.clone()
    }

    async fn save_user(&self, user: &UserProfile) -> StorageResult<()> {
        self.snapshot.write().user = Some(user.clone());
        Ok(())
    }

    async fn cached_user(&self) -> Option<UserProfile> {
        self.snapshot.read().user.clone()
    }

    async fn clear(&self) -> StorageResult<()> {
        *self.snapshot.write() = SessionSnapshot::default();
        Ok(())
    }
}

/// Storage key names under a namespace.
#[derive(Debug, Clone)]
struct StorageKeys {
    access_token: String,
    refresh_token: String,
    user: String,
}

impl StorageKeys {
    fn new(namespace: &str) -> Self {
        Self {
            access_token: format!("{namespace}.accessToken"),
            refresh_token: format!("{namespace}.refreshToken"),
            user: format!("{namespace}.user"),
        }
    }
}

/// JSON document on disk, mirrored in memory.
///
/// The file is read once when the store is opened; afterwards the in-memory
/// copy answers reads and every mutation rewrites the whole document through
/// a temporary file that is atomically renamed into place.
pub struct FileCredentialStore {
    path: PathBuf,
    namespace: String,
    keys: StorageKeys,
    snapshot: RwLock<SessionSnapshot>,
}

impl fmt::Debug for FileCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCredentialStore")
            .field("path", &self.path)
            .field("namespace", &self.namespace)
            .field("has_credential", &self.snapshot.read().credential.is_some())
            .finish()
    }
}

impl FileCredentialStore {
    /// Open the session document at `path`, creating nothing until the
    /// first write. An unreadable or malformed document is discarded with a
    /// warning; the session simply starts signed out.
    pub fn open(path: impl Into<PathBuf>, namespace: &str) -> Self {
        let path = path.into();
        let keys = StorageKeys::new(namespace);
        let snapshot = match read_document(&path, &keys) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "[CredentialStore] Ignoring unusable session file: {}",
                    e
                );
                SessionSnapshot::default()
            }
        };

        Self {
            path,
            namespace: namespace.to_string(),
            keys,
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Like [`open`](Self::open) but fails instead of discarding a bad
    /// document.
    pub fn open_strict(
        path: impl Into<PathBuf>,
        namespace: &str,
    ) -> StorageResult<Self> {
        let path = path.into();
        let keys = StorageKeys::new(namespace);
        let snapshot = read_document(&path, &keys)?;
        Ok(Self {
            path,
            namespace: namespace.to_string(),
            keys,
            snapshot: RwLock::new(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the updated snapshot and publish it. The write lock is held across the
    /// disk write so readers see either the old or the new snapshot.
    fn commit<F>(&self, update: F) -> StorageResult<()>
    where
        F: FnOnce(&SessionSnapshot) -> StorageResult<SessionSnapshot>,
    {
        let mut current = self.snapshot.write();
        let next = update(&current)?;
        write_document(&self.path, &self.keys, &next)?;
        *current = next;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn save(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> StorageResult<()> {
        self.commit(|current| {
            Ok(SessionSnapshot {
                credential: Some(Credential::new(access_token, refresh_token)),
                user: current.user.clone(),
            })
        })
    }

    async fn replace_access_token(
        &self,
        access_token: &str,
    ) -> StorageResult<()> {
        self.commit(|current| current.with_access_token(access_token))
    }

    async fn credential(&self) -> Option<Credential> {
        self.snapshot.read().credential.clone()
    }

    async fn save_user(&self, user: &UserProfile) -> StorageResult<()> {
        self.commit(|current| {
            Ok(SessionSnapshot {
                credential: current.credential.clone(),
                user: Some(user.clone()),
            })
        })
    }

    async fn cached_user(&self) -> Option<UserProfile> {
        self.snapshot.read().user.clone()
    }

    /// The in-memory session is dropped first, so a failed file removal
    /// still leaves the store signed out for this process.
    async fn clear(&self) -> StorageResult<()> {
        let mut current = self.snapshot.write();
        *current = SessionSnapshot::default();
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("[CredentialStore] Removed session file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::WriteFailed {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn read_document(
    path: &Path,
    keys: &StorageKeys,
) -> StorageResult<SessionSnapshot> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SessionSnapshot::default());
        }
        Err(source) => {
            return Err(StorageError::ReadFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let corrupted = |source| StorageError::CorruptedData {
        path: path.to_path_buf(),
        source,
    };
    let mut document: Map<String, Value> =
        serde_json::from_slice(&raw).map_err(corrupted)?;

    let access = take_string(&mut document, &keys.access_token);
    let refresh = take_string(&mut document, &keys.refresh_token);
    let credential = match (access, refresh) {
        (Some(access), Some(refresh)) => Some(Credential::new(access, refresh)),
        (None, None) => None,
        _ => {
            warn!(
                "[CredentialStore] Session file holds half a token pair; discarding it"
            );
            None
        }
    };

    let user = match document.remove(&keys.user) {
        Some(Value::Null) | None => None,
        Some(value) => Some(serde_json::from_value(value).map_err(corrupted)?),
    };

    Ok(SessionSnapshot { credential, user })
}

fn take_string(document: &mut Map<String, Value>, key: &str) -> Option<String> {
    match document.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn write_document(
    path: &Path,
    keys: &StorageKeys,
    snapshot: &SessionSnapshot,
) -> StorageResult<()> {
    let write_failed = |source| StorageError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut document = Map::new();
    if let Some(credential) = &snapshot.credential {
        document.insert(
            keys.access_token.clone(),
            Value::String(credential.access_token().to_string()),
        );
        document.insert(
            keys.refresh_token.clone(),
            Value::String(credential.refresh_token().to_string()),
        );
    }
    if let Some(user) = &snapshot.user {
        let value = serde_json::to_value(user).map_err(|source| {
            StorageError::CorruptedData {
                path: path.to_path_buf(),
                source,
            }
        })?;
        document.insert(keys.user.clone(), value);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_failed)?;

    let mut file = NamedTempFile::new_in(dir).map_err(write_failed)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(write_failed)?;
    }
    let body = serde_json::to_vec_pretty(&Value::Object(document)).map_err(
        |source| StorageError::CorruptedData {
            path: path.to_path_buf(),
            source,
        },
    )?;
    file.write_all(&body).map_err(write_failed)?;
    file.as_file().sync_all().map_err(write_failed)?;
    file.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}
