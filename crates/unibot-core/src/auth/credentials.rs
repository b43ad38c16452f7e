use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use keyring::Entry;
use tracing::debug;

use crate::api::{ApiError, ApiResult};

/// Store key holding the access token.
pub const ACCESS_KEY: &str = "unibot_access";

/// Store key holding the refresh token.
pub const REFRESH_KEY: &str = "unibot_refresh";

/// Keyring service name used by `KeyringStore::default()`.
const SERVICE_NAME: &str = "unibot";

/// Access + refresh token pair. Both halves are always present.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Durable string key-value storage. Each single-key operation is atomic.
pub trait CredentialStore {
    fn get(&self, key: &str) -> ApiResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ApiResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> ApiResult<()>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for Box<S> {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        (**self).remove(key)
    }
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ApiResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| ApiError::store("memory store lock poisoned"))
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// JSON object on disk, one property per key.
///
/// Writes go to a sibling temp file and are renamed into place, so a reader
/// never observes a half-written file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> ApiResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            ApiError::store(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            ApiError::store(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> ApiResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ApiError::store(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| ApiError::store(format!("Failed to serialize credentials: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, contents.as_bytes())
            .map_err(|e| ApiError::store(format!("Failed to write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            ApiError::store(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> ApiResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| ApiError::store("file store lock poisoned"))?;
        let mut entries = self.read_entries()?;
        if apply(&mut entries) {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// Write `contents` to `path`, readable by the owner only on Unix.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; a leftover temp file keeps its bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(contents)?;
    file.sync_all()
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

/// OS keychain, one entry per key under a shared service name.
#[derive(Clone, Debug)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> ApiResult<Entry> {
        Entry::new(&self.service, key)
            .map_err(|e| ApiError::store(format!("Failed to create keyring entry: {}", e)))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: &str) -> ApiResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ApiError::store(format!(
                "Failed to read {} from keychain: {}",
                key, e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> ApiResult<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| ApiError::store(format!("Failed to store {} in keychain: {}", key, e)))
    }

    fn remove(&self, key: &str) -> ApiResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ApiError::store(format!(
                "Failed to delete {} from keychain: {}",
                key, e
            ))),
        }
    }
}

/// Read the pair from a store. A missing or empty half means no credentials.
pub fn load_pair<S: CredentialStore + ?Sized>(store: &S) -> ApiResult<Option<CredentialPair>> {
    let access = store.get(ACCESS_KEY)?.filter(|v| !v.is_empty());
    let refresh = store.get(REFRESH_KEY)?.filter(|v| !v.is_empty());
    match (access, refresh) {
        (Some(access_token), Some(refresh_token)) => Ok(Some(CredentialPair {
            access_token,
            refresh_token,
        })),
        (access, refresh) => {
            if access.is_some() || refresh.is_some() {
                debug!("Ignoring partial credential pair");
            }
            Ok(None)
        }
    }
}

pub fn save_pair<S: CredentialStore + ?Sized>(store: &S, pair: &CredentialPair) -> ApiResult<()> {
    store.set(ACCESS_KEY, &pair.access_token)?;
    store.set(REFRESH_KEY, &pair.refresh_token)?;
    Ok(())
}

pub fn clear_pair<S: CredentialStore + ?Sized>(store: &S) -> ApiResult<()> {
    store.remove(ACCESS_KEY)?;
    store.remove(REFRESH_KEY)?;
    Ok(())
}
