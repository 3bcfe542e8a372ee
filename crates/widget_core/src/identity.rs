//! Anonymous user identity backed by an ordered list of storage tiers.
//!
//! On a cache miss the resolver walks the tiers once, in priority order. A tier
//! wins when it either already holds an identifier or accepts a freshly
//! generated one. When every tier fails the identifier lives only in the
//! resolver's memory.

use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, OnceLock, PoisonError,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use rand::{rngs::OsRng, rngs::StdRng, RngCore, SeedableRng};
use shared::error::StorageError;
use tracing::debug;
use uuid::Builder;

pub const USER_ID_STORAGE_KEY: &str = "feedback_widget_user_id";

const DATA_DIR_NAME: &str = "feedback_widget";

static SESSION_ENTRIES: OnceLock<Arc<Mutex<HashMap<String, String>>>> = OnceLock::new();
static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One storage tier. Each call may fail independently; the resolver treats
/// every failure the same way and moves on to the next tier.
pub trait IdentityStore: Send + Sync {
    fn name(&self) -> &'static str;
    fn try_read(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn try_write(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn try_remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Durable cross-session tier: one file per key under a directory.
pub struct FileStore {
    dir: Option<PathBuf>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Store rooted in the platform data directory. Unavailable when the
    /// platform reports none.
    pub fn user_data_dir() -> Self {
        Self {
            dir: dirs::data_dir().map(|dir| dir.join(DATA_DIR_NAME)),
        }
    }

    fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(key))
            .ok_or_else(|| StorageError::Unavailable("no user data directory".into()))
    }
}

impl IdentityStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    fn try_read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)?) {
            Ok(raw) => {
                let value = raw.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn try_write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, value)?;
        Ok(())
    }

    fn try_remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Session-scoped tier: lives as long as the process.
#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionStore {
    /// The process-wide session shared by every widget in the process.
    pub fn shared() -> Self {
        Self {
            entries: SESSION_ENTRIES.get_or_init(Default::default).clone(),
        }
    }

    /// A private session, detached from the process-wide one.
    pub fn isolated() -> Self {
        Self {
            entries: Arc::default(),
        }
    }

    fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("session store poisoned".into()))
    }
}

impl IdentityStore for SessionStore {
    fn name(&self) -> &'static str {
        "session"
    }

    fn try_read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn try_write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn try_remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

pub struct IdentityResolver {
    tiers: Vec<Arc<dyn IdentityStore>>,
    cached: Mutex<Option<String>>,
}

impl IdentityResolver {
    pub fn new(tiers: Vec<Arc<dyn IdentityStore>>) -> Self {
        Self {
            tiers,
            cached: Mutex::new(None),
        }
    }

    /// File store in the user data directory, then the process session.
    pub fn with_default_tiers() -> Self {
        Self::new(vec![
            Arc::new(FileStore::user_data_dir()),
            Arc::new(SessionStore::shared()),
        ])
    }

    /// Resolver with no storage at all; the identifier is memory-only.
    pub fn in_memory() -> Self {
        Self::new(Vec::new())
    }

    pub fn user_id(&self) -> String {
        let mut cached = self.cache();
        if let Some(user_id) = cached.as_ref() {
            return user_id.clone();
        }
        let user_id = self.resolve();
        *cached = Some(user_id.clone());
        user_id
    }

    /// Forgets the identifier in every tier and in memory. Failures are ignored.
    pub fn clear_user_id(&self) {
        for tier in &self.tiers {
            if let Err(error) = tier.try_remove(USER_ID_STORAGE_KEY) {
                debug!(tier = tier.name(), %error, "failed to clear user id");
            }
        }
        *self.cache() = None;
    }

    fn resolve(&self) -> String {
        for tier in &self.tiers {
            match resolve_in_tier(tier.as_ref()) {
                Ok(user_id) => {
                    debug!(tier = tier.name(), "resolved user id");
                    return user_id;
                }
                Err(error) => {
                    debug!(tier = tier.name(), %error, "identity tier unavailable, falling back");
                }
            }
        }
        debug!("no storage tier available, keeping user id in memory");
        generate_user_id()
    }

    fn cache(&self) -> MutexGuard<'_, Option<String>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn resolve_in_tier(store: &dyn IdentityStore) -> Result<String, StorageError> {
    if let Some(existing) = store.try_read(USER_ID_STORAGE_KEY)? {
        return Ok(existing);
    }
    let user_id = generate_user_id();
    store.try_write(USER_ID_STORAGE_KEY, &user_id)?;
    Ok(user_id)
}

/// Random 128-bit identifier in UUIDv4 text form.
pub fn generate_user_id() -> String {
    let mut bytes = [0u8; 16];
    if let Err(error) = OsRng.try_fill_bytes(&mut bytes) {
        debug!(%error, "os random source unavailable, using seeded generator");
        fill_from_fallback(&mut bytes);
    }
    format_v4(bytes)
}

fn fill_from_fallback(bytes: &mut [u8; 16]) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default();
    let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut rng = StdRng::seed_from_u64(nanos ^ counter.rotate_left(32));
    rng.fill_bytes(bytes);
}

fn format_v4(bytes: [u8; 16]) -> String {
    Builder::from_random_bytes(bytes).into_uuid().to_string()
}

#[cfg(test)]
#[path = "tests/identity_tests.rs"]
mod tests;
