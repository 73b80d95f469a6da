use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

/// A stored GET response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub stored_at: DateTime<Utc>,
}

/// Cache key for a request: SHA-256 over method and URL.
///
/// The `User-Agent` is left out on purpose; it changes on every call and
/// says nothing about the content.
pub fn cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b" ");
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Response store shared by every fetch in the process.
///
/// Implementations must be safe to use from concurrent fetches. Writing the
/// same key twice keeps whichever write landed last.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<CachedPage>>;
    fn put(&self, key: &str, page: &CachedPage) -> io::Result<()>;
}

/// Process-lifetime cache held in memory.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CachedPage>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> io::Result<Option<CachedPage>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, page: &CachedPage) -> io::Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), page.clone());
        Ok(())
    }
}

/// Cache persisted as one JSON file per key, so it survives between runs.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
    expire_after: Option<Duration>,
}

impl DiskCache {
    /// Open (and create if needed) a cache directory.
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            expire_after: None,
        })
    }

    /// Treat entries older than `expire_after` as missing.
    pub fn with_expiry(mut self, expire_after: Duration) -> Self {
        self.expire_after = Some(expire_after);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn is_expired(&self, page: &CachedPage) -> bool {
        let Some(limit) = self.expire_after else {
            return false;
        };
        (Utc::now() - page.stored_at)
            .to_std()
            .map(|age| age > limit)
            .unwrap_or(false)
    }
}

impl CacheStore for DiskCache {
    fn get(&self, key: &str) -> io::Result<Option<CachedPage>> {
        let text = match fs::read_to_string(self.entry_path(key)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let page: CachedPage = serde_json::from_str(&text)?;
        if self.is_expired(&page) {
            tracing::debug!(url = %page.url, "Cache entry expired");
            return Ok(None);
        }
        Ok(Some(page))
    }

    fn put(&self, key: &str, page: &CachedPage) -> io::Result<()> {
        // Write aside and rename so concurrent readers never see half an entry.
        let tmp = self
            .dir
            .join(format!("{key}.{:016x}.tmp", fastrand::u64(..)));
        fs::write(&tmp, serde_json::to_vec(page)?)?;
        fs::rename(&tmp, self.entry_path(key))
    }
}
