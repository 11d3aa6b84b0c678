//! Bounded persistent blob store with atomic per-entry writes

use crate::error::{DiskCacheError, Result};
use crate::journal::{Journal, JournalEntry, BLOB_EXTENSION, JOURNAL_FILE};
use crate::types::DiskCacheStats;
use chrono::{DateTime, Utc};
use resource_key::ResourceKey;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

struct EntryMeta {
    size: u64,
    last_used: u64,
    created_at: DateTime<Utc>,
}

struct Inner {
    entries: HashMap<ResourceKey, EntryMeta>,
    // Keys with an open write handle; at most one writer per key, and these
    // are never eviction victims.
    pending: HashSet<ResourceKey>,
    total_bytes: u64,
    tick: u64,
    stats: DiskCacheStats,
}

/// Persistent blob cache bounded by a byte budget.
///
/// One payload file per key. Entries become visible only through
/// [`WriteHandle::commit`]; the index journal survives restarts once
/// [`BlobDiskCache::flush`] has run.
pub struct BlobDiskCache {
    root: PathBuf,
    budget_bytes: u64,
    inner: Mutex<Inner>,
}

impl BlobDiskCache {
    /// Open (or create) a cache directory bounded by `budget_bytes`.
    ///
    /// Fails if the directory cannot be created or the filesystem has less
    /// free space than the budget. An existing journal is reloaded and
    /// reconciled against the payload files actually present: files missing
    /// from the journal are adopted as least recently used in modification
    /// order, journal entries without a payload file are dropped.
    pub fn open(root: impl Into<PathBuf>, budget_bytes: u64) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let available = free_space(&root)?;
        if available < budget_bytes {
            return Err(DiskCacheError::InsufficientSpace {
                available,
                required: budget_bytes,
            });
        }

        let inner = load_state(&root)?;
        info!(
            root = %root.display(),
            entries = inner.entries.len(),
            total_bytes = inner.total_bytes,
            "opened disk cache"
        );

        let cache = Self {
            root,
            budget_bytes,
            inner: Mutex::new(inner),
        };

        // The budget may have shrunk since the last run; trim before the
        // first request comes in.
        {
            let mut guard = cache.inner.lock().unwrap();
            let inner = &mut *guard;
            cache.evict_over_budget(inner);
            sync_stats(inner);
        }
        Ok(cache)
    }

    /// Read the blob stored under `key`, marking it most recently used.
    ///
    /// Returns `Ok(None)` on a miss. A payload file that has vanished
    /// underneath the index is dropped from it and reported as a miss.
    pub fn get(&self, key: &ResourceKey) -> Result<Option<Vec<u8>>> {
        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;

        if !inner.entries.contains_key(key) {
            inner.stats.misses += 1;
            return Ok(None);
        }

        match fs::read(self.blob_path(key)) {
            Ok(data) => {
                inner.tick += 1;
                if let Some(entry) = inner.entries.get_mut(key) {
                    entry.last_used = inner.tick;
                }
                inner.stats.hits += 1;
                Ok(Some(data))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(key = %key, "payload file vanished; dropping index entry");
                if let Some(entry) = inner.entries.remove(key) {
                    inner.total_bytes -= entry.size;
                }
                inner.stats.misses += 1;
                sync_stats(inner);
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Start writing the blob for `key`.
    ///
    /// Returns `Ok(None)` while another handle for the same key is open; the
    /// store supports at most one writer per key at a time. The handle must
    /// be committed or aborted; dropping it without either discards the
    /// written bytes, leaving the prior entry state untouched.
    pub fn begin_write(&self, key: &ResourceKey) -> Result<Option<WriteHandle<'_>>> {
        {
            let mut inner = self.inner.lock().unwrap();
            if !inner.pending.insert(key.clone()) {
                debug!(key = %key, "write already in progress for key");
                return Ok(None);
            }
        }

        match NamedTempFile::new_in(&self.root) {
            Ok(tmp) => Ok(Some(WriteHandle {
                cache: self,
                key: key.clone(),
                tmp: Some(tmp),
            })),
            Err(err) => {
                self.clear_pending(key);
                Err(err.into())
            }
        }
    }

    /// Persist the index journal to durable storage.
    ///
    /// A committed entry is guaranteed to survive a crash only after the
    /// next `flush`.
    pub fn flush(&self) -> Result<()> {
        let entries: Vec<JournalEntry> = {
            let inner = self.inner.lock().unwrap();
            let mut items: Vec<(&ResourceKey, &EntryMeta)> = inner.entries.iter().collect();
            items.sort_by_key(|(_, entry)| entry.last_used);
            items
                .into_iter()
                .map(|(key, entry)| JournalEntry {
                    key: key.as_str().to_string(),
                    size: entry.size,
                    created_at: entry.created_at,
                })
                .collect()
        };

        let bytes = serde_json::to_vec_pretty(&Journal { entries })?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(self.root.join(JOURNAL_FILE))
            .map_err(|err| DiskCacheError::from(err.error))?;
        Ok(())
    }

    /// Whether `key` currently has a committed entry. Does not bump recency.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.inner.lock().unwrap().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of committed payload sizes in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.inner.lock().unwrap().total_bytes
    }

    pub fn budget_bytes(&self) -> u64 {
        self.budget_bytes
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> DiskCacheStats {
        self.inner.lock().unwrap().stats.clone()
    }

    fn blob_path(&self, key: &ResourceKey) -> PathBuf {
        self.root
            .join(format!("{}.{}", key.as_str(), BLOB_EXTENSION))
    }

    fn clear_pending(&self, key: &ResourceKey) {
        self.inner.lock().unwrap().pending.remove(key);
    }

    /// Publish a finished temp file under `key`, replacing prior content,
    /// then evict until the cache is back under budget.
    fn publish(&self, key: &ResourceKey, mut tmp: NamedTempFile) -> Result<()> {
        tmp.flush()?;
        let size = tmp.as_file().metadata()?.len();
        tmp.persist(self.blob_path(key))
            .map_err(|err| DiskCacheError::from(err.error))?;

        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        inner.tick += 1;
        let prior = inner.entries.insert(
            key.clone(),
            EntryMeta {
                size,
                last_used: inner.tick,
                created_at: Utc::now(),
            },
        );
        inner.total_bytes += size;
        if let Some(prior) = prior {
            inner.total_bytes -= prior.size;
        }
        inner.stats.writes += 1;
        self.evict_over_budget(inner);
        sync_stats(inner);
        debug!(key = %key, size, "committed blob");
        Ok(())
    }

    /// Evict least-recently-used entries until the total is within budget.
    /// Keys with an open write handle are skipped.
    fn evict_over_budget(&self, inner: &mut Inner) {
        while inner.total_bytes > self.budget_bytes {
            let victim = inner
                .entries
                .iter()
                .filter(|(key, _)| !inner.pending.contains(key))
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());

            let Some(key) = victim else {
                break;
            };
            let Some(entry) = inner.entries.remove(&key) else {
                break;
            };

            match fs::remove_file(self.blob_path(&key)) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                // The index entry is gone either way; a leftover file is
                // re-adopted on the next open.
                Err(err) => warn!(key = %key, error = %err, "failed to remove evicted blob"),
            }

            inner.total_bytes -= entry.size;
            inner.stats.evictions += 1;
            debug!(key = %key, size = entry.size, "evicted blob from disk cache");
        }
    }
}

/// In-flight write for a single key.
///
/// Bytes go to a temp file in the cache directory; `commit` publishes them
/// atomically, `abort` (or drop) discards them. Exactly one of the two
/// happens on every exit path.
pub struct WriteHandle<'a> {
    cache: &'a BlobDiskCache,
    key: ResourceKey,
    tmp: Option<NamedTempFile>,
}

impl WriteHandle<'_> {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Atomically make the written bytes visible under the key, replacing
    /// any prior content.
    pub fn commit(mut self) -> Result<()> {
        match self.tmp.take() {
            Some(tmp) => {
                let result = self.cache.publish(&self.key, tmp);
                self.cache.clear_pending(&self.key);
                result
            }
            None => Ok(()),
        }
    }

    /// Discard the written bytes; the key keeps its prior state.
    pub fn abort(mut self) {
        if let Some(tmp) = self.tmp.take() {
            drop(tmp);
            self.cache.clear_pending(&self.key);
        }
    }
}

impl Write for WriteHandle<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.tmp.as_mut() {
            Some(tmp) => tmp.write(buf),
            None => Err(io::Error::other("write handle already closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.tmp.as_mut() {
            Some(tmp) => tmp.flush(),
            None => Err(io::Error::other("write handle already closed")),
        }
    }
}

impl Drop for WriteHandle<'_> {
    fn drop(&mut self) {
        if let Some(tmp) = self.tmp.take() {
            debug!(key = %self.key, "write handle dropped without commit; discarding");
            drop(tmp);
            self.cache.clear_pending(&self.key);
        }
    }
}

/// Rebuild in-memory state from the journal and a directory scan.
fn load_state(root: &Path) -> Result<Inner> {
    let journal = read_journal(root)?;

    // Ground truth: the payload files actually present.
    let mut on_disk: HashMap<ResourceKey, (u64, SystemTime)> = HashMap::new();
    for dir_entry in fs::read_dir(root)? {
        let path = dir_entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(BLOB_EXTENSION) {
            continue;
        }
        let Some(key) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(ResourceKey::from_hex)
        else {
            continue;
        };
        let metadata = fs::metadata(&path)?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        on_disk.insert(key, (metadata.len(), modified));
    }

    let mut entries = HashMap::new();
    let mut total_bytes = 0u64;
    let mut tick = 0u64;

    // Files unknown to the journal come first, ordered by mtime, so they
    // rank as least recently used.
    let journal_keys: HashSet<&str> = journal
        .entries
        .iter()
        .map(|entry| entry.key.as_str())
        .collect();
    let mut orphans: Vec<(&ResourceKey, u64, SystemTime)> = on_disk
        .iter()
        .filter(|(key, _)| !journal_keys.contains(key.as_str()))
        .map(|(key, (size, modified))| (key, *size, *modified))
        .collect();
    orphans.sort_by_key(|(_, _, modified)| *modified);

    for (key, size, modified) in orphans {
        tick += 1;
        entries.insert(
            key.clone(),
            EntryMeta {
                size,
                last_used: tick,
                created_at: DateTime::<Utc>::from(modified),
            },
        );
        total_bytes += size;
    }

    // Journal order encodes recency; entries whose payload is gone are
    // dropped.
    for journal_entry in &journal.entries {
        let Some(key) = ResourceKey::from_hex(&journal_entry.key) else {
            debug!(key = %journal_entry.key, "malformed key in journal; skipping");
            continue;
        };
        let Some((size, _)) = on_disk.get(&key) else {
            debug!(key = %key, "journal entry without payload file; dropping");
            continue;
        };
        tick += 1;
        entries.insert(
            key,
            EntryMeta {
                size: *size,
                last_used: tick,
                created_at: journal_entry.created_at,
            },
        );
        total_bytes += size;
    }

    Ok(Inner {
        entries,
        pending: HashSet::new(),
        total_bytes,
        tick,
        stats: DiskCacheStats::default(),
    })
}

fn read_journal(root: &Path) -> Result<Journal> {
    match fs::read(root.join(JOURNAL_FILE)) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(journal) => Ok(journal),
            Err(err) => {
                warn!(error = %err, "corrupt cache journal; rebuilding from directory scan");
                Ok(Journal { entries: Vec::new() })
            }
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Journal { entries: Vec::new() }),
        Err(err) => Err(err.into()),
    }
}

fn sync_stats(inner: &mut Inner) {
    inner.stats.entries = inner.entries.len();
    inner.stats.total_bytes = inner.total_bytes;
}

/// Free space on the filesystem holding `path`.
#[cfg(unix)]
fn free_space(path: &Path) -> Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| DiskCacheError::from(io::Error::other("path contains a NUL byte")))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}

#[cfg(not(unix))]
fn free_space(_path: &Path) -> Result<u64> {
    // No portable probe; rely on the byte budget alone.
    Ok(u64::MAX)
}
