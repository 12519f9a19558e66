use std::sync::Mutex;

use checksums::ChecksumTable;
use replica::RelPath;
use rustc_hash::FxHashMap;

/// One cached block-checksum table plus the mtime that was observed when it
/// was computed (spec §3: "invalidated when a later stat shows a newer
/// mtime").
#[derive(Clone)]
pub struct CacheEntry {
    /// The mtime of the file when `table` was computed.
    pub mtime_witness: i64,
    /// The cached block-checksum table.
    pub table: ChecksumTable,
}

/// A single replica's checksum cache, keyed by relative key.
///
/// The spec keys this by absolute path; within one replica a relative key
/// is equivalent information (two replicas never share a cache) and is what
/// the [`replica::Replica`] trait actually exposes, so this crate keys on
/// [`RelPath`] instead of reconstructing an absolute path from a
/// replica-specific root (see `DESIGN.md`).
///
/// Touched only by the single reconciler worker (spec §5: "per-replica
/// caches are touched only by the reconciler worker"), so a plain `Mutex`
/// is sufficient — there is never lock contention in normal operation, only
/// the discipline of not aliasing `&mut` across threads.
#[derive(Default)]
pub struct ChecksumCache {
    entries: Mutex<FxHashMap<RelPath, CacheEntry>>,
}

impl ChecksumCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the cached entry for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &RelPath) -> Option<CacheEntry> {
        self.entries.lock().expect("cache lock poisoned").get(key).cloned()
    }

    /// Replaces (or inserts) the cached entry for `key`.
    pub fn put(&self, key: RelPath, mtime_witness: i64, table: ChecksumTable) {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(key, CacheEntry { mtime_witness, table });
    }

    /// Removes the cached entry for `key`, if any.
    ///
    /// Called when a `FileDeleted` event is reconciled, so no cache entry
    /// ever outlives the file it describes (spec §3 invariant).
    pub fn evict(&self, key: &RelPath) {
        self.entries.lock().expect("cache lock poisoned").remove(key);
    }

    /// `true` if `key` has no cached entry. Exposed for tests asserting
    /// cache coherence after a delete (spec §8 property 4).
    #[must_use]
    pub fn is_empty_for(&self, key: &RelPath) -> bool {
        !self.entries.lock().expect("cache lock poisoned").contains_key(key)
    }
}
