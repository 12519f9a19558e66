use std::sync::Arc;

use replica::{EntryKind, Event, EventKind, RelPath, Replica};
use tracing::{debug, warn};

use crate::cache::ChecksumCache;
use crate::error::ReconcileError;
use crate::queue::Side;

/// The single-threaded worker that applies events to two replicas (spec
/// §4.4). `A` is always the local replica, `B` the peer (local or remote).
///
/// Holds one [`ChecksumCache`] per side; both are touched only from here,
/// matching the "single worker reconciles" concurrency guarantee (spec §5).
pub struct Reconciler<A: Replica, B: Replica> {
    replica_a: Arc<A>,
    replica_b: Arc<B>,
    cache_a: ChecksumCache,
    cache_b: ChecksumCache,
    block_size: u32,
}

impl<A: Replica, B: Replica> Reconciler<A, B> {
    /// Builds a reconciler over `replica_a` (local) and `replica_b` (peer),
    /// computing block checksums in chunks of `block_size` bytes.
    #[must_use]
    pub fn new(replica_a: Arc<A>, replica_b: Arc<B>, block_size: u32) -> Self {
        Self {
            replica_a,
            replica_b,
            cache_a: ChecksumCache::new(),
            cache_b: ChecksumCache::new(),
            block_size,
        }
    }

    /// The local replica.
    #[must_use]
    pub fn replica_a(&self) -> &Arc<A> {
        &self.replica_a
    }

    /// The peer replica.
    #[must_use]
    pub fn replica_b(&self) -> &Arc<B> {
        &self.replica_b
    }

    /// Dispatches one event from `origin`, per the action table in spec
    /// §4.4. `requeue` receives any follow-up events this dispatch wants
    /// processed next (e.g. the `DirDeleted` sweep a `DirMoved` schedules).
    pub fn dispatch(
        &self,
        origin: Side,
        event: &Event,
        requeue: &mut dyn FnMut(Side, Event),
    ) -> Result<(), ReconcileError> {
        let key = RelPath::new(event.src_path.as_str());
        match event.kind {
            EventKind::DirCreated => self.on_dir_created(origin, &key),
            EventKind::FileCreated => self.on_file_created(origin, &key),
            EventKind::DirDeleted => self.on_dir_deleted(origin, &key),
            EventKind::FileDeleted => self.on_file_deleted(origin, &key),
            EventKind::FileModified => self.reconcile_file(origin, &key),
            EventKind::DirMoved => {
                let dest = RelPath::new(event.dest_path.as_deref().unwrap_or_default());
                self.on_dir_moved(origin, &key, &dest, requeue)
            }
            EventKind::FileMoved => {
                let dest = RelPath::new(event.dest_path.as_deref().unwrap_or_default());
                self.on_file_moved(origin, &key, &dest)
            }
        }
    }

    fn peer(&self, origin: Side) -> &dyn Replica {
        match origin {
            Side::A => self.replica_b.as_ref(),
            Side::B => self.replica_a.as_ref(),
        }
    }

    fn source(&self, origin: Side) -> &dyn Replica {
        match origin {
            Side::A => self.replica_a.as_ref(),
            Side::B => self.replica_b.as_ref(),
        }
    }

    fn cache_for(&self, side: Side) -> &ChecksumCache {
        match side {
            Side::A => &self.cache_a,
            Side::B => &self.cache_b,
        }
    }

    fn on_dir_created(&self, origin: Side, key: &RelPath) -> Result<(), ReconcileError> {
        // `mkdir` on both replica implementations already swallows
        // already-exists, matching "ignore if it exists" (spec §4.4).
        self.peer(origin).mkdir(key)?;
        Ok(())
    }

    fn on_file_created(&self, origin: Side, key: &RelPath) -> Result<(), ReconcileError> {
        self.peer(origin).accept_from(self.source(origin), key, key)?;
        Ok(())
    }

    fn on_dir_deleted(&self, origin: Side, key: &RelPath) -> Result<(), ReconcileError> {
        let peer = self.peer(origin);
        match peer.rmdir(key) {
            Ok(()) => Ok(()),
            Err(err) if err.is_benign() => Ok(()),
            Err(_) => {
                remove_subtree(peer, key)?;
                Ok(())
            }
        }
    }

    fn on_file_deleted(&self, origin: Side, key: &RelPath) -> Result<(), ReconcileError> {
        self.cache_for(origin).evict(key);
        self.cache_for(origin.other()).evict(key);
        self.peer(origin).remove(key)?;
        Ok(())
    }

    fn on_dir_moved(
        &self,
        origin: Side,
        src: &RelPath,
        dest: &RelPath,
        requeue: &mut dyn FnMut(Side, Event),
    ) -> Result<(), ReconcileError> {
        self.peer(origin).rename(src, dest)?;
        requeue(origin, Event::new(EventKind::DirDeleted, src.as_str().to_string()));
        Ok(())
    }

    fn on_file_moved(&self, origin: Side, src: &RelPath, dest: &RelPath) -> Result<(), ReconcileError> {
        self.peer(origin).rename(src, dest)?;
        self.cache_for(origin).evict(src);
        self.cache_for(origin.other()).evict(src);
        Ok(())
    }

    /// The reconcile-file protocol (spec §4.4): compares both sides'
    /// block-checksum tables and lets the newer mtime win.
    ///
    /// `origin`/`peer` below track "whoever produced this event" versus
    /// "the other side", per spec §4.4's dispatch-table naming — they only
    /// decide the direction of the two missing-file fallbacks. The
    /// newer-mtime tie-break always favors [`Side::A`] (the local replica)
    /// rather than whichever side happened to trigger the event: origin-based
    /// tie-break would make the outcome depend on watcher timing, which
    /// isn't stable under events arriving from both sides for the same path
    /// (see `DESIGN.md`).
    fn reconcile_file(&self, origin: Side, key: &RelPath) -> Result<(), ReconcileError> {
        let origin_replica = self.source(origin);
        let peer_replica = self.peer(origin);

        let stat_peer = match peer_replica.stat(key) {
            Ok(stat) => stat,
            Err(err) if err.is_benign() => {
                return peer_replica.accept_from(origin_replica, key, key).map_err(Into::into);
            }
            Err(err) => return Err(err.into()),
        };
        let stat_origin = match origin_replica.stat(key) {
            Ok(stat) => stat,
            Err(err) if err.is_benign() => {
                self.cache_for(origin).evict(key);
                self.cache_for(origin.other()).evict(key);
                peer_replica.remove(key)?;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        if stat_origin.kind != EntryKind::File || stat_peer.kind != EntryKind::File {
            // A directory observed through a `FileModified` event (a racy
            // watcher notification); nothing to patch.
            return Ok(());
        }

        let a = self.replica_a.as_ref() as &dyn Replica;
        let b = self.replica_b.as_ref() as &dyn Replica;
        let (stat_a, stat_b) = match origin {
            Side::A => (stat_origin, stat_peer),
            Side::B => (stat_peer, stat_origin),
        };

        let cached_a = self.cache_a.get(key);
        let cached_b = self.cache_b.get(key);

        let a_stale = cached_a.as_ref().map_or(true, |c| stat_a.mtime > c.mtime_witness);
        let b_stale = cached_b.as_ref().map_or(true, |c| stat_b.mtime > c.mtime_witness);
        let both_had_prior_entries = cached_a.is_some() && cached_b.is_some();

        let table_a = if a_stale {
            let table = a.block_checksums(key, self.block_size)?;
            self.cache_a.put(key.clone(), stat_a.mtime, table.clone());
            table
        } else {
            cached_a.unwrap().table
        };
        let table_b = if b_stale {
            let table = b.block_checksums(key, self.block_size)?;
            self.cache_b.put(key.clone(), stat_b.mtime, table.clone());
            table
        } else {
            cached_b.unwrap().table
        };

        // A conflict is two independent advances observed since the last
        // reconcile of this path, not merely both tables being computed for
        // the first time the reconciler ever sees the file.
        if a_stale && b_stale && both_had_prior_entries {
            warn!(path = %key, mtime_a = stat_a.mtime, mtime_b = stat_b.mtime, "conflict: both replicas advanced independently");
        }

        let mut a_keys: Vec<&u16> = table_a.keys().collect();
        let mut b_keys: Vec<&u16> = table_b.keys().collect();
        a_keys.sort_unstable();
        b_keys.sort_unstable();
        if a_keys == b_keys {
            debug!(path = %key, "files considered identical, no sync needed");
            return Ok(());
        }

        let a_is_newer = stat_a.mtime >= stat_b.mtime;
        if a_is_newer {
            let instructions = a.delta(key, &table_b, self.block_size)?;
            b.patch(key, &instructions, self.block_size)?;
            let refreshed = b.block_checksums(key, self.block_size)?;
            let new_stat = b.stat(key)?;
            self.cache_b.put(key.clone(), new_stat.mtime, refreshed);
            debug!(path = %key, direction = "A->B", "synced");
        } else {
            let instructions = b.delta(key, &table_a, self.block_size)?;
            a.patch(key, &instructions, self.block_size)?;
            let refreshed = a.block_checksums(key, self.block_size)?;
            let new_stat = a.stat(key)?;
            self.cache_a.put(key.clone(), new_stat.mtime, refreshed);
            debug!(path = %key, direction = "B->A", "synced");
        }
        Ok(())
    }
}

/// Recursively empties `dir` on `replica` bottom-up, then removes it — the
/// `DirDeleted` non-empty fallback in spec §4.4.
fn remove_subtree(replica: &dyn Replica, dir: &RelPath) -> Result<(), ReconcileError> {
    let names = match replica.list(dir) {
        Ok(names) => names,
        Err(err) if err.is_benign() => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    for name in names {
        let child_key = if dir.as_str().is_empty() {
            RelPath::new(name)
        } else {
            RelPath::new(format!("{}/{name}", dir.as_str()))
        };
        match replica.stat(&child_key) {
            Ok(stat) if stat.kind == EntryKind::Dir => {
                remove_subtree(replica, &child_key)?;
            }
            Ok(_) => {
                if let Err(err) = replica.remove(&child_key) {
                    if !err.is_benign() {
                        return Err(err.into());
                    }
                }
            }
            Err(err) if err.is_benign() => {}
            Err(err) => return Err(err.into()),
        }
    }
    match replica.rmdir(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.is_benign() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica::{EventKind, LocalReplica};
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    fn touch_newer(path: &std::path::Path, than: &std::path::Path) {
        let base = fs::metadata(than).unwrap().modified().unwrap();
        filetime::set_file_mtime(path, filetime::FileTime::from_system_time(base + Duration::from_secs(1))).unwrap();
    }

    /// Scenario S2 (spec §8): the newer side's content wins and is patched
    /// onto the older side.
    #[test]
    fn scenario_s2_modify_patches_the_older_side() {
        let a_dir = tempdir().unwrap();
        let b_dir = tempdir().unwrap();
        fs::write(a_dir.path().join("f"), b"hello brave world").unwrap();
        fs::write(b_dir.path().join("f"), b"hello world").unwrap();
        touch_newer(&a_dir.path().join("f"), &b_dir.path().join("f"));

        let a = Arc::new(LocalReplica::open(a_dir.path()).unwrap());
        let b = Arc::new(LocalReplica::open(b_dir.path()).unwrap());
        let reconciler = Reconciler::new(a, b, 4);

        let event = replica::Event::new(EventKind::FileModified, "f".to_string());
        reconciler.dispatch(Side::A, &event, &mut |_, _| {}).unwrap();

        assert_eq!(fs::read(b_dir.path().join("f")).unwrap(), b"hello brave world");
    }

    /// Scenario S3 (spec §8): deleting on one side removes the peer's copy
    /// and evicts both caches.
    #[test]
    fn scenario_s3_delete_removes_peer_and_evicts_caches() {
        let a_dir = tempdir().unwrap();
        let b_dir = tempdir().unwrap();
        fs::write(a_dir.path().join("f"), b"hello").unwrap();
        fs::write(b_dir.path().join("f"), b"hello").unwrap();

        let a = Arc::new(LocalReplica::open(a_dir.path()).unwrap());
        let b = Arc::new(LocalReplica::open(b_dir.path()).unwrap());
        let reconciler = Reconciler::new(a, b, 4096);

        // First pass establishes cache entries for both sides.
        let key = RelPath::new("f");
        let modify_event = replica::Event::new(EventKind::FileModified, "f".to_string());
        reconciler.dispatch(Side::A, &modify_event, &mut |_, _| {}).unwrap();
        assert!(!reconciler.cache_a.is_empty_for(&key));

        fs::remove_file(a_dir.path().join("f")).unwrap();
        let delete_event = replica::Event::new(EventKind::FileDeleted, "f".to_string());
        reconciler.dispatch(Side::A, &delete_event, &mut |_, _| {}).unwrap();

        assert!(!b_dir.path().join("f").exists());
        assert!(reconciler.cache_a.is_empty_for(&key));
        assert!(reconciler.cache_b.is_empty_for(&key));
    }

    /// Scenario S4 (spec §8): a directory move on one side renames the
    /// peer's copy and schedules a `DirDeleted` sweep of the source.
    #[test]
    fn scenario_s4_dir_moved_renames_peer_and_requeues_sweep() {
        let a_dir = tempdir().unwrap();
        let b_dir = tempdir().unwrap();
        fs::create_dir_all(a_dir.path().join("dir")).unwrap();
        fs::create_dir_all(b_dir.path().join("dir")).unwrap();
        fs::write(b_dir.path().join("dir/x"), b"hi").unwrap();

        let a = Arc::new(LocalReplica::open(a_dir.path()).unwrap());
        let b = Arc::new(LocalReplica::open(b_dir.path()).unwrap());
        let reconciler = Reconciler::new(a, b, 4096);

        let mut requeued = Vec::new();
        let event = replica::Event::moved(EventKind::DirMoved, "dir".to_string(), "dir2".to_string());
        reconciler
            .dispatch(Side::A, &event, &mut |side, ev| requeued.push((side, ev)))
            .unwrap();

        assert!(b_dir.path().join("dir2").is_dir());
        assert!(!b_dir.path().join("dir").exists());
        assert!(requeued
            .iter()
            .any(|(side, ev)| *side == Side::A && ev.kind == EventKind::DirDeleted && ev.src_path == "dir"));
    }

    /// Scenario S4's file variant: a file move on one side renames the
    /// peer's copy and evicts both sides' cache entries for the old key.
    #[test]
    fn file_moved_renames_peer_and_evicts_cache() {
        let a_dir = tempdir().unwrap();
        let b_dir = tempdir().unwrap();
        fs::write(a_dir.path().join("f"), b"hello").unwrap();
        fs::write(b_dir.path().join("f"), b"hello").unwrap();

        let a = Arc::new(LocalReplica::open(a_dir.path()).unwrap());
        let b = Arc::new(LocalReplica::open(b_dir.path()).unwrap());
        let reconciler = Reconciler::new(a, b, 4096);

        let key = RelPath::new("f");
        let modify_event = replica::Event::new(EventKind::FileModified, "f".to_string());
        reconciler.dispatch(Side::A, &modify_event, &mut |_, _| {}).unwrap();

        let event = replica::Event::moved(EventKind::FileMoved, "f".to_string(), "g".to_string());
        reconciler.dispatch(Side::A, &event, &mut |_, _| {}).unwrap();

        assert!(b_dir.path().join("g").exists());
        assert!(!b_dir.path().join("f").exists());
        assert!(reconciler.cache_a.is_empty_for(&key));
        assert!(reconciler.cache_b.is_empty_for(&key));
    }

    /// `DirDeleted` on a directory the peer still has non-empty recurses
    /// bottom-up instead of failing (spec §4.4).
    #[test]
    fn dir_deleted_recurses_into_nonempty_peer_subtree() {
        let a_dir = tempdir().unwrap();
        let b_dir = tempdir().unwrap();
        fs::create_dir_all(b_dir.path().join("dir/sub")).unwrap();
        fs::write(b_dir.path().join("dir/x"), b"hi").unwrap();
        fs::write(b_dir.path().join("dir/sub/y"), b"lo").unwrap();

        let a = Arc::new(LocalReplica::open(a_dir.path()).unwrap());
        let b = Arc::new(LocalReplica::open(b_dir.path()).unwrap());
        let reconciler = Reconciler::new(a, b, 4096);

        let event = replica::Event::new(EventKind::DirDeleted, "dir".to_string());
        reconciler.dispatch(Side::A, &event, &mut |_, _| {}).unwrap();

        assert!(!b_dir.path().join("dir").exists());
    }

    /// Scenario S5 (spec §8): once both sides have a prior cache entry and
    /// both advance before the next reconcile, the newer mtime still wins
    /// deterministically (the conflict itself is only logged, per §4.4).
    #[test]
    fn scenario_s5_conflict_newer_mtime_still_wins() {
        let a_dir = tempdir().unwrap();
        let b_dir = tempdir().unwrap();
        fs::write(a_dir.path().join("f"), b"v1").unwrap();
        fs::write(b_dir.path().join("f"), b"v1").unwrap();

        let a = Arc::new(LocalReplica::open(a_dir.path()).unwrap());
        let b = Arc::new(LocalReplica::open(b_dir.path()).unwrap());
        let reconciler = Reconciler::new(a, b, 4096);

        // Establish prior cache entries for both sides.
        let baseline = replica::Event::new(EventKind::FileModified, "f".to_string());
        reconciler.dispatch(Side::A, &baseline, &mut |_, _| {}).unwrap();

        fs::write(a_dir.path().join("f"), b"v2").unwrap();
        filetime::set_file_mtime(
            a_dir.path().join("f"),
            filetime::FileTime::from_unix_time(2_000_000_000, 0),
        )
        .unwrap();
        fs::write(b_dir.path().join("f"), b"v3").unwrap();
        filetime::set_file_mtime(
            b_dir.path().join("f"),
            filetime::FileTime::from_unix_time(2_000_000_001, 0),
        )
        .unwrap();

        reconciler.dispatch(Side::A, &baseline, &mut |_, _| {}).unwrap();

        assert_eq!(fs::read(a_dir.path().join("f")).unwrap(), b"v3");
        assert_eq!(fs::read(b_dir.path().join("f")).unwrap(), b"v3");
    }
}
