use std::io::{Read, Write};

use checksums::{ChecksumTable, Instruction};

use crate::error::ReplicaError;
use crate::event::Event;
use crate::path::RelPath;
use crate::stat::Stat;

/// A uniform capability set over a local or remote tree (spec §4.2).
///
/// Every capability the reconciler needs is a method here, so reconciler
/// code never inspects which concrete kind (`LocalReplica`/`RemoteReplica`)
/// it is holding. Cross-replica transfer, in particular, is a capability of
/// the *destination* alone ([`accept_from`](Self::accept_from)) — no
/// variant matching is needed to decide whether bytes should be streamed
/// over a transport or byte-copied locally, resolving the "cyclic graph of
/// replica instances" design smell (see `DESIGN.md`).
pub trait Replica: Send + Sync {
    /// Lists the entry names directly under `dir` (not recursive).
    fn list(&self, dir: &RelPath) -> Result<Vec<String>, ReplicaError>;

    /// Returns metadata for `path`.
    fn stat(&self, path: &RelPath) -> Result<Stat, ReplicaError>;

    /// Creates `path` as a directory; the parent must already exist.
    fn mkdir(&self, path: &RelPath) -> Result<(), ReplicaError>;

    /// Creates `path` as a directory, creating any missing parents too.
    fn mkdirs(&self, path: &RelPath) -> Result<(), ReplicaError>;

    /// Removes the (empty) directory at `path`.
    fn rmdir(&self, path: &RelPath) -> Result<(), ReplicaError>;

    /// Removes the file at `path`.
    fn remove(&self, path: &RelPath) -> Result<(), ReplicaError>;

    /// Renames `src` to `dst`, both relative keys on this replica.
    fn rename(&self, src: &RelPath, dst: &RelPath) -> Result<(), ReplicaError>;

    /// Opens `path` for sequential reading.
    fn open_read(&self, path: &RelPath) -> Result<Box<dyn Read + Send>, ReplicaError>;

    /// Opens `path` for writing, truncating any existing content.
    fn open_write(&self, path: &RelPath) -> Result<Box<dyn Write + Send>, ReplicaError>;

    /// Computes the block-checksum table for `path` on this replica.
    fn block_checksums(&self, path: &RelPath, block_size: u32) -> Result<ChecksumTable, ReplicaError>;

    /// Computes the delta of `path` on this replica against `table`
    /// (computed on the peer replica).
    fn delta(
        &self,
        path: &RelPath,
        table: &ChecksumTable,
        block_size: u32,
    ) -> Result<Vec<Instruction>, ReplicaError>;

    /// Applies `delta` to `path` on this replica, atomically.
    fn patch(&self, path: &RelPath, delta: &[Instruction], block_size: u32) -> Result<(), ReplicaError>;

    /// Drains and returns events observed since the last call (watcher
    /// push events for a local replica, synthesized poll events for a
    /// remote one).
    fn poll_events(&self) -> Result<Vec<Event>, ReplicaError>;

    /// Strips this replica's root off `path`, producing its relative key.
    fn relative_key(&self, path: &str) -> RelPath;

    /// Copies `src_path` on `source` to `dst_path` on `self`.
    ///
    /// Retries exactly once after `mkdirs`-ing the destination's parent if
    /// the first attempt fails because the parent directory is missing
    /// (spec §4.2).
    fn accept_from(
        &self,
        source: &dyn Replica,
        src_path: &RelPath,
        dst_path: &RelPath,
    ) -> Result<(), ReplicaError> {
        match self.copy_once(source, src_path, dst_path) {
            Err(ReplicaError::NotFound(_)) => {
                if let Some(parent) = dst_path.parent() {
                    self.mkdirs(&parent)?;
                }
                self.copy_once(source, src_path, dst_path)
            }
            other => other,
        }
    }

    /// Single copy attempt backing [`accept_from`](Self::accept_from),
    /// split out so the retry path doesn't duplicate the stream loop.
    fn copy_once(
        &self,
        source: &dyn Replica,
        src_path: &RelPath,
        dst_path: &RelPath,
    ) -> Result<(), ReplicaError> {
        let mut reader = source.open_read(src_path)?;
        let mut writer = self.open_write(dst_path)?;
        std::io::copy(&mut reader, &mut writer).map_err(|source_err| {
            ReplicaError::from_io(dst_path.as_str(), source_err)
        })?;
        // For a remote destination the transport write only happens here
        // (a `BufferedWriter` sends its one `write_file` request from
        // `flush`, not from `std::io::copy` alone); without this call a
        // failed remote write is silently discarded in `Drop` and the copy
        // reports success.
        writer
            .flush()
            .map_err(|source_err| ReplicaError::from_io(dst_path.as_str(), source_err))?;
        Ok(())
    }
}
