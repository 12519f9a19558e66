use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use checksums::{ChecksumTable, Instruction};

use crate::error::ReplicaError;
use crate::event::{Event, EventKind};
use crate::path::{join_path, relative_key, RelPath};
use crate::traits::Replica;
use crate::stat::{EntryKind, Stat};

/// A replica backed directly by the local filesystem.
///
/// Change events are produced by a recursive [`notify`] watcher running in
/// the background; [`poll_events`](Replica::poll_events) drains whatever it
/// has queued since the last drain, turning the watcher's push model into
/// the same pull interface [`crate::remote::RemoteReplica`] exposes (spec
/// §4.2, §9 "coroutine / event-callback control flow").
pub struct LocalReplica {
    root: PathBuf,
    events_rx: Receiver<Event>,
    // Held only to keep the watcher alive for the replica's lifetime.
    _watcher: Mutex<RecommendedWatcher>,
}

impl LocalReplica {
    /// Opens `root` as a local replica, creating it if missing, and starts
    /// the recursive watcher.
    ///
    /// # Errors
    ///
    /// Returns [`ReplicaError`] if `root` cannot be created or watched.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ReplicaError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| ReplicaError::from_io(path_str(&root), source))?;

        let (tx, rx): (Sender<Event>, Receiver<Event>) = crossbeam_channel::unbounded();
        let watch_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(raw_event) = res {
                for event in translate(&watch_root, &raw_event) {
                    let _ = tx.send(event);
                }
            }
        })
        .map_err(|err| ReplicaError::Io {
            path: path_str(&root),
            source: std::io::Error::new(std::io::ErrorKind::Other, err),
        })?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|err| ReplicaError::Io {
                path: path_str(&root),
                source: std::io::Error::new(std::io::ErrorKind::Other, err),
            })?;

        tracing::debug!(root = %root.display(), "local replica watcher started");

        Ok(Self {
            root,
            events_rx: rx,
            _watcher: Mutex::new(watcher),
        })
    }

    /// The root directory this replica serves.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full(&self, path: &RelPath) -> PathBuf {
        join_path(&self.root, path)
    }
}

/// Maps a single `notify` event to zero or more [`Event`]s, relative to
/// `root`. Mirrors the four callbacks (`on_created`/`on_deleted`/
/// `on_modified`/`on_moved`) of the watcher this design is modeled on.
fn translate(root: &Path, raw: &notify::Event) -> Vec<Event> {
    use notify::EventKind as NK;

    match &raw.kind {
        NK::Create(create_kind) => raw
            .paths
            .first()
            .map(|p| {
                let key = relative_key(root, p).to_string();
                let is_dir = matches!(create_kind, notify::event::CreateKind::Folder)
                    || p.is_dir();
                vec![Event::new(
                    if is_dir { EventKind::DirCreated } else { EventKind::FileCreated },
                    key,
                )]
            })
            .unwrap_or_default(),
        NK::Remove(remove_kind) => raw
            .paths
            .first()
            .map(|p| {
                let key = relative_key(root, p).to_string();
                let is_dir = matches!(remove_kind, notify::event::RemoveKind::Folder);
                vec![Event::new(
                    if is_dir { EventKind::DirDeleted } else { EventKind::FileDeleted },
                    key,
                )]
            })
            .unwrap_or_default(),
        NK::Modify(notify::event::ModifyKind::Name(notify::event::RenameMode::Both)) => {
            if raw.paths.len() == 2 {
                let src = relative_key(root, &raw.paths[0]).to_string();
                let dst = relative_key(root, &raw.paths[1]).to_string();
                let is_dir = raw.paths[1].is_dir();
                vec![Event::moved(
                    if is_dir { EventKind::DirMoved } else { EventKind::FileMoved },
                    src,
                    dst,
                )]
            } else {
                Vec::new()
            }
        }
        NK::Modify(_) => raw
            .paths
            .first()
            .filter(|p| p.is_file())
            .map(|p| vec![Event::new(EventKind::FileModified, relative_key(root, p).to_string())])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(unix)]
fn mode_of(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_of(_metadata: &fs::Metadata) -> u32 {
    0
}

fn mtime_secs(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl Replica for LocalReplica {
    fn list(&self, dir: &RelPath) -> Result<Vec<String>, ReplicaError> {
        let full = self.full(dir);
        let entries = fs::read_dir(&full).map_err(|source| ReplicaError::from_io(path_str(&full), source))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ReplicaError::from_io(path_str(&full), source))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn stat(&self, path: &RelPath) -> Result<Stat, ReplicaError> {
        let full = self.full(path);
        let metadata = fs::symlink_metadata(&full)
            .map_err(|source| ReplicaError::from_io(path_str(&full), source))?;
        let kind = if metadata.file_type().is_symlink() {
            EntryKind::Symlink
        } else if metadata.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };
        Ok(Stat {
            kind,
            size: metadata.len(),
            mtime: mtime_secs(&metadata),
            mode: mode_of(&metadata),
        })
    }

    fn mkdir(&self, path: &RelPath) -> Result<(), ReplicaError> {
        let full = self.full(path);
        match fs::create_dir(&full) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(ReplicaError::from_io(path_str(&full), source)),
        }
    }

    fn mkdirs(&self, path: &RelPath) -> Result<(), ReplicaError> {
        let full = self.full(path);
        fs::create_dir_all(&full).map_err(|source| ReplicaError::from_io(path_str(&full), source))
    }

    fn rmdir(&self, path: &RelPath) -> Result<(), ReplicaError> {
        let full = self.full(path);
        fs::remove_dir(&full).map_err(|source| ReplicaError::from_io(path_str(&full), source))
    }

    fn remove(&self, path: &RelPath) -> Result<(), ReplicaError> {
        let full = self.full(path);
        fs::remove_file(&full).map_err(|source| ReplicaError::from_io(path_str(&full), source))
    }

    fn rename(&self, src: &RelPath, dst: &RelPath) -> Result<(), ReplicaError> {
        let full_src = self.full(src);
        let full_dst = self.full(dst);
        fs::rename(&full_src, &full_dst).map_err(|source| ReplicaError::from_io(path_str(&full_src), source))
    }

    fn open_read(&self, path: &RelPath) -> Result<Box<dyn Read + Send>, ReplicaError> {
        let full = self.full(path);
        let file = File::open(&full).map_err(|source| ReplicaError::from_io(path_str(&full), source))?;
        Ok(Box::new(file))
    }

    fn open_write(&self, path: &RelPath) -> Result<Box<dyn Write + Send>, ReplicaError> {
        let full = self.full(path);
        let file = File::create(&full).map_err(|source| ReplicaError::from_io(path_str(&full), source))?;
        Ok(Box::new(file))
    }

    fn block_checksums(&self, path: &RelPath, block_size: u32) -> Result<ChecksumTable, ReplicaError> {
        let full = self.full(path);
        checksums::compute_block_checksums(&full, block_size)
            .map_err(|err| ReplicaError::Io { path: path_str(&full), source: codec_io(err) })
    }

    fn delta(
        &self,
        path: &RelPath,
        table: &ChecksumTable,
        block_size: u32,
    ) -> Result<Vec<Instruction>, ReplicaError> {
        let full = self.full(path);
        checksums::compute_delta(&full, table, block_size)
            .map_err(|err| ReplicaError::Io { path: path_str(&full), source: codec_io(err) })
    }

    fn patch(&self, path: &RelPath, delta: &[Instruction], block_size: u32) -> Result<(), ReplicaError> {
        let full = self.full(path);
        checksums::apply_patch(&full, delta, block_size)
            .map_err(|err| ReplicaError::Io { path: path_str(&full), source: codec_io(err) })
    }

    fn poll_events(&self) -> Result<Vec<Event>, ReplicaError> {
        Ok(self.events_rx.try_iter().collect())
    }

    fn relative_key(&self, path: &str) -> RelPath {
        relative_key(&self.root, Path::new(path))
    }
}

fn codec_io(err: checksums::CodecError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err)
}
