/// Kind of filesystem entry, as observed by [`crate::Replica::stat`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntryKind {
    /// A directory.
    Dir,
    /// A regular file.
    File,
    /// A symbolic link.
    Symlink,
}

/// Metadata for one path on a replica.
///
/// Only `kind` and `mtime` are load-bearing for reconciliation; `size` and
/// `mode` are carried through unexamined (spec §3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Stat {
    /// Entry kind.
    pub kind: EntryKind,
    /// Size in bytes (meaningless for directories).
    pub size: u64,
    /// Modification time, seconds resolution.
    pub mtime: i64,
    /// POSIX-style mode bits, passed through unexamined.
    pub mode: u32,
}
