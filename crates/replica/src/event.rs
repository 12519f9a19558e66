/// A change observed on a replica, produced by the local watcher or the
/// remote poll (spec §3).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// Path the change occurred at (the move source, for move events).
    pub src_path: String,
    /// Destination path, present only for the `*Moved` variants.
    pub dest_path: Option<String>,
}

/// The kind of change an [`Event`] reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    /// A directory was created.
    DirCreated,
    /// A directory was removed.
    DirDeleted,
    /// A file was created.
    FileCreated,
    /// A file was removed.
    FileDeleted,
    /// A file's contents changed.
    FileModified,
    /// A directory was renamed or moved.
    DirMoved,
    /// A file was renamed or moved.
    FileMoved,
}

impl Event {
    /// Builds a non-move event.
    #[must_use]
    pub fn new(kind: EventKind, src_path: impl Into<String>) -> Self {
        debug_assert!(
            !matches!(kind, EventKind::DirMoved | EventKind::FileMoved),
            "move events must carry a destination; use Event::moved"
        );
        Self {
            kind,
            src_path: src_path.into(),
            dest_path: None,
        }
    }

    /// Builds a move event.
    #[must_use]
    pub fn moved(kind: EventKind, src_path: impl Into<String>, dest_path: impl Into<String>) -> Self {
        debug_assert!(matches!(kind, EventKind::DirMoved | EventKind::FileMoved));
        Self {
            kind,
            src_path: src_path.into(),
            dest_path: Some(dest_path.into()),
        }
    }
}
