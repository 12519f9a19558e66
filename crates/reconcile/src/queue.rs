use replica::Event;

/// Which replica an [`Event`] originated on. The local watcher and the
/// local-side full scan tag their events `A`; the remote poll and the
/// remote-side full scan tag theirs `B` (spec §2: "daemon wires a local
/// replica and a peer replica"; `A` is always the local replica).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Side {
    /// The local replica.
    A,
    /// The peer replica (local directory or remote tree).
    B,
}

impl Side {
    /// The other side.
    #[must_use]
    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

/// One item on the reconciler's single multi-producer queue (spec §4.4):
/// an event plus which replica produced it. `None` is the sentinel used to
/// unblock the worker during shutdown (spec §4.6).
pub type QueueItem = Option<(Side, Event)>;
