/// The daemon's lifecycle states (spec §4.6).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DaemonState {
    /// No background threads running; `start` is the only accepted command.
    Idle,
    /// Watcher, poll, scan, and reconciler threads are all live.
    Running,
    /// `stop` was called: the sentinel has been sent and the daemon is
    /// waiting for the reconciler worker to drain and join. Commands issued
    /// during this state are refused (spec §4.6).
    Draining,
}
