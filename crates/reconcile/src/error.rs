/// Errors raised while reconciling a single event.
///
/// Classification mirrors the daemon's error-handling policy (spec §7):
/// [`ReconcileError::from_replica`] is the one place that decides whether a
/// given [`replica::ReplicaError`] is benign (swallowed), logged-and-dropped,
/// or a transport failure that may need to terminate the daemon.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The underlying replica operation failed.
    #[error(transparent)]
    Replica(#[from] replica::ReplicaError),
}

impl ReconcileError {
    /// `true` for `NotFound`/`AlreadyExists` — reconciliation swallows these
    /// at debug level since the next full scan will reconcile any true
    /// divergence (spec §4.4, §7).
    #[must_use]
    pub fn is_benign(&self) -> bool {
        match self {
            ReconcileError::Replica(err) => err.is_benign(),
        }
    }

    /// `true` if this failure came from a transport request rather than a
    /// local filesystem call, triggering the daemon's single-reconnect
    /// policy (spec §7).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, ReconcileError::Replica(replica::ReplicaError::Transport(_)))
    }
}
