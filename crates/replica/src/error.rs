use std::io;

/// Error kinds raised by a [`crate::Replica`] operation, matching the sync
/// daemon's error-handling policy (spec §7): `NotFound` and `AlreadyExists`
/// are swallowed by the reconciler at debug level, `PermissionDenied`/`Io`
/// are logged and drop the current event, and `Transport` triggers a single
/// reconnect attempt before the daemon gives up.
#[derive(Debug, thiserror::Error)]
pub enum ReplicaError {
    /// The path does not exist on this replica.
    #[error("not found: {0}")]
    NotFound(String),
    /// The path already exists where a create was attempted.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// The operation was denied by the filesystem or remote endpoint.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Any other I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path the failing operation targeted.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A request over the transport failed (connection reset, malformed
    /// response, timed out). Not raised by [`crate::LocalReplica`].
    #[error("transport error: {0}")]
    Transport(String),
}

impl ReplicaError {
    /// Classifies a raw [`io::Error`] for `path` into the matching variant,
    /// used at every filesystem call site instead of wrapping everything as
    /// a bare `Io`.
    #[must_use]
    pub fn from_io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => ReplicaError::NotFound(path),
            io::ErrorKind::AlreadyExists => ReplicaError::AlreadyExists(path),
            io::ErrorKind::PermissionDenied => ReplicaError::PermissionDenied(path),
            _ => ReplicaError::Io { path, source },
        }
    }

    /// Returns `true` for the two outcomes reconciliation swallows silently.
    #[must_use]
    pub fn is_benign(&self) -> bool {
        matches!(self, ReplicaError::NotFound(_) | ReplicaError::AlreadyExists(_))
    }
}
