/// Errors surfaced by [`crate::Config`] loading or [`crate::Daemon`]
/// lifecycle transitions.
///
/// Maps onto the CLI exit codes in spec §6: `ConfigError` exits 1,
/// everything else that reaches the top level exits 2.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// The configuration file was missing a required key, or a value
    /// failed to parse (spec §7: "`ConfigError` is fatal before `start`").
    #[error("configuration error: {0}")]
    Config(String),
    /// Opening a replica (local directory or remote session) failed.
    #[error("failed to open replica: {0}")]
    Replica(#[from] replica::ReplicaError),
    /// The daemon is not in a state that accepts the attempted transition
    /// (e.g. `start` while already `Running`, or any command while
    /// `Draining` — spec §4.6: "commands issued during Draining are
    /// refused").
    #[error("invalid daemon state transition: {0}")]
    InvalidTransition(String),
    /// A transport request failed twice in a row with no intervening
    /// success (spec §7: "a second failure terminates the daemon with a
    /// user-visible error").
    #[error("transport failed: {0}")]
    Transport(String),
}
