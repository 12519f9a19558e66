//! Daemon lifecycle: configuration loading and the `Idle -> Running ->
//! Draining -> Idle` state machine that wires the local watcher, peer poll
//! timer, full-scan timer, and reconciler worker together (spec §4.5, §4.6).

mod config;
mod daemon;
mod error;
mod state;

pub use config::{install_root, Config, ConnectionSection, KeyAuthSection, MountSection, SyncSection};
pub use daemon::Daemon;
pub use error::DaemonError;
pub use state::DaemonState;
