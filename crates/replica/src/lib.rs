//! Uniform local/remote tree façade used by the reconciler (spec §4.2).
//!
//! [`Replica`] is the capability set every tree endpoint must implement:
//! directory listing, metadata, mutation, delta operations, and a change-
//! event source. [`LocalReplica`] backs onto `std::fs` plus a recursive
//! [`notify`] watcher; [`RemoteReplica`] drives the same operations over a
//! [`Transport`] — a generic secure file-transfer channel this crate treats
//! as an external collaborator, per spec §1's scope boundary.

mod error;
mod event;
mod local;
mod path;
mod remote;
mod stat;
mod traits;

pub use error::ReplicaError;
pub use event::{Event, EventKind};
pub use local::LocalReplica;
pub use path::{join_path, relative_key, RelPath};
pub use remote::{RemoteReplica, Transport};
pub use stat::{EntryKind, Stat};
pub use traits::Replica;
