//! Event pipeline and two-way reconciliation engine (spec §4.4, §4.5).
//!
//! [`Reconciler`] is the single worker that decides, for each event, what
//! to create, delete, move, patch, or flag as conflict between a local
//! replica and its peer. [`scan::full_scan`] produces the periodic
//! full-scan events (spec §4.5); [`worker::run`] drains the shared queue.

mod cache;
mod error;
mod queue;
mod reconciler;
mod scan;
mod worker;

pub use cache::{CacheEntry, ChecksumCache};
pub use error::ReconcileError;
pub use queue::{QueueItem, Side};
pub use reconciler::Reconciler;
pub use scan::full_scan;
pub use worker::{run, WorkerExit};
