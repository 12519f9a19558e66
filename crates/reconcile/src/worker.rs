use crossbeam_channel::{Receiver, Sender};
use replica::Replica;
use tracing::{debug, error};

use crate::queue::{QueueItem, Side};
use crate::reconciler::Reconciler;

/// Why [`run`] returned.
#[derive(Debug)]
pub enum WorkerExit {
    /// The sentinel was received; a clean shutdown is in progress.
    Stopped,
    /// A transport request failed twice in a row with no intervening
    /// success; the daemon must terminate with a user-visible error
    /// (spec §7: "a second failure terminates the daemon").
    Fatal(String),
}

/// Runs the reconciler worker loop: dequeue, dispatch, repeat, until the
/// sentinel (`None`) is received or two consecutive transport failures are
/// observed (spec §4.4, §7). `tx` is the same sender the producers use; the
/// worker also uses it to requeue follow-up events (the `DirDeleted` sweep
/// a `DirMoved` schedules).
pub fn run<A: Replica, B: Replica>(
    reconciler: &Reconciler<A, B>,
    rx: &Receiver<QueueItem>,
    tx: &Sender<QueueItem>,
) -> WorkerExit {
    let mut consecutive_transport_failures = 0u32;

    loop {
        let item = match rx.recv() {
            Ok(item) => item,
            Err(_) => return WorkerExit::Stopped,
        };
        let Some((side, event)) = item else {
            return WorkerExit::Stopped;
        };

        let tx = tx.clone();
        let mut requeue = move |side: Side, event: replica::Event| {
            let _ = tx.send(Some((side, event)));
        };

        match reconciler.dispatch(side, &event, &mut requeue) {
            Ok(()) => {
                consecutive_transport_failures = 0;
            }
            Err(err) if err.is_benign() => {
                debug!(?event, "benign outcome reconciling event, dropped");
                consecutive_transport_failures = 0;
            }
            Err(err) if err.is_transport() => {
                consecutive_transport_failures += 1;
                error!(?event, %err, "transport error reconciling event");
                if consecutive_transport_failures >= 2 {
                    return WorkerExit::Fatal(format!("transport failed twice in a row: {err}"));
                }
            }
            Err(err) => {
                error!(?event, %err, "error reconciling event, dropped");
                consecutive_transport_failures = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica::{EventKind, LocalReplica};
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn sentinel_stops_the_worker() {
        let a_dir = tempdir().unwrap();
        let b_dir = tempdir().unwrap();
        let a = Arc::new(LocalReplica::open(a_dir.path()).unwrap());
        let b = Arc::new(LocalReplica::open(b_dir.path()).unwrap());
        let reconciler = Reconciler::new(a, b, 4096);

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(None).unwrap();

        assert!(matches!(run(&reconciler, &rx, &tx), WorkerExit::Stopped));
    }

    #[test]
    fn scenario_s1_create_propagates_to_peer() {
        let a_dir = tempdir().unwrap();
        let b_dir = tempdir().unwrap();
        fs::create_dir_all(a_dir.path().join("a")).unwrap();
        fs::write(a_dir.path().join("a/b.txt"), b"hello").unwrap();

        let a = Arc::new(LocalReplica::open(a_dir.path()).unwrap());
        let b = Arc::new(LocalReplica::open(b_dir.path()).unwrap());
        let reconciler = Reconciler::new(a, b, 4096);

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(Some((Side::A, replica::Event::new(EventKind::DirCreated, "a".to_string())))).unwrap();
        tx.send(Some((Side::A, replica::Event::new(EventKind::FileCreated, "a/b.txt".to_string())))).unwrap();
        tx.send(None).unwrap();

        run(&reconciler, &rx, &tx);

        assert_eq!(fs::read(b_dir.path().join("a/b.txt")).unwrap(), b"hello");
    }
}
