use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use reconcile::{full_scan, Reconciler, Side, WorkerExit};
use replica::{LocalReplica, Replica};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::DaemonError;
use crate::state::DaemonState;

/// Polling granularity for draining the local watcher's queued events into
/// the shared reconcile queue (spec §4.2 turns the watcher's push model into
/// the same pull interface the remote peer uses; this is the pull tick).
const LOCAL_PUMP_INTERVAL: Duration = Duration::from_millis(200);

/// Owns the two replicas and the background threads that keep them in sync:
/// the local-watcher pump, the peer-poll timer, the periodic full-scan
/// timer, and the single reconciler worker (spec §4.4, §4.5, §4.6).
///
/// Generic over the peer replica type so the same lifecycle machinery
/// drives both `sync local` (peer is another [`LocalReplica`]) and
/// `sync remote` (peer is a [`replica::RemoteReplica`]).
pub struct Daemon<B: Replica + 'static> {
    local: Arc<LocalReplica>,
    peer: Arc<B>,
    config: Config,
    state: Mutex<DaemonState>,
    stop_flag: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    tx: Mutex<Option<Sender<reconcile::QueueItem>>>,
}

impl<B: Replica + 'static> Daemon<B> {
    /// Builds an idle daemon over `local` and `peer`. Does not start any
    /// background work; call [`start`](Self::start) for that.
    #[must_use]
    pub fn new(local: Arc<LocalReplica>, peer: Arc<B>, config: Config) -> Self {
        Self {
            local,
            peer,
            config,
            state: Mutex::new(DaemonState::Idle),
            stop_flag: Arc::new(AtomicBool::new(false)),
            threads: Mutex::new(Vec::new()),
            tx: Mutex::new(None),
        }
    }

    /// The daemon's current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DaemonState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Transitions `Idle -> Running`: starts the watcher pump, peer-poll
    /// timer, scan timer, and reconciler worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::InvalidTransition`] if the daemon is not
    /// currently `Idle`.
    pub fn start(self: &Arc<Self>) -> Result<(), DaemonError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != DaemonState::Idle {
                return Err(DaemonError::InvalidTransition(format!(
                    "start requires Idle, daemon is {state:?}"
                )));
            }
            *state = DaemonState::Running;
        }

        self.stop_flag.store(false, Ordering::SeqCst);
        let (tx, rx): (Sender<reconcile::QueueItem>, Receiver<reconcile::QueueItem>) =
            crossbeam_channel::unbounded();
        *self.tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx.clone());

        let mut threads = Vec::new();

        threads.push(self.spawn_local_pump(tx.clone()));
        threads.push(self.spawn_peer_poll(tx.clone()));
        threads.push(self.spawn_scan_timer(tx.clone()));
        threads.push(self.spawn_reconciler_worker(rx, tx));

        *self.threads.lock().unwrap_or_else(|e| e.into_inner()) = threads;
        info!("daemon started");
        Ok(())
    }

    /// Transitions `Running -> Draining -> Idle`: signals all background
    /// threads to stop, sends the reconciler sentinel, and joins everything
    /// before returning.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::InvalidTransition`] if the daemon is not
    /// currently `Running`.
    pub fn stop(self: &Arc<Self>) -> Result<(), DaemonError> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state != DaemonState::Running {
                return Err(DaemonError::InvalidTransition(format!(
                    "stop requires Running, daemon is {state:?}"
                )));
            }
            *state = DaemonState::Draining;
        }

        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(tx) = self.tx.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = tx.send(None);
        }

        let threads = std::mem::take(&mut *self.threads.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in threads {
            let _ = handle.join();
        }

        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = DaemonState::Idle;
        info!("daemon stopped");
        Ok(())
    }

    fn spawn_local_pump(self: &Arc<Self>, tx: Sender<reconcile::QueueItem>) -> JoinHandle<()> {
        let local = Arc::clone(&self.local);
        let stop_flag = Arc::clone(&self.stop_flag);
        thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                match local.poll_events() {
                    Ok(events) => {
                        for event in events {
                            if tx.send(Some((Side::A, event))).is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => warn!(%err, "local watcher drain failed"),
                }
                thread::sleep(LOCAL_PUMP_INTERVAL);
            }
        })
    }

    fn spawn_peer_poll(self: &Arc<Self>, tx: Sender<reconcile::QueueItem>) -> JoinHandle<()> {
        let peer = Arc::clone(&self.peer);
        let stop_flag = Arc::clone(&self.stop_flag);
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if stop_flag.load(Ordering::SeqCst) {
                    return;
                }
                match peer.poll_events() {
                    Ok(events) => {
                        for event in events {
                            if tx.send(Some((Side::B, event))).is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => error!(%err, "peer poll failed"),
                }
            }
        })
    }

    fn spawn_scan_timer(self: &Arc<Self>, tx: Sender<reconcile::QueueItem>) -> JoinHandle<()> {
        let local_root = self.local.root().to_path_buf();
        let peer = Arc::clone(&self.peer);
        let stop_flag = Arc::clone(&self.stop_flag);
        let interval = Duration::from_secs(self.config.scan_interval_secs);
        thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if stop_flag.load(Ordering::SeqCst) {
                    return;
                }
                let send = tx.clone();
                let outcome = full_scan(&local_root, peer.as_ref(), |side, event| {
                    let _ = send.send(Some((side, event)));
                });
                if let Err(err) = outcome {
                    error!(%err, "full scan failed");
                }
            }
        })
    }

    fn spawn_reconciler_worker(
        self: &Arc<Self>,
        rx: Receiver<reconcile::QueueItem>,
        tx: Sender<reconcile::QueueItem>,
    ) -> JoinHandle<()> {
        let local = Arc::clone(&self.local);
        let peer = Arc::clone(&self.peer);
        let block_size = self.config.block_size;
        let daemon = Arc::clone(self);
        thread::spawn(move || {
            let reconciler = Reconciler::new(local, peer, block_size);
            match reconcile::run(&reconciler, &rx, &tx) {
                WorkerExit::Stopped => {}
                WorkerExit::Fatal(reason) => {
                    error!(%reason, "reconciler worker exited fatally");
                    daemon.stop_flag.store(true, Ordering::SeqCst);
                    *daemon.state.lock().unwrap_or_else(|e| e.into_inner()) = DaemonState::Idle;
                }
            }
        })
    }
}
