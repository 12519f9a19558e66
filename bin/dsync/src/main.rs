#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use daemon::{Config, Daemon, DaemonError, DaemonState};
use replica::LocalReplica;

/// Two-way directory sync daemon front end (spec §6, informative: exit
/// codes `0` clean stop, `1` configuration error, `2` transport error).
#[derive(Parser)]
#[command(name = "dsync", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Keep two local directories in sync.
    Sync {
        #[command(subcommand)]
        mode: SyncMode,
    },
}

#[derive(Subcommand)]
enum SyncMode {
    /// Both trees are local directories.
    Local {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        destination: PathBuf,
    },
    /// The destination tree lives behind a secure remote transport.
    ///
    /// This build does not embed a concrete [`replica::remote::Transport`]
    /// (the host protocol is an external collaborator per the design docs);
    /// wiring one in is the integrating application's job.
    Remote {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        host: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        hostkey: PathBuf,
        #[arg(long)]
        userkey: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dsync: {err}");
            exit_code_for(&err)
        }
    }
}

fn exit_code_for(err: &DaemonError) -> ExitCode {
    match err {
        DaemonError::Config(_) => ExitCode::from(1),
        DaemonError::Replica(_) | DaemonError::InvalidTransition(_) | DaemonError::Transport(_) => {
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<(), DaemonError> {
    let Command::Sync { mode } = cli.command;
    match mode {
        SyncMode::Local { source, destination } => run_local(source, destination),
        SyncMode::Remote { host, port, .. } => Err(DaemonError::Transport(format!(
            "sync remote requires an embedder-supplied transport to {host}:{port}; none is built into this binary"
        ))),
    }
}

fn run_local(source: PathBuf, destination: PathBuf) -> Result<(), DaemonError> {
    let mut config = Config::default();
    config.sync.source = source.clone();
    config.sync.destination = destination.clone();

    logging::init(&config.logging);

    let local = Arc::new(LocalReplica::open(&source)?);
    let peer = Arc::new(LocalReplica::open(&destination)?);

    let daemon = Arc::new(Daemon::new(local, peer, config));
    daemon.start()?;

    tracing::info!(?source, ?destination, "dsync running, press Ctrl-C to stop");

    loop {
        std::thread::sleep(Duration::from_millis(500));
        if daemon.state() == DaemonState::Idle {
            return Err(DaemonError::Transport(
                "reconciler worker exited unexpectedly".to_string(),
            ));
        }
    }
}
