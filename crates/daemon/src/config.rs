use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use logging::{LogLevel, LoggingConfig};

use crate::error::DaemonError;

/// `[Sync]` section: the two trees being kept in sync (spec §6).
#[derive(Clone, Debug, Default)]
pub struct SyncSection {
    /// Local source tree.
    pub source: PathBuf,
    /// Peer tree: a local directory, or (for `sync remote`) the module path
    /// on the remote host.
    pub destination: PathBuf,
}

/// `[Connection]` section, present only for `sync remote`.
#[derive(Clone, Debug, Default)]
pub struct ConnectionSection {
    /// Remote host.
    pub host: Option<String>,
    /// Remote port.
    pub port: Option<u16>,
}

/// `[KeyAuth]` section, present only for `sync remote`.
#[derive(Clone, Debug, Default)]
pub struct KeyAuthSection {
    /// Path to the host's public key, for host verification.
    pub hostkey: Option<PathBuf>,
    /// Path to the user's private key, for authentication.
    pub userkey: Option<PathBuf>,
}

/// `[Mount]` section: where the remote tree is OS-mounted, an external
/// collaborator this spec does not implement (spec §1).
#[derive(Clone, Debug, Default)]
pub struct MountSection {
    /// Mount path, if the front-end mounted the remote tree.
    pub mountpath: Option<PathBuf>,
}

/// The daemon's full configuration (spec §6), plus the tunables spec §4.1
/// and §4.5 fix at defaults but which a `[Sync]` override can still reach.
#[derive(Clone, Debug)]
pub struct Config {
    /// `[Sync]`.
    pub sync: SyncSection,
    /// `[Connection]`.
    pub connection: ConnectionSection,
    /// `[KeyAuth]`.
    pub keyauth: KeyAuthSection,
    /// `[Logging]`.
    pub logging: LoggingConfig,
    /// `[Mount]`.
    pub mount: MountSection,
    /// Block size for the delta codec (spec §3: `BS`, default 65536).
    pub block_size: u32,
    /// Full-scan interval in seconds (spec §4.5: `T_scan`, default 5).
    pub scan_interval_secs: u64,
    /// Remote-poll interval in seconds (spec §4.5: `T_poll`, default 3).
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync: SyncSection::default(),
            connection: ConnectionSection::default(),
            keyauth: KeyAuthSection::default(),
            logging: LoggingConfig::default(),
            mount: MountSection::default(),
            block_size: checksums::DEFAULT_BLOCK_SIZE,
            scan_interval_secs: 5,
            poll_interval_secs: 3,
        }
    }
}

/// Returns the installation root: the `DSYNC_HOME` environment variable, or
/// the current working directory if unset (spec §6: "its absence falls
/// back to the current working directory").
#[must_use]
pub fn install_root() -> PathBuf {
    env::var_os("DSYNC_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| env::current_dir().unwrap_or_default())
}

impl Config {
    /// Parses an INI-like configuration text (spec §6's carrier is
    /// unspecified beyond "any INI-like carrier"; this loader recognises
    /// exactly the five sections the spec names and nothing else — config
    /// parsing itself is an external contract, not a feature this crate
    /// hardens).
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Config`] if `[Sync] source`/`destination` are
    /// missing, or a numeric field fails to parse.
    pub fn parse(text: &str) -> Result<Self, DaemonError> {
        let sections = parse_sections(text);
        let mut config = Config::default();

        if let Some(sync) = sections.get("sync") {
            config.sync.source = sync
                .get("source")
                .map(PathBuf::from)
                .ok_or_else(|| DaemonError::Config("[Sync] missing required key 'source'".into()))?;
            config.sync.destination = sync
                .get("destination")
                .map(PathBuf::from)
                .ok_or_else(|| DaemonError::Config("[Sync] missing required key 'destination'".into()))?;
        } else {
            return Err(DaemonError::Config("missing required section [Sync]".into()));
        }

        if let Some(connection) = sections.get("connection") {
            config.connection.host = connection.get("host").cloned();
            if let Some(port) = connection.get("port") {
                config.connection.port = Some(
                    port.parse()
                        .map_err(|_| DaemonError::Config(format!("[Connection] invalid port {port:?}")))?,
                );
            }
        }

        if let Some(keyauth) = sections.get("keyauth") {
            config.keyauth.hostkey = keyauth.get("hostkey").map(PathBuf::from);
            config.keyauth.userkey = keyauth.get("userkey").map(PathBuf::from);
        }

        if let Some(logging_section) = sections.get("logging") {
            config.logging.logfile = logging_section.get("logfile").map(PathBuf::from);
            if let Some(level) = logging_section.get("loglevel") {
                config.logging.level = Some(
                    level
                        .parse::<LogLevel>()
                        .map_err(|err| DaemonError::Config(format!("[Logging] {err}")))?,
                );
            }
        }

        if let Some(mount) = sections.get("mount") {
            config.mount.mountpath = mount.get("mountpath").map(PathBuf::from);
        }

        Ok(config)
    }
}

/// Minimal `[section]` / `key = value` parser: strips `;`/`#` comments,
/// blank lines, and surrounding whitespace. No interpolation, no quoting —
/// the ambient config contract this crate needs is small enough that a
/// hand-rolled reader is clearer than pulling in a full INI crate.
fn parse_sections(text: &str) -> HashMap<String, HashMap<String, String>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current = String::new();

    for raw_line in text.lines() {
        let line = raw_line.split(['#', ';']).next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            current = line[1..line.len() - 1].trim().to_ascii_lowercase();
            sections.entry(current.clone()).or_default();
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    sections
}
