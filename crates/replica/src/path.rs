use std::path::{Path, PathBuf};

/// A forward-slash-normalized, root-stripped path shared by two replicas.
///
/// Two paths on different replicas sync iff they share a relative key
/// (spec §3). A `RelPath` never carries a leading or trailing slash.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    /// Wraps an already-normalized key. Only `Replica::relative_key`
    /// implementations should need this; everyone else goes through them.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let raw = key.into();
        let trimmed = raw.trim_matches('/');
        Self(trimmed.replace('\\', "/"))
    }

    /// The key as a `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits off the parent key, if any (e.g. `"a/b/c"` -> `Some("a/b")`).
    #[must_use]
    pub fn parent(&self) -> Option<RelPath> {
        self.0.rsplit_once('/').map(|(parent, _)| RelPath::new(parent))
    }
}

impl std::fmt::Display for RelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips `root` from `path` and normalizes the remainder to a [`RelPath`].
///
/// `path` must be under `root`; callers (the replica implementations) only
/// ever call this with paths they themselves produced.
#[must_use]
pub fn relative_key(root: &Path, path: &Path) -> RelPath {
    let stripped = path.strip_prefix(root).unwrap_or(path);
    let normalized: Vec<&str> = stripped
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    RelPath::new(normalized.join("/"))
}

/// Joins `root` with a `/`-separated relative key, using the host
/// filesystem's native separator convention.
#[must_use]
pub fn join_path(root: &Path, key: &RelPath) -> PathBuf {
    let mut joined = root.to_path_buf();
    if !key.as_str().is_empty() {
        for segment in key.as_str().split('/') {
            joined.push(segment);
        }
    }
    joined
}
