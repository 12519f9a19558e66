use std::io;
use std::path::PathBuf;

/// Errors surfaced by the block codec.
///
/// All variants wrap an I/O failure reading or writing one of the two files
/// involved in a codec operation; the codec never fails for data reasons
/// (a weak/strong checksum mismatch is not an error, see the crate docs).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Failed to open or read from `path`.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Failed to open, write, or rename a patch output file.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}
