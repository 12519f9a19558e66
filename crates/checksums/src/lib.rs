//! Rolling and strong checksum primitives, plus the block delta codec built
//! on top of them.
//!
//! # Overview
//!
//! This crate provides the pure, side-effect-bounded functions that the
//! rest of the sync stack treats as the "block codec":
//!
//! - [`rolling`] implements a true Adler-32 weak checksum (modulus `65521`)
//!   with an O(1) rolling update, used for block matching during delta
//!   computation.
//! - [`strong`] wraps MD5, used only to reject weak-checksum collisions —
//!   never as a security primitive.
//! - [`table`] computes the per-file block-checksum table.
//! - [`delta`] and [`patch`] implement delta computation and atomic patch
//!   application.
//!
//! # Invariants
//!
//! - Patching a file with the delta derived from `block_checksums(target)`
//!   against `source` yields byte-identical output to `source` (the
//!   round-trip law; see the property tests in this module and in
//!   `tests/round_trip.rs`).
//! - `patch` commits only via the final rename; a crash before that point
//!   leaves either the original target or a stray `*.patched` file, never a
//!   torn one.
//!
//! # Errors
//!
//! [`CodecError`] reports I/O failures reading or writing the files the
//! codec operates over. A weak-checksum match whose strong digest differs
//! is not an error — the caller silently treats it as a miss, per the
//! sync daemon's error-handling policy.

mod delta;
mod error;
mod patch;
mod rolling;
pub mod strong;
mod table;

pub use delta::{compute_delta, Instruction};
pub use error::CodecError;
pub use patch::apply_patch;
pub use rolling::{weak, RollingChecksum};
pub use table::{compute_block_checksums, BlockEntry, ChecksumTable};

/// Default block size used when the caller does not override it (§3: `BS = 65536`).
pub const DEFAULT_BLOCK_SIZE: u32 = 65536;

#[cfg(test)]
mod round_trip_tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(data: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().expect("create temp file");
        f.write_all(data).expect("write temp file");
        f.flush().expect("flush temp file");
        f
    }

    /// Property 1 (round-trip): patching `b` with the delta of `a` against
    /// `block_checksums(b)` reproduces `a` exactly, for a spread of sizes
    /// and block sizes including degenerate ones.
    fn assert_round_trip(a: &[u8], b: &[u8], bs: u32) {
        let target = write_temp(b);
        let source = write_temp(a);

        let table = compute_block_checksums(target.path(), bs).expect("table");
        let instructions = compute_delta(source.path(), &table, bs).expect("delta");
        apply_patch(target.path(), &instructions, bs).expect("patch");

        let patched = std::fs::read(target.path()).expect("read patched");
        assert_eq!(patched, a, "round-trip mismatch for bs={bs}");
    }

    #[test]
    fn round_trip_identical_files() {
        assert_round_trip(b"hello world, this is a test", b"hello world, this is a test", 4);
    }

    #[test]
    fn round_trip_small_edit() {
        assert_round_trip(b"hello brave world", b"hello world", 4);
    }

    #[test]
    fn round_trip_empty_target() {
        assert_round_trip(b"fresh content here", b"", 16);
    }

    #[test]
    fn round_trip_empty_source() {
        assert_round_trip(b"", b"old content here", 16);
    }

    #[test]
    fn round_trip_both_empty() {
        assert_round_trip(b"", b"", 16);
    }

    #[test]
    fn round_trip_single_byte_block_size() {
        assert_round_trip(b"abcdef", b"abXdef", 1);
    }

    #[test]
    fn round_trip_large_block_size_small_file() {
        assert_round_trip(b"abc", b"xyz", 65536);
    }

    #[test]
    fn round_trip_appended_tail() {
        assert_round_trip(
            b"the quick brown fox jumps over the lazy dog and keeps running",
            b"the quick brown fox jumps over the lazy dog",
            8,
        );
    }

    #[test]
    fn round_trip_prepended_head() {
        assert_round_trip(
            b"a brand new header\nthe quick brown fox jumps over the lazy dog",
            b"the quick brown fox jumps over the lazy dog",
            8,
        );
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(data: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().expect("create temp file");
        f.write_all(data).expect("write temp file");
        f.flush().expect("flush temp file");
        f
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Property 1 (spec §8, round-trip): for arbitrary byte strings
        /// `(a, b)` and block size, patching `b` with the delta of `a`
        /// against `block_checksums(b)` reproduces `a` exactly.
        #[test]
        fn round_trip_holds_for_arbitrary_inputs(
            a in proptest::collection::vec(any::<u8>(), 0..400),
            b in proptest::collection::vec(any::<u8>(), 0..400),
            bs in 1u32..64,
        ) {
            let target = write_temp(&b);
            let source = write_temp(&a);

            let table = compute_block_checksums(target.path(), bs).unwrap();
            let instructions = compute_delta(source.path(), &table, bs).unwrap();
            apply_patch(target.path(), &instructions, bs).unwrap();

            let patched = std::fs::read(target.path()).unwrap();
            prop_assert_eq!(patched, a);
        }

        /// Property 3 (spec §8, bucket consistency): every table entry's
        /// offset, when read back from the file, reproduces the weak and
        /// strong checksums recorded for it.
        #[test]
        fn bucket_entries_are_consistent_with_file_bytes(
            data in proptest::collection::vec(any::<u8>(), 0..400),
            bs in 1u32..64,
        ) {
            let file = write_temp(&data);
            let table = compute_block_checksums(file.path(), bs).unwrap();

            for entries in table.values() {
                for entry in entries {
                    let start = entry.offset as usize;
                    let end = (start + bs as usize).min(data.len());
                    let block = &data[start..end];
                    prop_assert_eq!(weak(block), entry.weak);
                    prop_assert_eq!(strong::strong(block), entry.strong);
                }
            }
        }

        /// Property 2 (spec §8, idempotence): patching a file with the
        /// delta of itself against its own table leaves it byte-identical.
        #[test]
        fn patch_with_self_delta_is_idempotent(
            data in proptest::collection::vec(any::<u8>(), 0..400),
            bs in 1u32..64,
        ) {
            let file = write_temp(&data);
            let table = compute_block_checksums(file.path(), bs).unwrap();
            let instructions = compute_delta(file.path(), &table, bs).unwrap();
            apply_patch(file.path(), &instructions, bs).unwrap();

            let result = std::fs::read(file.path()).unwrap();
            prop_assert_eq!(result, data);
        }
    }
}
