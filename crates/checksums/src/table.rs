use std::fs::File;
use std::io::Read;
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::error::CodecError;
use crate::rolling::weak;
use crate::strong::strong;

/// One entry in a [`ChecksumTable`]: a block's byte offset in the file it
/// was computed from, its weak checksum, and its strong digest.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockEntry {
    /// Byte offset of the block, always a multiple of the table's block
    /// size except for the final (possibly short) block.
    pub offset: u64,
    /// Adler-32 checksum of the block.
    pub weak: u32,
    /// MD5 digest of the block.
    pub strong: [u8; 16],
}

/// A block-checksum table: a mapping from the high 16 bits of a weak
/// checksum (the "bucket") to the ordered sequence of entries that share
/// that bucket, in file scan order.
pub type ChecksumTable = FxHashMap<u16, Vec<BlockEntry>>;

/// Computes the block-checksum table for `path` using blocks of `block_size`
/// bytes (the last block may be short).
///
/// # Errors
///
/// Returns [`CodecError::Read`] if `path` cannot be opened or read.
pub fn compute_block_checksums(path: &Path, block_size: u32) -> Result<ChecksumTable, CodecError> {
    let mut file = File::open(path).map_err(|source| CodecError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let block_size = block_size.max(1) as usize;
    let mut table: ChecksumTable = ChecksumTable::default();
    let mut buffer = vec![0u8; block_size];
    let mut offset: u64 = 0;

    loop {
        let n = read_full(&mut file, &mut buffer, path)?;
        if n == 0 {
            break;
        }
        let chunk = &buffer[..n];
        let w = weak(chunk);
        let s = strong(chunk);
        let bucket = (w >> 16) as u16;
        table.entry(bucket).or_default().push(BlockEntry {
            offset,
            weak: w,
            strong: s,
        });
        offset += n as u64;
        if n < block_size {
            break;
        }
    }

    Ok(table)
}

/// Reads up to `buf.len()` bytes, retrying on short reads, stopping only at
/// EOF or a genuine read error. Unlike `Read::read_exact`, a short final
/// read at EOF is not an error — it is the last (possibly partial) block.
fn read_full(file: &mut File, buf: &mut [u8], path: &Path) -> Result<usize, CodecError> {
    let mut total = 0;
    while total < buf.len() {
        match file.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(CodecError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn two_full_blocks_yield_two_entries_at_expected_offsets() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"abcdefgh").unwrap();
        f.flush().unwrap();

        let table = compute_block_checksums(f.path(), 4).unwrap();
        let mut entries: Vec<BlockEntry> = table.values().flatten().copied().collect();
        entries.sort_by_key(|e| e.offset);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[0].weak, weak(b"abcd"));
        assert_eq!(entries[0].strong, strong(b"abcd"));
        assert_eq!(entries[1].offset, 4);
        assert_eq!(entries[1].weak, weak(b"efgh"));
        assert_eq!(entries[1].strong, strong(b"efgh"));
    }

    #[test]
    fn empty_file_yields_empty_table() {
        let f = NamedTempFile::new().unwrap();
        let table = compute_block_checksums(f.path(), 64).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn bucket_consistency_holds_for_every_entry() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"0123456789abcdef0123456789abcdef").unwrap();
        f.flush().unwrap();

        let table = compute_block_checksums(f.path(), 6).unwrap();
        for (bucket, entries) in &table {
            for entry in entries {
                assert_eq!(entry.weak >> 16, u32::from(*bucket));
            }
        }
    }
}
