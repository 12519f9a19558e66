use std::fs;
use std::path::Path;

use crate::error::CodecError;
use crate::rolling::RollingChecksum;
use crate::strong::strong;
use crate::table::ChecksumTable;

/// One instruction in a delta: either raw bytes to emit, or a reference to a
/// block the receiver already has.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
    /// Raw data to write next in the output. `offset_hint` is advisory —
    /// only used for framing — the receiver concatenates literals in order.
    Literal {
        /// Advisory offset, for wire framing only.
        offset_hint: u64,
        /// The literal bytes.
        bytes: Vec<u8>,
    },
    /// Copy a block from the receiver's existing file, starting at
    /// `source_offset`. Exactly `block_size` bytes unless this is the final
    /// instruction and the source file ends before that.
    Copy {
        /// Offset into the receiver's existing file.
        source_offset: u64,
    },
}

/// Scans the file at `path` against `table` (computed from the file this
/// delta will be applied on top of) and produces the ordered instruction
/// sequence that reconstructs `path`'s bytes from that file plus the
/// literals below.
///
/// Implements the rolling-window scan from the design: on a weak+strong
/// match the window jumps forward by `block_size` and is recomputed fresh;
/// on a miss the window slides by one byte using the O(1) rolling update.
///
/// # Errors
///
/// Returns [`CodecError::Read`] if `path` cannot be opened or read.
pub fn compute_delta(
    path: &Path,
    table: &ChecksumTable,
    block_size: u32,
) -> Result<Vec<Instruction>, CodecError> {
    let data = fs::read(path).map_err(|source| CodecError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(compute_delta_over(&data, table, block_size))
}

/// Pure in-memory variant of [`compute_delta`], exposed for testing the
/// scan algorithm directly against byte strings.
#[must_use]
pub fn compute_delta_over(data: &[u8], table: &ChecksumTable, block_size: u32) -> Vec<Instruction> {
    let block_size = block_size.max(1) as usize;
    let len = data.len();
    let mut instructions = Vec::new();

    if len == 0 {
        return instructions;
    }

    let mut window_start = 0usize;
    let mut window_len = block_size.min(len);
    let mut rolling = RollingChecksum::new();
    rolling.update(&data[window_start..window_start + window_len]);
    let mut last_match_end = 0usize;

    loop {
        let w = rolling.value();
        let bucket = (w >> 16) as u16;
        let window = &data[window_start..window_start + window_len];

        let matched_offset = table.get(&bucket).and_then(|entries| {
            entries
                .iter()
                .find(|entry| entry.weak == w && entry.strong == strong(window))
                .map(|entry| entry.offset)
        });

        if let Some(source_offset) = matched_offset {
            if window_start > last_match_end {
                instructions.push(Instruction::Literal {
                    offset_hint: last_match_end as u64,
                    bytes: data[last_match_end..window_start].to_vec(),
                });
            }
            instructions.push(Instruction::Copy { source_offset });

            window_start += window_len;
            last_match_end = window_start;

            if window_start >= len {
                break;
            }
            window_len = block_size.min(len - window_start);
            rolling.update(&data[window_start..window_start + window_len]);
            continue;
        }

        // No match: try to slide the window by one byte. If the window
        // already touches end of file there is nowhere left to slide.
        if window_start + window_len >= len {
            break;
        }
        let outgoing = data[window_start];
        let incoming = data[window_start + window_len];
        rolling.roll(outgoing, incoming);
        window_start += 1;
    }

    if last_match_end < len {
        instructions.push(Instruction::Literal {
            offset_hint: last_match_end as u64,
            bytes: data[last_match_end..].to_vec(),
        });
    }

    instructions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::compute_block_checksums;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn table_for(data: &[u8], block_size: u32) -> ChecksumTable {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(data).unwrap();
        f.flush().unwrap();
        compute_block_checksums(f.path(), block_size).unwrap()
    }

    #[test]
    fn identical_content_yields_only_copies() {
        let data = b"abcdefgh";
        let table = table_for(data, 4);
        let instructions = compute_delta_over(data, &table, 4);
        assert!(instructions
            .iter()
            .all(|i| matches!(i, Instruction::Copy { .. })));
        assert_eq!(instructions.len(), 2);
    }

    #[test]
    fn scenario_s2_modify_contains_literal_and_copy() {
        // spec §8 S2: BS=4, "hello world" -> "hello brave world".
        let table = table_for(b"hello world", 4);
        let instructions = compute_delta_over(b"hello brave world", &table, 4);

        let has_literal_brave = instructions.iter().any(|i| match i {
            Instruction::Literal { bytes, .. } => {
                std::str::from_utf8(bytes).unwrap_or("").contains("brave")
            }
            Instruction::Copy { .. } => false,
        });
        let has_copy = instructions
            .iter()
            .any(|i| matches!(i, Instruction::Copy { .. }));

        assert!(has_literal_brave, "expected a literal containing \"brave\": {instructions:?}");
        assert!(has_copy, "expected at least one copy instruction: {instructions:?}");
    }

    #[test]
    fn empty_table_yields_single_trailing_literal() {
        let table: ChecksumTable = ChecksumTable::default();
        let instructions = compute_delta_over(b"brand new content", &table, 8);
        assert_eq!(instructions.len(), 1);
        assert!(matches!(instructions[0], Instruction::Literal { .. }));
    }

    #[test]
    fn empty_source_yields_no_instructions() {
        let table = table_for(b"old content", 4);
        let instructions = compute_delta_over(b"", &table, 4);
        assert!(instructions.is_empty());
    }
}
