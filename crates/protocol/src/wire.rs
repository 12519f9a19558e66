//! Wire representations of the block codec's value types.
//!
//! The host transport's payload encoding is textual (the reference
//! encoding is JSON, per spec §4.3), which forces two departures from the
//! in-memory representations in the `checksums` crate: bucket keys become
//! decimal strings (JSON object keys must be strings) and literal bytes
//! become base64 (JSON has no byte-string type). Both conversions are
//! bijective, so round-tripping a value through its wire form and back
//! reproduces it exactly.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use checksums::{BlockEntry, ChecksumTable, Instruction};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Wire form of a single [`BlockEntry`].
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct WireBlockEntry {
    /// Byte offset of the block.
    pub offset: u64,
    /// Weak (Adler-32) checksum.
    pub weak: u32,
    /// Strong (MD5) digest, lowercase hex.
    pub strong: String,
}

/// Wire form of a [`ChecksumTable`]: bucket keys are decimal strings for
/// compatibility with map-typed encodings that forbid integer keys (spec
/// §4.3).
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct WireChecksumTable(pub BTreeMap<String, Vec<WireBlockEntry>>);

impl WireChecksumTable {
    /// Converts an in-memory table to its wire form.
    #[must_use]
    pub fn from_table(table: &ChecksumTable) -> Self {
        let mut out = BTreeMap::new();
        for (bucket, entries) in table {
            let wire_entries = entries
                .iter()
                .map(|entry| WireBlockEntry {
                    offset: entry.offset,
                    weak: entry.weak,
                    strong: hex_encode(&entry.strong),
                })
                .collect();
            out.insert(bucket.to_string(), wire_entries);
        }
        Self(out)
    }

    /// Converts the wire form back to an in-memory table.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if a bucket key is not a valid
    /// `u16` or a strong digest is not exactly 16 bytes of hex.
    pub fn into_table(self) -> Result<ChecksumTable, ProtocolError> {
        let mut table = ChecksumTable::default();
        for (bucket_str, wire_entries) in self.0 {
            let bucket: u16 = bucket_str
                .parse()
                .map_err(|_| ProtocolError::Malformed(format!("bad bucket key {bucket_str:?}")))?;
            let mut entries = Vec::with_capacity(wire_entries.len());
            for wire_entry in wire_entries {
                entries.push(BlockEntry {
                    offset: wire_entry.offset,
                    weak: wire_entry.weak,
                    strong: hex_decode(&wire_entry.strong)?,
                });
            }
            table.insert(bucket, entries);
        }
        Ok(table)
    }
}

/// Wire form of an [`Instruction`]. Literal bytes are base64-encoded (spec
/// §4.3).
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "kind")]
pub enum WireInstruction {
    /// A literal block of bytes.
    Literal {
        /// Advisory framing offset.
        offset_hint: u64,
        /// Base64-encoded literal bytes.
        bytes: String,
    },
    /// A reference to a block the receiver already has.
    Copy {
        /// Offset into the receiver's existing file.
        source_offset: u64,
    },
}

impl WireInstruction {
    /// Converts an in-memory instruction to its wire form.
    #[must_use]
    pub fn from_instruction(instruction: &Instruction) -> Self {
        match instruction {
            Instruction::Literal { offset_hint, bytes } => WireInstruction::Literal {
                offset_hint: *offset_hint,
                bytes: BASE64.encode(bytes),
            },
            Instruction::Copy { source_offset } => WireInstruction::Copy {
                source_offset: *source_offset,
            },
        }
    }

    /// Converts the wire form back to an in-memory instruction.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] if `bytes` is not valid base64.
    pub fn into_instruction(self) -> Result<Instruction, ProtocolError> {
        match self {
            WireInstruction::Literal { offset_hint, bytes } => {
                let decoded = BASE64
                    .decode(bytes)
                    .map_err(|err| ProtocolError::Malformed(format!("bad base64 literal: {err}")))?;
                Ok(Instruction::Literal {
                    offset_hint,
                    bytes: decoded,
                })
            }
            WireInstruction::Copy { source_offset } => Ok(Instruction::Copy { source_offset }),
        }
    }
}

/// Encodes a sequence of instructions for the wire.
#[must_use]
pub fn encode_delta(instructions: &[Instruction]) -> Vec<WireInstruction> {
    instructions.iter().map(WireInstruction::from_instruction).collect()
}

/// Decodes a wire-form instruction sequence back to in-memory instructions.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if any instruction fails to decode.
pub fn decode_delta(wire: Vec<WireInstruction>) -> Result<Vec<Instruction>, ProtocolError> {
    wire.into_iter().map(WireInstruction::into_instruction).collect()
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut out, "{byte:02x}").expect("write! to String cannot fail");
    }
    out
}

fn hex_decode(hex: &str) -> Result<[u8; 16], ProtocolError> {
    if hex.len() != 32 {
        return Err(ProtocolError::Malformed(format!(
            "strong digest must be 32 hex chars, got {}",
            hex.len()
        )));
    }
    let mut out = [0u8; 16];
    for (i, chunk) in out.iter_mut().enumerate() {
        let byte_str = &hex[i * 2..i * 2 + 2];
        *chunk = u8::from_str_radix(byte_str, 16)
            .map_err(|_| ProtocolError::Malformed(format!("bad hex byte {byte_str:?}")))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_table_round_trips_through_wire_form() {
        let mut table = ChecksumTable::default();
        table.insert(
            0x1234,
            vec![BlockEntry {
                offset: 0,
                weak: 0x1234_5678,
                strong: [7u8; 16],
            }],
        );

        let wire = WireChecksumTable::from_table(&table);
        let json = serde_json::to_string(&wire).unwrap();
        let decoded: WireChecksumTable = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.into_table().unwrap(), table);
    }

    #[test]
    fn instructions_round_trip_through_wire_form() {
        let instructions = vec![
            Instruction::Literal {
                offset_hint: 0,
                bytes: b"hello".to_vec(),
            },
            Instruction::Copy { source_offset: 64 },
        ];

        let wire = encode_delta(&instructions);
        let json = serde_json::to_string(&wire).unwrap();
        let decoded_wire: Vec<WireInstruction> = serde_json::from_str(&json).unwrap();
        assert_eq!(decode_delta(decoded_wire).unwrap(), instructions);
    }
}
