use serde::{Deserialize, Serialize};

use crate::wire::{WireChecksumTable, WireInstruction};

/// `CHECKSUMS` request payload: the path to compute a block-checksum table
/// for.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChecksumsRequest {
    /// Path on the server, relative to the session's replica root.
    pub path: String,
    /// Block size to use.
    pub block_size: u32,
}

/// `CHECKSUMS` response payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChecksumsResponse {
    /// Echo of the request number from the host protocol's envelope.
    pub request_number: u32,
    /// The computed table.
    pub table: WireChecksumTable,
}

/// `DELTA` request payload: a path plus the peer's block-checksum table to
/// scan it against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeltaRequest {
    /// Path on the server.
    pub path: String,
    /// Table computed by the peer over the file this delta will patch.
    pub table: WireChecksumTable,
    /// Block size to use.
    pub block_size: u32,
}

/// `DELTA` response payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeltaResponse {
    /// Echo of the request number.
    pub request_number: u32,
    /// The computed instruction sequence.
    pub delta: Vec<WireInstruction>,
}

/// `PATCH` request payload: a path plus the delta to apply to it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PatchRequest {
    /// Path on the server to patch in place.
    pub path: String,
    /// Instructions to apply.
    pub delta: Vec<WireInstruction>,
    /// Block size used when the delta was computed.
    pub block_size: u32,
}

/// Status code returned for a `PATCH` request, standing in for the host
/// protocol's own status reply (spec §4.3: "the standard status code of the
/// host protocol").
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[repr(u32)]
pub enum PatchStatus {
    /// The patch was applied and committed.
    Ok = 0,
    /// The patch failed; the target is unchanged.
    Error = 1,
}
