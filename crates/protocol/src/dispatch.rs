use std::path::Path;

use crate::error::ProtocolError;
use crate::requests::{
    ChecksumsRequest, ChecksumsResponse, DeltaRequest, DeltaResponse, PatchRequest, PatchStatus,
};
use crate::wire::{decode_delta, encode_delta, WireChecksumTable};

/// Services a `CHECKSUMS` request against the local filesystem, rooted at
/// `root` (the server's module/session root — `request.path` is resolved
/// under it exactly like every other transport operation).
///
/// # Errors
///
/// Returns [`ProtocolError::Codec`] if the file cannot be read.
pub fn handle_checksums(
    root: &Path,
    request_number: u32,
    request: &ChecksumsRequest,
) -> Result<ChecksumsResponse, ProtocolError> {
    let table = checksums::compute_block_checksums(&root.join(&request.path), request.block_size)?;
    Ok(ChecksumsResponse {
        request_number,
        table: WireChecksumTable::from_table(&table),
    })
}

/// Services a `DELTA` request.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if the supplied table is malformed,
/// or [`ProtocolError::Codec`] if the file cannot be read.
pub fn handle_delta(
    root: &Path,
    request_number: u32,
    request: DeltaRequest,
) -> Result<DeltaResponse, ProtocolError> {
    let table = request.table.into_table()?;
    let instructions =
        checksums::compute_delta(&root.join(&request.path), &table, request.block_size)?;
    Ok(DeltaResponse {
        request_number,
        delta: encode_delta(&instructions),
    })
}

/// Services a `PATCH` request, applying the delta to the server's copy of
/// the path and returning a status rather than propagating the error, so a
/// failed patch is reported to the peer instead of tearing down the
/// session.
pub fn handle_patch(root: &Path, request: PatchRequest) -> PatchStatus {
    let outcome = decode_delta(request.delta).and_then(|instructions| {
        checksums::apply_patch(&root.join(&request.path), &instructions, request.block_size)
            .map_err(ProtocolError::from)
    });
    match outcome {
        Ok(()) => PatchStatus::Ok,
        Err(_) => PatchStatus::Error,
    }
}
