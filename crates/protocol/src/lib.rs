//! Protocol extension exposing the block codec as three remote operations
//! riding on a generic secure file-transfer transport (spec §4.3).
//!
//! # Overview
//!
//! The host transport is assumed to already implement request/response
//! framing with numbered requests and the basic file operations (listdir,
//! stat, open, read, write, mkdir, rmdir, remove, rename). This crate adds
//! three request kinds outside that transport's reserved numeric range
//! ([`opcodes::CHECKSUMS`], [`opcodes::DELTA`], [`opcodes::PATCH`]) that let
//! a client ask a remote peer to run the [`checksums`] crate's codec on its
//! behalf.
//!
//! [`wire`] defines the textual, bijective encodings the payloads use
//! (decimal bucket keys, base64 literal bytes — JSON is the reference
//! encoding, though any bijective textual encoding satisfies the contract).
//! [`dispatch`] implements the server side: given a session root and a
//! decoded request, run the matching `checksums` operation and produce the
//! response.

pub mod dispatch;
mod error;
pub mod opcodes;
pub mod requests;
pub mod wire;

pub use dispatch::{handle_checksums, handle_delta, handle_patch};
pub use error::ProtocolError;
pub use requests::{
    ChecksumsRequest, ChecksumsResponse, DeltaRequest, DeltaResponse, PatchRequest, PatchStatus,
};
pub use wire::{decode_delta, encode_delta, WireBlockEntry, WireChecksumTable, WireInstruction};
