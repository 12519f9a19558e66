use std::io;

/// Errors raised while encoding, decoding, or dispatching a protocol
/// extension request.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A wire payload could not be decoded into its in-memory form.
    #[error("malformed protocol payload: {0}")]
    Malformed(String),
    /// The codec failed while servicing the request.
    #[error("codec error: {0}")]
    Codec(#[from] checksums::CodecError),
    /// The underlying transport failed sending or receiving the request.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
}
