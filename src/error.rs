//! Error taxonomy shared by every part of the codec.
//!
//! All failures are surfaced at the point of detection; nothing is retried or
//! silently recovered. A decode either returns a complete message or one of
//! these, never a partial buffer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Invalid hex/binary/ascii text passed to a conversion or field setter.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// Schema or field position outside its valid range.
    #[error("position {position} out of range (0..{count})")]
    IndexError { position: usize, count: usize },
    /// Decode needs more bytes than the buffer provides.
    #[error("truncated message: {context} needs {needed} bytes, {remaining} remain")]
    TruncatedMessage {
        context: String,
        needed: usize,
        remaining: usize,
    },
    /// A TLV length field requests more length-encoding bytes than supported.
    #[error("TLV length overflow: {0} length bytes (max 4)")]
    LengthOverflow(usize),
    /// Inconsistency between a field's bitmap participation and its state.
    #[error("invalid bitmap state: {0}")]
    InvalidBitmapState(String),
    /// Declared surface with no implementation behind it.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl CodecError {
    pub(crate) fn truncated(context: impl Into<String>, needed: usize, remaining: usize) -> Self {
        CodecError::TruncatedMessage {
            context: context.into(),
            needed,
            remaining,
        }
    }
}
