//! Error taxonomy shared by every decode routine.

use super::stream::Stream;
use thiserror::Error;

/// The closed set of reasons a decode can fail.
///
/// Composite decoders forward the first error they see unchanged, so the kind
/// returned to the caller is always the one produced closest to the bad bytes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("expected an index")]
    ExpectedIndex,

    #[error("expected a kind tag")]
    ExpectedKindTag,

    #[error("expected a size")]
    ExpectedSize,

    #[error("expected a value or a terminator")]
    ExpectedValueOrTerminator,

    #[error("invalid index")]
    InvalidIndex,

    #[error("invalid input")]
    InvalidInput,

    #[error("invalid module magic")]
    InvalidModuleMagic,

    #[error("invalid module version")]
    InvalidModuleVersion,

    #[error("invalid size")]
    InvalidSize,

    #[error("invalid tag")]
    InvalidTag,

    #[error("invalid type")]
    InvalidType,

    #[error("huge allocation requested")]
    HugeAllocationRequested,

    #[error("not implemented")]
    NotImplemented,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Turns a failed read into `UnexpectedEof` when the stream has run dry, or
/// into `error_if_not_eof` when there was still input and the bytes were bad.
pub fn with_eof_check<S: Stream + ?Sized>(stream: &S, error_if_not_eof: ParseError) -> ParseError {
    if stream.unreliable_eof() {
        ParseError::UnexpectedEof
    } else {
        error_if_not_eof
    }
}

/// A decode failure together with the byte offset at which decoding stopped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{kind} at offset 0x{offset:08x}")]
pub struct DecodeError {
    pub kind: ParseError,
    pub offset: usize,
}
