//! Binary format decoder.
//!
//! Decoding is a single synchronous pass over a [`Stream`](stream::Stream):
//! the header is checked, then each section is decoded through a stream
//! constrained to its declared length. The first malformed byte aborts the
//! whole decode; no partially built module is returned.

pub mod error;
pub mod instruction;
pub mod limits;
pub mod module;
pub mod reader;
pub mod section;
pub mod stream;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

use error::{DecodeError, ParseResult};
use module::Module;
use stream::{ByteStream, Stream};

/// Decodes a module from any stream.
pub fn parse<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<Module> {
    Module::parse(stream)
}

/// Decodes a module held in memory, reporting where decoding stopped when it
/// fails.
pub fn decode(bytes: &[u8]) -> Result<Module, DecodeError> {
    let mut stream = ByteStream::new(bytes);
    Module::parse(&mut stream).map_err(|kind| DecodeError {
        kind,
        offset: stream.pos(),
    })
}
