//! LEB128 and IEEE 754 readers over any [`Stream`].
//!
//! These only know about bit-level encodings. A short read comes back as
//! `UnexpectedEof` and an over-long or overflowing LEB128 as `InvalidInput`;
//! callers that need a more specific error map through `with_eof_check`.

use byteorder::{ByteOrder, LittleEndian};

use super::error::{with_eof_check, ParseError, ParseResult};
use super::stream::Stream;

/// Upper bound on the capacity reserved up front for a counted vector.
/// Larger vectors still decode, growing as entries actually arrive.
const PREALLOCATION_LIMIT: usize = 1024;

fn read_vu<S: Stream + ?Sized>(stream: &mut S, size: u32) -> ParseResult<u64> {
    let max_bytes = (size + 6) / 7;
    let mut result: u64 = 0;

    for i in 0..max_bytes {
        let byte = stream.read_byte()?;
        let shift = 7 * i;
        if i == max_bytes - 1 {
            // the final byte can't continue, and bits beyond `size` must be zero
            let remaining_bits = size - shift;
            if byte & 0x80 != 0 || (remaining_bits < 7 && (byte & 0x7f) >> remaining_bits != 0) {
                return Err(ParseError::InvalidInput);
            }
        }
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
    }

    Ok(result)
}

fn read_vs<S: Stream + ?Sized>(stream: &mut S, size: u32) -> ParseResult<i64> {
    let max_bytes = (size + 6) / 7;
    let mut result: i64 = 0;

    for i in 0..max_bytes {
        let byte = stream.read_byte()?;
        let shift = 7 * i;
        if i == max_bytes - 1 {
            // unused high bits of the final byte must all copy the sign bit
            let remaining_bits = size - shift;
            let mask = (0x7fu8 >> (remaining_bits - 1)) << (remaining_bits - 1);
            let high = byte & mask;
            if byte & 0x80 != 0 || (high != 0 && high != mask) {
                return Err(ParseError::InvalidInput);
            }
        }
        result |= ((byte & 0x7f) as i64) << shift;
        if byte & 0x80 == 0 {
            let consumed = shift + 7;
            if consumed < 64 && byte & 0x40 != 0 {
                result |= -1i64 << consumed;
            }
            break;
        }
    }

    Ok(result)
}

pub fn read_vu32<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<u32> {
    read_vu(stream, 32).map(|v| v as u32)
}

pub fn read_vu64<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<u64> {
    read_vu(stream, 64)
}

pub fn read_vs32<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<i32> {
    read_vs(stream, 32).map(|v| v as i32)
}

/// Block types are encoded as a 33 bit signed integer so that every u32 type
/// index stays positive.
pub fn read_vs33<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<i64> {
    read_vs(stream, 33)
}

pub fn read_vs64<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<i64> {
    read_vs(stream, 64)
}

pub fn read_f32<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<f32> {
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf)?;
    Ok(LittleEndian::read_f32(&buf))
}

pub fn read_f64<S: Stream + ?Sized>(stream: &mut S) -> ParseResult<f64> {
    let mut buf = [0u8; 8];
    stream.read_exact(&mut buf)?;
    Ok(LittleEndian::read_f64(&buf))
}

/// Reads a u32 length or count prefix and checks it against `limit`.
pub fn read_size<S: Stream + ?Sized>(stream: &mut S, limit: u32) -> ParseResult<u32> {
    let size = read_vu32(stream).map_err(|_| with_eof_check(stream, ParseError::ExpectedSize))?;
    if size > limit {
        return Err(ParseError::HugeAllocationRequested);
    }
    Ok(size)
}

/// Reads a length-prefixed vector, decoding each entry with `parse_entry`.
pub fn read_vector<S, T, F>(stream: &mut S, limit: u32, mut parse_entry: F) -> ParseResult<Vec<T>>
where
    S: Stream + ?Sized,
    F: FnMut(&mut S) -> ParseResult<T>,
{
    let count = read_size(stream, limit)?;
    let mut entries = Vec::with_capacity((count as usize).min(PREALLOCATION_LIMIT));
    for _ in 0..count {
        entries.push(parse_entry(stream)?);
    }
    Ok(entries)
}

/// Reads a length-prefixed run of raw bytes.
pub fn read_byte_vector<S: Stream + ?Sized>(stream: &mut S, limit: u32) -> ParseResult<Vec<u8>> {
    let len = read_size(stream, limit)? as usize;
    let mut bytes = Vec::with_capacity(len.min(PREALLOCATION_LIMIT * 64));
    let mut chunk = [0u8; 4096];
    while bytes.len() < len {
        let want = (len - bytes.len()).min(chunk.len());
        stream
            .read_exact(&mut chunk[..want])
            .map_err(|_| with_eof_check(stream, ParseError::InvalidInput))?;
        bytes.extend_from_slice(&chunk[..want]);
    }
    Ok(bytes)
}

/// Reads everything left in the stream.
pub fn read_to_end<S: Stream + ?Sized>(stream: &mut S) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let count = stream.read(&mut chunk);
        if count == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..count]);
    }
    bytes
}
