//! Byte sources the decoder reads from.
//!
//! A [`Stream`] is the only thing the decoder knows about its input. Two
//! decorators sit on top of any stream:
//!
//! - [`ReconsumableStream`] lets a decoder push bytes it already consumed back
//!   in front of the source, so it can peek at a discriminant and then hand the
//!   whole encoding to another reader.
//! - [`ConstrainedStream`] caps a source at a byte budget. Every section (and
//!   every code entry) is decoded through one, so a payload decoder can never
//!   read into whatever follows it, and leftover bytes are detectable.

use std::collections::VecDeque;

use super::error::{ParseError, ParseResult};

pub trait Stream {
    /// Reads up to `buf.len()` bytes into `buf` and returns how many were
    /// read. Zero means no more input is available.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Whether the stream has reached, or has likely reached, the end of its
    /// input. This is a hint for error reporting and loop termination; a
    /// `false` answer does not promise that the next read will succeed.
    fn unreliable_eof(&self) -> bool;

    /// Fills `buf` completely or fails with `UnexpectedEof`.
    fn read_exact(&mut self, buf: &mut [u8]) -> ParseResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let count = self.read(&mut buf[filled..]);
            if count == 0 {
                return Err(ParseError::UnexpectedEof);
            }
            filled += count;
        }
        Ok(())
    }

    /// Skips exactly `count` bytes or fails with `UnexpectedEof`.
    fn discard_exact(&mut self, count: usize) -> ParseResult<()> {
        let mut scratch = [0u8; 256];
        let mut left = count;
        while left > 0 {
            let chunk = left.min(scratch.len());
            let read = self.read(&mut scratch[..chunk]);
            if read == 0 {
                return Err(ParseError::UnexpectedEof);
            }
            left -= read;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> ParseResult<u8> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

/// An in-memory source over a borrowed byte slice.
pub struct ByteStream<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteStream<'a> {
    pub fn new(bytes: &'a [u8]) -> ByteStream<'a> {
        ByteStream { bytes, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

impl Stream for ByteStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let count = buf.len().min(self.remaining());
        buf[..count].copy_from_slice(&self.bytes[self.pos..self.pos + count]);
        self.pos += count;
        count
    }

    fn unreliable_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn discard_exact(&mut self, count: usize) -> ParseResult<()> {
        if count > self.remaining() {
            self.pos = self.bytes.len();
            return Err(ParseError::UnexpectedEof);
        }
        self.pos += count;
        Ok(())
    }
}

/// A stream with a push-back buffer in front of its source.
///
/// Bytes handed to [`unread`](ReconsumableStream::unread) are served to
/// subsequent reads first, in the order they were pushed back, before reading
/// falls through to the wrapped stream.
pub struct ReconsumableStream<'a, S: Stream + ?Sized> {
    inner: &'a mut S,
    buffer: VecDeque<u8>,
}

impl<'a, S: Stream + ?Sized> ReconsumableStream<'a, S> {
    pub fn new(inner: &'a mut S) -> ReconsumableStream<'a, S> {
        ReconsumableStream {
            inner,
            buffer: VecDeque::new(),
        }
    }

    pub fn unread(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes.iter().copied());
    }
}

impl<S: Stream + ?Sized> Stream for ReconsumableStream<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let from_buffer = buf.len().min(self.buffer.len());
        for (slot, byte) in buf.iter_mut().zip(self.buffer.drain(..from_buffer)) {
            *slot = byte;
        }
        if from_buffer == buf.len() {
            return from_buffer;
        }
        from_buffer + self.inner.read(&mut buf[from_buffer..])
    }

    fn unreliable_eof(&self) -> bool {
        self.buffer.is_empty() && self.inner.unreliable_eof()
    }

    fn discard_exact(&mut self, count: usize) -> ParseResult<()> {
        let from_buffer = count.min(self.buffer.len());
        self.buffer.drain(..from_buffer);
        self.inner.discard_exact(count - from_buffer)
    }
}

/// A view of a stream limited to a fixed number of bytes.
pub struct ConstrainedStream<'a, S: Stream + ?Sized> {
    inner: &'a mut S,
    bytes_left: usize,
}

impl<'a, S: Stream + ?Sized> ConstrainedStream<'a, S> {
    pub fn new(inner: &'a mut S, size: usize) -> ConstrainedStream<'a, S> {
        ConstrainedStream {
            inner,
            bytes_left: size,
        }
    }

    /// Bytes of the budget not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes_left
    }
}

impl<S: Stream + ?Sized> Stream for ConstrainedStream<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let to_read = buf.len().min(self.bytes_left);
        let count = self.inner.read(&mut buf[..to_read]);
        self.bytes_left -= count;
        count
    }

    fn unreliable_eof(&self) -> bool {
        self.bytes_left == 0 || self.inner.unreliable_eof()
    }

    fn discard_exact(&mut self, count: usize) -> ParseResult<()> {
        let to_discard = count.min(self.bytes_left);
        // a ByteStream discards everything it has before failing, so the
        // budget can't be trusted after an error; treat it as spent
        if let Err(error) = self.inner.discard_exact(to_discard) {
            self.bytes_left = 0;
            return Err(error);
        }
        self.bytes_left -= to_discard;
        if to_discard < count {
            return Err(ParseError::UnexpectedEof);
        }
        Ok(())
    }
}
