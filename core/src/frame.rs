//! Length-prefixed framing.
//!
//! Each frame is a 4-byte big-endian length followed by exactly that many bytes of an encoded
//! [`Message`]. A zero or oversized length means the stream is corrupt.

use crate::error::{DecodeError, TransportError};
use crate::message::Message;
use std::io::{self, Read, Write};

/// Default upper bound on a frame body.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

const HEADER_LEN: usize = 4;
const READ_CHUNK: usize = 16 * 1024;

/// Encodes a message into a complete frame.
pub fn encode_frame(message: &Message, max_len: usize) -> Result<Vec<u8>, TransportError> {
    let body = message.encode()?;
    if body.is_empty() {
        return Err(TransportError::EmptyFrame);
    }
    if body.len() > max_len || body.len() > u32::MAX as usize {
        return Err(TransportError::FrameTooLarge {
            len: body.len(),
            max: max_len,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Reads frames from a byte stream, buffering partial reads.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_len: usize,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> FrameReader<R> {
        FrameReader::with_max_len(inner, MAX_FRAME_LEN)
    }

    pub fn with_max_len(inner: R, max_len: usize) -> FrameReader<R> {
        FrameReader {
            inner,
            buf: Vec::new(),
            max_len,
        }
    }

    /// Reads the next message.
    ///
    /// Returns `Ok(None)` if the stream ended cleanly between two frames. Frames whose payload
    /// does not fit their message type are logged and skipped.
    pub fn read_message(&mut self) -> Result<Option<Message>, TransportError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(body) = self.take_frame()? {
                match Message::decode(&body) {
                    Ok(message) => return Ok(Some(message)),
                    Err(DecodeError::Envelope(err)) => return Err(err.into()),
                    // the frame boundary is intact, so the next frame still lines up
                    Err(err) => {
                        tracing::warn!("dropping message: {}", err);
                        continue;
                    }
                }
            }

            let read = match self.inner.read(&mut chunk) {
                Ok(read) => read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if read == 0 {
                return if self.buf.is_empty() {
                    Ok(None)
                } else {
                    Err(TransportError::Truncated)
                };
            }
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Splits a complete frame body off the buffer, if there is one.
    fn take_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if len == 0 {
            return Err(TransportError::EmptyFrame);
        }
        if len > self.max_len {
            return Err(TransportError::FrameTooLarge {
                len,
                max: self.max_len,
            });
        }
        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }

        let body = self.buf[HEADER_LEN..HEADER_LEN + len].to_vec();
        self.buf.drain(..HEADER_LEN + len);
        Ok(Some(body))
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}

/// Writes frames to a byte stream.
pub struct FrameWriter<W> {
    inner: W,
    max_len: usize,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> FrameWriter<W> {
        FrameWriter::with_max_len(inner, MAX_FRAME_LEN)
    }

    pub fn with_max_len(inner: W, max_len: usize) -> FrameWriter<W> {
        FrameWriter { inner, max_len }
    }

    pub fn write_message(&mut self, message: &Message) -> Result<(), TransportError> {
        let frame = encode_frame(message, self.max_len)?;
        self.inner.write_all(&frame)?;
        self.inner.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
