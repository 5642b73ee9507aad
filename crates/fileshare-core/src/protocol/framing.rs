//! Framing layer: newline-terminated control lines mixed with raw payloads.
//!
//! Wire format:
//! ```text
//! <utf-8 text>\n                  control line
//! FILESIZE <n>\n<n raw bytes>     payload, always announced by a control line
//! ```
//!
//! # Why mixing lines and raw bytes needs care (for beginners)
//!
//! A payload may itself contain `\n` bytes, so the reader can never "scan for
//! the next newline" while a payload is in flight.  The protocol rule is that
//! the length is announced first; the reader then consumes exactly that many
//! bytes before switching back to line mode.
//!
//! [`LineReader`] wraps the stream in a buffered reader.  Bytes that arrive
//! after a delimiter stay in its buffer and are handed out by the next
//! [`LineReader::recv_line`] or [`LineReader::recv_exact`] call, so no byte is
//! ever lost or read twice when the two modes alternate.

use thiserror::Error;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tracing::trace;

/// Control-line delimiter.
pub const LINE_END: u8 = b'\n';

/// Unit in which payload bytes are copied between reader and writer.
pub const CHUNK_SIZE: usize = 4096;

/// Default cap on a control line read by [`LineReader::new`].
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Errors raised while reading or writing frames.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream before an announced payload was complete.
    #[error("truncated transfer: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },

    /// The local payload source ended before the announced length was sent.
    #[error("payload source exhausted: announced {expected} bytes, only {sent} available")]
    SourceExhausted { expected: u64, sent: u64 },

    /// A control line grew past the reader's cap without a delimiter.
    #[error("control line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// Payload bytes were read from the stream but the local sink refused
    /// them.  `consumed` counts every byte taken off the stream so far.
    #[error("could not store payload ({consumed} of {expected} bytes consumed): {source}")]
    SinkFailed {
        expected: u64,
        consumed: u64,
        #[source]
        source: std::io::Error,
    },
}

// ── Writing ───────────────────────────────────────────────────────────────────

/// Writes `text` followed by a single [`LINE_END`] as one frame.
///
/// The delimiter is appended before the write so the frame reaches the
/// stream through a single `write_all` call.
///
/// # Errors
///
/// Returns [`FramingError::Io`] if the stream rejects the write.
pub async fn send_line<W>(writer: &mut W, text: &str) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = Vec::with_capacity(text.len() + 1);
    frame.extend_from_slice(text.as_bytes());
    frame.push(LINE_END);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    trace!("sent line: {text}");
    Ok(())
}

/// Copies exactly `len` bytes from `source` to `writer` in [`CHUNK_SIZE`] units.
///
/// No framing is added around the payload.
///
/// # Errors
///
/// Returns [`FramingError::SourceExhausted`] if `source` ends before `len`
/// bytes were copied, or [`FramingError::Io`] on a read/write failure.
pub async fn send_payload<S, W>(source: &mut S, writer: &mut W, len: u64) -> Result<(), FramingError>
where
    S: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin,
{
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut sent: u64 = 0;
    while sent < len {
        let want = (len - sent).min(CHUNK_SIZE as u64) as usize;
        let n = source.read(&mut chunk[..want]).await?;
        if n == 0 {
            return Err(FramingError::SourceExhausted { expected: len, sent });
        }
        writer.write_all(&chunk[..n]).await?;
        sent += n as u64;
    }
    writer.flush().await?;
    trace!("sent payload of {len} bytes");
    Ok(())
}

// ── Reading ───────────────────────────────────────────────────────────────────

/// Buffered reader that understands both halves of the framing rule.
pub struct LineReader<R> {
    inner: BufReader<R>,
    max_line: Option<usize>,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wraps `inner` in a buffered frame reader capped at [`MAX_LINE_LEN`].
    pub fn new(inner: R) -> Self {
        Self::with_max_line(inner, Some(MAX_LINE_LEN))
    }

    /// Wraps `inner` with an explicit line cap; `None` accepts lines of any
    /// length.
    ///
    /// The cap protects a reader from an untrusted peer.  A client reading
    /// its own server's answers (for example a long `FILES` listing) uses
    /// `None`.
    pub fn with_max_line(inner: R, max_line: Option<usize>) -> Self {
        Self {
            inner: BufReader::new(inner),
            max_line,
        }
    }

    pub fn max_line(&self) -> Option<usize> {
        self.max_line
    }

    /// Reads one control line and strips its delimiter.
    ///
    /// Returns `Ok(None)` when the stream ends before a delimiter arrives; a
    /// partial trailing line is discarded.  Invalid UTF-8 is replaced with
    /// `U+FFFD` rather than reported.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::LineTooLong`] if the reader has a cap and no
    /// delimiter appears within it, or [`FramingError::Io`] on a read failure.
    pub async fn recv_line(&mut self) -> Result<Option<String>, FramingError> {
        let mut buf = Vec::new();
        match self.max_line {
            Some(max) => {
                (&mut self.inner)
                    .take(max as u64 + 1)
                    .read_until(LINE_END, &mut buf)
                    .await?;
            }
            None => {
                self.inner.read_until(LINE_END, &mut buf).await?;
            }
        }

        if buf.last() != Some(&LINE_END) {
            match self.max_line {
                Some(max) if buf.len() > max => {
                    return Err(FramingError::LineTooLong { limit: max });
                }
                _ => return Ok(None),
            }
        }

        buf.pop();
        let line = String::from_utf8_lossy(&buf).into_owned();
        trace!("received line: {line}");
        Ok(Some(line))
    }

    /// Reads exactly `len` payload bytes into memory.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::Truncated`] if the stream ends first; partial
    /// data is never returned.
    pub async fn recv_exact(&mut self, len: u64) -> Result<Vec<u8>, FramingError> {
        let mut payload = Vec::with_capacity(len.min(CHUNK_SIZE as u64) as usize);
        self.recv_exact_into(len, &mut payload).await?;
        Ok(payload)
    }

    /// Streams exactly `len` payload bytes into `sink`.
    ///
    /// Bytes already written to `sink` when an error is detected are the
    /// caller's to discard.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::Truncated`] if the stream ends first,
    /// [`FramingError::SinkFailed`] if `sink` rejects a write, or
    /// [`FramingError::Io`] if the stream fails.  After `SinkFailed` the
    /// stream is still in step: `expected - consumed` payload bytes remain.
    pub async fn recv_exact_into<W>(&mut self, len: u64, sink: &mut W) -> Result<(), FramingError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut received: u64 = 0;
        while received < len {
            let want = (len - received).min(CHUNK_SIZE as u64) as usize;
            let n = self.inner.read(&mut chunk[..want]).await?;
            if n == 0 {
                return Err(FramingError::Truncated {
                    expected: len,
                    received,
                });
            }
            received += n as u64;
            sink.write_all(&chunk[..n])
                .await
                .map_err(|source| FramingError::SinkFailed {
                    expected: len,
                    consumed: received,
                    source,
                })?;
        }
        sink.flush().await.map_err(|source| FramingError::SinkFailed {
            expected: len,
            consumed: received,
            source,
        })?;
        trace!("received payload of {len} bytes");
        Ok(())
    }

    /// Consumes the reader and returns the wrapped stream.
    ///
    /// Any bytes still buffered are dropped.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
