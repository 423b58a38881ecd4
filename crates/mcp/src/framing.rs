//! Content-Length message framing for the stdio transport.
//!
//! Each message is a block of `Key: value` header lines ended by a blank
//! line, followed by exactly `Content-Length` bytes of body:
//!
//! ```text
//! Content-Length: 42\r\n
//! \r\n
//! {"jsonrpc":"2.0","id":1,"method":"list_tools"}
//! ```
//!
//! [`ContentLengthCodec`] does the byte-level work for both directions.
//! Writes go through `tokio_util::codec::FramedWrite`. Reads go through
//! [`FrameReader`] instead of `FramedRead`, because a bad header block only
//! spoils one frame and the stream has to keep going after it.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::{Decoder, Encoder};

const READ_CHUNK: usize = 8 * 1024;

/// Longest header line accepted before the line is thrown away.
pub const MAX_HEADER_LINE: usize = 8 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("missing Content-Length header")]
    MissingContentLength,

    #[error("invalid Content-Length {0:?}")]
    InvalidContentLength(String),

    #[error("frame of {length} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { length: usize, limit: usize },

    #[error("header line exceeds the {limit} byte limit")]
    HeaderTooLarge { limit: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FramingError {
    /// Only transport failures end the stream; the rest spoil a single frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Headers {
        content_length: Option<usize>,
        seen_header: bool,
    },
    Body(usize),
    Discard(usize),
    SkipLine,
}

impl State {
    const START: State = State::Headers {
        content_length: None,
        seen_header: false,
    };
}

#[derive(Debug, Clone)]
pub struct ContentLengthCodec {
    max_frame_bytes: usize,
    state: State,
}

impl ContentLengthCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            max_frame_bytes,
            state: State::START,
        }
    }

    fn in_progress(&self) -> bool {
        self.state != State::START
    }

    /// Fold one header line into the current state.
    fn header_line(
        &mut self,
        line: &str,
        content_length: Option<usize>,
    ) -> Result<(), FramingError> {
        let mut content_length = content_length;

        // lines without a colon are ignored
        if let Some((key, value)) = line.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                let value = value.trim();
                match value.parse::<usize>() {
                    Ok(length) => content_length = Some(length),
                    Err(_) => {
                        self.state = State::START;
                        return Err(FramingError::InvalidContentLength(value.to_string()));
                    }
                }
            }
        }

        self.state = State::Headers {
            content_length,
            seen_header: true,
        };
        Ok(())
    }

    /// The blank line after the headers was reached.
    fn end_of_headers(&mut self, content_length: Option<usize>) -> Result<(), FramingError> {
        let Some(length) = content_length else {
            self.state = State::START;
            return Err(FramingError::MissingContentLength);
        };

        if length > self.max_frame_bytes {
            self.state = State::Discard(length);
            return Err(FramingError::FrameTooLarge {
                length,
                limit: self.max_frame_bytes,
            });
        }

        self.state = State::Body(length);
        Ok(())
    }
}

impl Default for ContentLengthCodec {
    fn default() -> Self {
        Self::new(usize::MAX)
    }
}

impl Decoder for ContentLengthCodec {
    type Item = Bytes;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FramingError> {
        loop {
            match self.state {
                State::Body(length) => {
                    if src.len() < length {
                        src.reserve(length - src.len());
                        return Ok(None);
                    }
                    self.state = State::START;
                    return Ok(Some(src.split_to(length).freeze()));
                }
                State::Discard(remaining) => {
                    let skipped = remaining.min(src.len());
                    src.advance(skipped);
                    if skipped < remaining {
                        self.state = State::Discard(remaining - skipped);
                        return Ok(None);
                    }
                    self.state = State::START;
                }
                State::SkipLine => match src.iter().position(|b| *b == b'\n') {
                    Some(newline) => {
                        src.advance(newline + 1);
                        self.state = State::START;
                    }
                    None => {
                        src.clear();
                        return Ok(None);
                    }
                },
                State::Headers {
                    content_length,
                    seen_header,
                } => {
                    let Some(newline) = src.iter().position(|b| *b == b'\n') else {
                        if src.len() > MAX_HEADER_LINE {
                            // drop the rest of the line as it arrives
                            src.clear();
                            self.state = State::SkipLine;
                            return Err(FramingError::HeaderTooLarge {
                                limit: MAX_HEADER_LINE,
                            });
                        }
                        return Ok(None);
                    };
                    if newline > MAX_HEADER_LINE {
                        src.advance(newline + 1);
                        self.state = State::START;
                        return Err(FramingError::HeaderTooLarge {
                            limit: MAX_HEADER_LINE,
                        });
                    }
                    let raw = src.split_to(newline + 1);
                    let text = String::from_utf8_lossy(&raw);
                    let line = text.trim_end_matches(['\r', '\n']);

                    if line.is_empty() {
                        // stray newlines between messages
                        if !seen_header {
                            continue;
                        }
                        self.end_of_headers(content_length)?;
                    } else {
                        self.header_line(line, content_length)?;
                    }
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FramingError> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        if !src.is_empty() || self.in_progress() {
            tracing::debug!(
                "Stream closed mid-frame, discarding {} buffered bytes",
                src.len()
            );
            src.clear();
            self.state = State::START;
        }
        Ok(None)
    }
}

impl Encoder<Bytes> for ContentLengthCodec {
    type Error = FramingError;

    fn encode(&mut self, body: Bytes, dst: &mut BytesMut) -> Result<(), FramingError> {
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        dst.reserve(header.len() + body.len());
        dst.put_slice(header.as_bytes());
        dst.put_slice(&body);
        Ok(())
    }
}

/// Pulls frames out of an [`AsyncRead`] one at a time.
pub struct FrameReader<R> {
    reader: R,
    codec: ContentLengthCodec,
    buffer: BytesMut,
    eof: bool,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, codec: ContentLengthCodec) -> Self {
        Self {
            reader,
            codec,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            eof: false,
        }
    }

    /// Next message body, or `None` once the stream has ended.
    ///
    /// A non-fatal error consumes the offending frame; calling again
    /// continues with whatever follows it.
    pub async fn next_frame(&mut self) -> Result<Option<Bytes>, FramingError> {
        loop {
            if self.eof {
                return self.codec.decode_eof(&mut self.buffer);
            }

            if let Some(frame) = self.codec.decode(&mut self.buffer)? {
                return Ok(Some(frame));
            }

            self.buffer.reserve(READ_CHUNK);
            if self.reader.read_buf(&mut self.buffer).await? == 0 {
                self.eof = true;
            }
        }
    }
}
