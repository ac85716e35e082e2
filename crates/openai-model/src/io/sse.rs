use bytes::BytesMut;

use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    ChunksError(ChunksError),
    InvalidPayload,
}

/// A type for reading server-sent events from a chunk stream.
///
/// Only `data` fields are delivered. Comment lines (keep-alives) are
/// skipped, and so are the `event`, `id` and `retry` fields.
pub struct Sse {
    buf: BytesMut,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: BytesMut::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Try the buffered data first, a single chunk may carry
            // several events.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::ChunksError)?
            else {
                return Ok(None);
            };
            // Chunk borders may split a character or a `cr lf` pair, so
            // decoding waits until a whole event is buffered.
            self.buf.extend_from_slice(&bytes);
        }
    }

    /// Returns the length of the first complete event, including the blank
    /// line that ends it.
    fn event_len(&self) -> Option<usize> {
        let mut line_start = 0;
        for (idx, byte) in self.buf.iter().enumerate() {
            if *byte != b'\n' {
                continue;
            }
            let line = &self.buf[line_start..idx];
            if line.is_empty() || line == b"\r" {
                return Some(idx + 1);
            }
            line_start = idx + 1;
        }
        None
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        // event         = *( comment / field ) end-of-line
        // comment       = colon *any-char end-of-line
        // field         = 1*name-char [ colon [ space ] *any-char ] end-of-line
        loop {
            let Some(len) = self.event_len() else {
                return Ok(None);
            };
            let event = self.buf.split_to(len);
            let Ok(event) = std::str::from_utf8(&event) else {
                return Err(Error::InvalidPayload);
            };

            let mut data: Option<String> = None;
            for line in event.lines() {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (name, value) = match line.split_once(':') {
                    Some((name, value)) => {
                        (name, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                match name {
                    "data" => {
                        let data = data.get_or_insert_default();
                        if !data.is_empty() {
                            data.push('\n');
                        }
                        data.push_str(value);
                    }
                    "event" | "id" | "retry" => {}
                    _ => return Err(Error::InvalidPayload),
                }
            }

            if let Some(data) = data {
                return Ok(Some(data));
            }
        }
    }
}
