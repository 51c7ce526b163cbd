//! Server-sent event decoding for streaming chat responses.
//!
//! Dify streams answers as an SSE-style body: each `data:` line carries a
//! JSON event object, and the stream ends with the `data: [DONE]` sentinel
//! or a plain connection close. The decoder here is pure and synchronous —
//! it turns arbitrary byte chunks into ordered [`StreamEvent`]s, leaving all
//! I/O and callback dispatch to the chat service. Each request owns its own
//! decoder, so concurrent requests never share buffer state.

use bytes::BytesMut;

use crate::types::chat::ChatMessageChunk;

/// One decoded unit from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental answer fragment.
    TextDelta(String),
    /// The `[DONE]` sentinel: the stream is complete.
    Done,
    /// A `data:` payload that failed to parse as JSON. Carried as data, not
    /// an error: one bad fragment must not abort a healthy stream.
    Malformed(String),
}

/// Line-oriented SSE decoder.
///
/// Feed it raw byte chunks as they arrive; it buffers partial lines across
/// chunk boundaries and emits events in wire order. The buffer holds bytes,
/// not text: chunk boundaries can fall inside a multi-byte UTF-8 sequence,
/// so nothing is decoded until a line is complete. A UTF-8 sequence never
/// contains a line feed byte, so splitting on `\n` cannot cut a character.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: BytesMut,
}

impl SseLineDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk of bytes and returns the events completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(newline + 1);
            if let Some(event) = decode_line(String::from_utf8_lossy(&line).trim()) {
                events.push(event);
            }
        }
        events
    }

    /// Drains the buffer at end of input, decoding a trailing unterminated
    /// line if one is pending.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let rest = self.buffer.split();
        decode_line(String::from_utf8_lossy(&rest).trim())
    }
}

/// Decodes a single trimmed line.
///
/// Blank lines and lines without the `data:` prefix carry nothing. A payload
/// of `[DONE]` is the completion sentinel. Other payloads are parsed as chat
/// events; only a non-empty `answer` yields a delta, and bookkeeping events
/// (`message_end`, `ping`, ...) yield nothing.
fn decode_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix("data:")?.trim();

    if payload == "[DONE]" {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<ChatMessageChunk>(payload) {
        Ok(chunk) => match chunk.answer {
            Some(answer) if !answer.is_empty() => Some(StreamEvent::TextDelta(answer)),
            _ => None,
        },
        Err(_) => Some(StreamEvent::Malformed(payload.to_string())),
    }
}
