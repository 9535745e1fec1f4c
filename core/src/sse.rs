//! Server-sent event framing for the event protocol.
//!
//! Each event travels as a single `data:` line followed by a blank line:
//!
//! ```text
//! data: {"type":"start","totalHint":2}
//!
//! data: {"type":"record","value":{...},"index":0}
//!
//! ```
//!
//! [`SseDecoder`] reverses this over arbitrary transport chunks. A frame may
//! be split across any number of chunks; it is only returned once its
//! terminating blank line has arrived.

use crate::event::StreamEvent;

/// Response headers for an event stream: no caching, no proxy buffering.
pub const SSE_HEADERS: [(&str, &str); 4] = [
    ("Content-Type", "text/event-stream; charset=utf-8"),
    ("Cache-Control", "no-cache, no-transform"),
    ("Connection", "keep-alive"),
    ("X-Accel-Buffering", "no"),
];

/// The [`SSE_HEADERS`] as an HTTP header block, ending with the blank line
/// that separates headers from the body.
pub fn header_block() -> String {
    let mut block = String::with_capacity(128);
    for (name, value) in SSE_HEADERS {
        block.push_str(name);
        block.push_str(": ");
        block.push_str(value);
        block.push_str("\r\n");
    }
    block.push_str("\r\n");
    block
}

/// Prefix of every payload line.
pub const DATA_PREFIX: &str = "data: ";

/// Encode one event as a complete SSE frame.
pub fn encode_event(event: &StreamEvent) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    let mut frame = String::with_capacity(DATA_PREFIX.len() + json.len() + 2);
    frame.push_str(DATA_PREFIX);
    frame.push_str(&json);
    frame.push_str("\n\n");
    Ok(frame)
}

/// Incremental splitter for SSE frames.
#[derive(Debug, Clone, Default)]
pub struct SseDecoder {
    pending: String,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a transport chunk; returns the payloads of completed frames.
    ///
    /// Payloads have the `data:` prefix removed. Multi-line `data:` fields
    /// are joined with `\n`. Comment lines and other fields are ignored.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        if self.pending.contains('\r') {
            self.pending = self.pending.replace("\r\n", "\n");
        }

        let mut payloads = Vec::new();
        while let Some(split) = self.pending.find("\n\n") {
            let frame: String = self.pending.drain(..split + 2).collect();
            if let Some(payload) = frame_payload(&frame[..split]) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing frame that never received its blank line.
    pub fn finish(self) -> Option<String> {
        let rest = self.pending.trim_end_matches('\n');
        if rest.is_empty() {
            None
        } else {
            frame_payload(rest)
        }
    }

    /// Bytes held while waiting for a frame terminator.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn frame_payload(frame: &str) -> Option<String> {
    let mut data: Option<String> = None;

    for line in frame.lines() {
        let value = match line.strip_prefix("data:") {
            Some(value) => value.strip_prefix(' ').unwrap_or(value),
            None => continue,
        };
        match data.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }

    data
}
