//! Streaming relay
//!
//! Re-frames an upstream chat-completion event stream for the client.

use std::fmt::Display;
use std::pin::Pin;

use async_stream::stream;
use tokio_stream::{Stream, StreamExt};

/// Terminal frame of every relayed stream
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Relayed frame stream
pub type FrameStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Line buffer for upstream bytes
///
/// Network reads split lines arbitrarily, so bytes are held until a full
/// line is available.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add bytes, return complete lines without terminators
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..line.len() - 1]));
        }
        lines
    }

    /// Take whatever is left as a final line
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

enum Line {
    Data(String),
    Done,
    Skip,
}

fn classify(line: &str) -> Line {
    let Some(payload) = line.strip_prefix("data:") else {
        return Line::Skip;
    };
    let payload = payload.trim();
    if payload.is_empty() {
        Line::Skip
    } else if payload == "[DONE]" {
        Line::Done
    } else {
        Line::Data(payload.to_string())
    }
}

fn data_frame(payload: &str) -> String {
    format!("data: {payload}\n\n")
}

/// Relay an upstream SSE byte stream as `data:` frames
///
/// Only `data:` lines are forwarded. The relay stops at the upstream
/// `[DONE]` marker or end of stream; a read error is reported as one
/// `{"error": ...}` frame. The output always ends with [`DONE_FRAME`].
pub fn relay_sse<S, B, E>(upstream: S) -> FrameStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(stream! {
        let mut upstream = Box::pin(upstream);
        let mut buffer = SseLineBuffer::new();

        'relay: loop {
            match upstream.next().await {
                Some(Ok(bytes)) => {
                    for line in buffer.push(bytes.as_ref()) {
                        match classify(&line) {
                            Line::Data(payload) => yield data_frame(&payload),
                            Line::Done => break 'relay,
                            Line::Skip => {}
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "LLM upstream stream failed");
                    let payload = serde_json::json!({ "error": e.to_string() });
                    yield data_frame(&payload.to_string());
                    break 'relay;
                }
                None => {
                    if let Some(line) = buffer.flush() {
                        if let Line::Data(payload) = classify(&line) {
                            yield data_frame(&payload);
                        }
                    }
                    break 'relay;
                }
            }
        }

        yield DONE_FRAME.to_string();
    })
}
