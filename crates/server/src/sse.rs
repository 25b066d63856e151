//! Server-sent event responses

use std::convert::Infallible;
use std::time::Instant;

use async_stream::stream;
use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
};
use futures::{Stream, StreamExt};
use medassist_pipeline::EventReceiver;
use uuid::Uuid;

use crate::metrics;

/// Wrap a stream of ready-made frames in an event-stream response
pub fn sse_response<S>(frames: S) -> Response
where
    S: Stream<Item = String> + Send + 'static,
{
    let body = Body::from_stream(frames.map(Ok::<_, Infallible>));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}

/// Frame dispatcher events, stopping after the terminal one
pub fn tts_event_frames(
    mut events: EventReceiver,
    stream_id: Uuid,
) -> impl Stream<Item = String> + Send {
    stream! {
        let started = Instant::now();
        let mut frames = 0usize;

        while let Some(event) = events.recv().await {
            metrics::record_tts_event(&event);
            let terminal = event.is_terminal();

            match event.to_sse_frame() {
                Ok(frame) => {
                    frames += 1;
                    yield frame;
                }
                Err(e) => {
                    tracing::error!(%stream_id, error = %e, kind = event.kind(), "Failed to encode TTS event");
                    break;
                }
            }

            if terminal {
                break;
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_tts_stream_duration(elapsed);
        tracing::info!(%stream_id, frames, elapsed_secs = elapsed, "TTS stream finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medassist_core::{StreamEvent, TextChunk};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_frames_stop_at_terminal_event() {
        let (tx, rx) = mpsc::unbounded_channel();
        let chunks = vec![TextChunk::new(0, "Rest.")];
        tx.send(StreamEvent::metadata(&chunks)).unwrap();
        tx.send(StreamEvent::Complete { total_chunks: 1 }).unwrap();
        tx.send(StreamEvent::Error { message: "late".into() }).unwrap();

        let frames: Vec<String> = tts_event_frames(rx, Uuid::new_v4()).collect().await;

        assert_eq!(frames.len(), 2);
        assert!(frames[0].starts_with("data: {\"type\":\"metadata\""));
        assert_eq!(frames[1], "data: {\"type\":\"complete\",\"totalChunks\":1}\n\n");
    }

    #[tokio::test]
    async fn test_frames_end_when_sender_dropped() {
        let (tx, rx) = mpsc::unbounded_channel::<StreamEvent>();
        drop(tx);

        let frames: Vec<String> = tts_event_frames(rx, Uuid::new_v4()).collect().await;
        assert!(frames.is_empty());
    }

    #[test]
    fn test_sse_headers() {
        let response = sse_response(futures::stream::iter(vec!["data: x\n\n".to_string()]));
        let headers = response.headers();

        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");
    }
}
