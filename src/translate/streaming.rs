//! Streaming response translation.
//!
//! [`relay_stream`] re-frames ERNIE's newline-delimited event stream into
//! canonical `chat.completion.chunk` payloads. Reading the upstream body
//! and writing to the caller's sink run as two tasks joined by an
//! unbounded FIFO queue, so a slow consumer never stalls the upstream
//! read and frames go out in arrival order.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::ernie_types::{ErnieStreamChunk, ErnieUsage};
use super::framing::FrameSplitter;
use super::openai_types::{
    ChatCompletionChunk, ChunkChoice, ChunkDelta, Usage, FINISH_REASON_STOP,
};
use crate::error::Result;

/// Sentinel payload ending every canonical stream.
pub const DONE_PAYLOAD: &str = "[DONE]";

/// Map one vendor stream frame to one canonical chunk. The terminal frame
/// carries the finish reason on itself, not on a separate chunk.
pub fn stream_chunk(frame: &ErnieStreamChunk, model: &str) -> ChatCompletionChunk {
    let finish_reason = frame.is_end.then(|| FINISH_REASON_STOP.to_string());

    ChatCompletionChunk {
        id: frame.id.clone(),
        object: "chat.completion.chunk".to_string(),
        created: frame.created,
        model: model.to_string(),
        choices: vec![ChunkChoice {
            index: 0,
            delta: ChunkDelta {
                content: Some(frame.result.clone()),
            },
            finish_reason,
        }],
    }
}

/// Running usage snapshot fed by frames that carry cumulative totals.
///
/// Completion tokens are recomputed from the latest totals rather than
/// summed across frames; the vendor repeats the full figures and adding
/// deltas would double count.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: Usage,
}

impl UsageTracker {
    pub fn observe(&mut self, usage: &ErnieUsage) {
        if usage.total_tokens == 0 {
            return;
        }
        self.usage.prompt_tokens = usage.prompt_tokens;
        self.usage.total_tokens = usage.total_tokens;
        self.usage.completion_tokens = usage.total_tokens.saturating_sub(usage.prompt_tokens);
    }

    pub fn into_usage(self) -> Usage {
        self.usage
    }
}

/// Translate a vendor byte stream into canonical SSE payloads written to
/// `sink`, returning the final usage snapshot.
///
/// Frames that fail to decode are logged and skipped; the stream goes on.
/// A closed sink stops forwarding but the remaining frames are still
/// drained (usage keeps accumulating) and the translator exits on the
/// normal path. The `[DONE]` sentinel is written once the upstream ends.
pub async fn relay_stream<S, E>(
    body: S,
    sink: mpsc::UnboundedSender<String>,
    model: &str,
) -> Result<Usage>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (frame_tx, mut frames) = mpsc::unbounded_channel::<String>();

    // Producer: split the upstream body into frames. Dropping frame_tx at
    // the end (or on upstream error) is the end-of-stream signal; dropping
    // `body` closes the underlying response.
    let producer = tokio::spawn(async move {
        let mut body = std::pin::pin!(body);
        let mut splitter = FrameSplitter::sse();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(error = %e, "upstream stream ended with transport error");
                    return;
                }
            };
            splitter.push(&chunk);
            while let Some(frame) = splitter.next_frame() {
                if frame_tx.send(frame).is_err() {
                    return;
                }
            }
        }

        if let Some(frame) = splitter.finish() {
            let _ = frame_tx.send(frame);
        }
    });

    // Consumer: decode, translate, forward.
    let mut tracker = UsageTracker::default();
    let mut forwarding = true;

    while let Some(payload) = frames.recv().await {
        let frame: ErnieStreamChunk = match serde_json::from_str(&payload) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "skipping undecodable stream frame");
                continue;
            }
        };

        tracker.observe(&frame.usage);

        if !forwarding {
            continue;
        }

        let json = serde_json::to_string(&stream_chunk(&frame, model))?;
        if sink.send(json).is_err() {
            debug!("output sink closed, draining remaining frames");
            forwarding = false;
        }
    }

    if forwarding {
        let _ = sink.send(DONE_PAYLOAD.to_string());
    }

    let _ = producer.await;
    Ok(tracker.into_usage())
}
