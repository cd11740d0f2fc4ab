//! SSE delta relay: pumps an upstream event-stream response into ordered
//! plain-text deltas.
//!
//! The upstream chat-completions API emits newline-delimited frames of the
//! form `data: <json>` terminated by a literal `data: [DONE]` sentinel. This
//! module maintains a single byte buffer across reads, processes only
//! newline-terminated frames, and forwards each non-empty text delta in
//! arrival order. Added latency is bounded by the time to receive one full
//! line, not one full response.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::LlmError;

/// Prefix of an event-stream data line. Lines without it are keep-alives.
pub const DATA_PREFIX: &str = "data:";

/// Payload signaling the end of the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Extract the data payload from one event-stream line, if it carries one.
/// Returns `None` for comments, event names, and blank keep-alive lines.
pub fn parse_sse_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed.strip_prefix(DATA_PREFIX).map(str::trim)
}

/// Extract the incremental text field from a parsed data payload. Unparsable
/// payloads yield `None` and are ignored by the relay.
pub fn parse_delta(payload: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(payload).ok()?;
    json.get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

/// Relay text deltas from an upstream SSE byte stream onto `tx`.
///
/// Frames split across chunk boundaries are reassembled; only
/// newline-terminated frames are processed, so a payload containing escaped
/// newlines is never split prematurely. On the first `[DONE]` the relay stops
/// immediately and any remaining buffered bytes are dropped. On an upstream
/// read error the error is forwarded on `tx` and returned; the channel closes
/// when the sender drops. A failed send means the receiver is gone (client
/// disconnect) and the upstream read is abandoned promptly.
pub async fn relay_deltas<S, E>(
    mut upstream: S,
    tx: mpsc::Sender<Result<Bytes, LlmError>>,
) -> Result<(), LlmError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut buffer = BytesMut::new();

    while let Some(chunk) = upstream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let message = format!("upstream read failed: {e}");
                let _ = tx
                    .send(Err(LlmError::Streaming {
                        message: message.clone(),
                    }))
                    .await;
                return Err(LlmError::Streaming { message });
            }
        };
        buffer.extend_from_slice(&chunk);

        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line = buffer.split_to(pos + 1);
            let line = String::from_utf8_lossy(&line);
            let Some(payload) = parse_sse_line(&line) else {
                continue;
            };
            if payload == DONE_SENTINEL {
                // Stop at the first DONE signal; buffered remainder is dropped.
                return Ok(());
            }
            let Some(delta) = parse_delta(payload) else {
                continue;
            };
            if delta.is_empty() {
                continue;
            }
            if tx.send(Ok(Bytes::from(delta))).await.is_err() {
                debug!("relay receiver dropped, abandoning upstream read");
                return Ok(());
            }
        }
    }

    // Upstream exhausted without a DONE sentinel: close normally.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn delta_frame(content: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    /// Run the relay over the given physical chunks and collect its output,
    /// returning the accumulated text and the relay's result.
    async fn run_relay(chunks: Vec<Vec<u8>>) -> (String, Result<(), LlmError>) {
        let upstream = stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, std::io::Error>(Bytes::from(c))),
        );
        let (tx, mut rx) = mpsc::channel(64);
        let result = relay_deltas(upstream, tx).await;
        let mut out = String::new();
        let mut err = None;
        while let Some(item) = rx.recv().await {
            match item {
                Ok(bytes) => out.push_str(&String::from_utf8_lossy(&bytes)),
                Err(e) => err = Some(e),
            }
        }
        if let Some(e) = err {
            return (out, Err(e));
        }
        (out, result)
    }

    #[tokio::test]
    async fn test_whole_frames_in_one_chunk() {
        let body = format!("{}{}{}", delta_frame("A"), delta_frame("B"), delta_frame("C"));
        let (out, result) = run_relay(vec![body.into_bytes()]).await;
        assert!(result.is_ok());
        assert_eq!(out, "ABC");
    }

    #[tokio::test]
    async fn test_mid_frame_chunk_splits_preserve_order() {
        let body = format!("{}{}{}", delta_frame("A"), delta_frame("B"), delta_frame("C"));
        let bytes = body.as_bytes();
        // Split at every possible boundary pair; output must be identical.
        for i in 0..bytes.len() {
            for j in i..bytes.len() {
                let chunks = vec![
                    bytes[..i].to_vec(),
                    bytes[i..j].to_vec(),
                    bytes[j..].to_vec(),
                ];
                let (out, result) = run_relay(chunks).await;
                assert!(result.is_ok());
                assert_eq!(out, "ABC", "split at ({i},{j})");
            }
        }
    }

    #[tokio::test]
    async fn test_payload_arriving_byte_by_byte() {
        let body = delta_frame("hello world");
        let chunks: Vec<Vec<u8>> = body.as_bytes().iter().map(|&b| vec![b]).collect();
        let (out, result) = run_relay(chunks).await;
        assert!(result.is_ok());
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn test_done_stops_and_ignores_trailing_bytes() {
        let body = format!(
            "{}data: [DONE]\n{}",
            delta_frame("kept"),
            delta_frame("dropped")
        );
        let (out, result) = run_relay(vec![body.into_bytes()]).await;
        assert!(result.is_ok());
        assert_eq!(out, "kept");
    }

    #[tokio::test]
    async fn test_done_drops_buffered_remainder_in_same_chunk() {
        // A complete frame sits in the buffer behind the sentinel line but is
        // never processed: the relay stops at the first DONE signal.
        let body = format!("data: [DONE]\n{}", delta_frame("late"));
        let (out, result) = run_relay(vec![body.into_bytes()]).await;
        assert!(result.is_ok());
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn test_non_data_lines_ignored() {
        let body = format!(
            "event: message\n: keep-alive\n\n{}retry: 100\n{}",
            delta_frame("A"),
            delta_frame("B")
        );
        let (out, result) = run_relay(vec![body.into_bytes()]).await;
        assert!(result.is_ok());
        assert_eq!(out, "AB");
    }

    #[tokio::test]
    async fn test_unparsable_payload_ignored() {
        let body = format!("data: {{not json\n{}", delta_frame("ok"));
        let (out, result) = run_relay(vec![body.into_bytes()]).await;
        assert!(result.is_ok());
        assert_eq!(out, "ok");
    }

    #[tokio::test]
    async fn test_escaped_newlines_inside_payload_survive() {
        // The JSON escape keeps the frame on one physical line; the decoded
        // delta contains a real newline.
        let body = delta_frame("line one\nline two");
        let (out, result) = run_relay(vec![body.into_bytes()]).await;
        assert!(result.is_ok());
        assert_eq!(out, "line one\nline two");
    }

    #[tokio::test]
    async fn test_empty_delta_not_forwarded() {
        let body = format!("{}{}", delta_frame(""), delta_frame("x"));
        let (out, result) = run_relay(vec![body.into_bytes()]).await;
        assert!(result.is_ok());
        assert_eq!(out, "x");
    }

    #[tokio::test]
    async fn test_exhaustion_without_done_closes_normally() {
        let body = delta_frame("tail");
        let (out, result) = run_relay(vec![body.into_bytes()]).await;
        assert!(result.is_ok());
        assert_eq!(out, "tail");
    }

    #[tokio::test]
    async fn test_upstream_error_forwarded_and_returned() {
        let upstream = stream::iter(vec![
            Ok(Bytes::from(delta_frame("partial"))),
            Err(std::io::Error::other("connection reset")),
        ]);
        let (tx, mut rx) = mpsc::channel(64);
        let result = relay_deltas(upstream, tx).await;
        assert!(matches!(result, Err(LlmError::Streaming { .. })));

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(&first[..], b"partial");
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, Err(LlmError::Streaming { .. })));
        // Sender dropped afterward: channel is closed.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_receiver_drop_abandons_upstream() {
        let frames: Vec<_> = (0..100)
            .map(|i| Ok::<_, std::io::Error>(Bytes::from(delta_frame(&format!("t{i}")))))
            .collect();
        let upstream = stream::iter(frames);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        // Must return promptly instead of draining all 100 frames into a
        // closed channel.
        let result = relay_deltas(upstream, tx).await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(parse_sse_line("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(parse_sse_line("  data: [DONE]  "), Some("[DONE]"));
        assert_eq!(parse_sse_line("event: message"), None);
        assert_eq!(parse_sse_line(": comment"), None);
        assert_eq!(parse_sse_line(""), None);
    }

    #[test]
    fn test_parse_delta() {
        let payload = r#"{"choices":[{"delta":{"content":"Hi"}}]}"#;
        assert_eq!(parse_delta(payload).as_deref(), Some("Hi"));
        assert_eq!(parse_delta(r#"{"choices":[{"delta":{}}]}"#), None);
        assert_eq!(parse_delta("not json"), None);
    }
}
