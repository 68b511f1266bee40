//! Server-Sent Events parser for the streaming responses endpoint.
//!
//! Handles line buffering from chunked responses, `data: ` prefix
//! extraction, and `[DONE]` marker filtering. Yields raw JSON strings for
//! the client to decode.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

/// Parse SSE lines from a byte stream and yield JSON data strings.
pub fn parse_sse_lines<S>(byte_stream: S) -> impl Stream<Item = String> + Send
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    futures::stream::unfold(
        (byte_stream, BytesMut::with_capacity(8192)),
        move |(mut stream, mut buffer)| async move {
            loop {
                // Check buffer for a complete line
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    line_bytes.truncate(line_bytes.len() - 1);
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    let line = match std::str::from_utf8(&line_bytes) {
                        Ok(s) => s,
                        Err(_) => continue, // skip invalid UTF-8 lines
                    };

                    if let Some(data) = extract_sse_data(line) {
                        return Some((data, (stream, buffer)));
                    }
                    continue;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => {
                        buffer.extend_from_slice(&chunk);
                    }
                    Some(Err(e)) => {
                        warn!("SSE stream read error: {e}");
                        return None;
                    }
                    None => return None,
                }
            }
        },
    )
}

/// Extract the data payload from an SSE line.
///
/// Returns `None` for comments, empty lines, non-data fields, and the
/// `[DONE]` marker.
fn extract_sse_data(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed.strip_prefix("data: ").or_else(|| trimmed.strip_prefix("data:"))?;
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_data_line() {
        assert_eq!(
            extract_sse_data("data: {\"type\":\"message\"}"),
            Some("{\"type\":\"message\"}".into())
        );
    }

    #[test]
    fn extract_data_line_no_space() {
        assert_eq!(extract_sse_data("data:{\"a\":1}"), Some("{\"a\":1}".into()));
    }

    #[test]
    fn extract_skips_done_marker() {
        assert_eq!(extract_sse_data("data: [DONE]"), None);
    }

    #[test]
    fn extract_skips_comments_and_other_fields() {
        assert_eq!(extract_sse_data(": keepalive"), None);
        assert_eq!(extract_sse_data("event: ping"), None);
        assert_eq!(extract_sse_data(""), None);
    }

    #[tokio::test]
    async fn parse_lines_single_event() {
        let chunks = vec![Ok(Bytes::from("data: {\"type\":\"hello\"}\n\n"))];
        let stream = futures::stream::iter(chunks);
        let results: Vec<String> = parse_sse_lines(stream).collect().await;
        assert_eq!(results, vec!["{\"type\":\"hello\"}"]);
    }

    #[tokio::test]
    async fn parse_lines_split_across_chunks() {
        let chunks = vec![Ok(Bytes::from("data: {\"par")), Ok(Bytes::from("tial\":true}\n\n"))];
        let stream = futures::stream::iter(chunks);
        let results: Vec<String> = parse_sse_lines(stream).collect().await;
        assert_eq!(results, vec!["{\"partial\":true}"]);
    }

    #[tokio::test]
    async fn parse_lines_stops_at_done() {
        let chunks = vec![Ok(Bytes::from("data: {\"ok\":true}\n\ndata: [DONE]\n\n"))];
        let stream = futures::stream::iter(chunks);
        let results: Vec<String> = parse_sse_lines(stream).collect().await;
        assert_eq!(results, vec!["{\"ok\":true}"]);
    }

    #[tokio::test]
    async fn parse_lines_handles_carriage_returns() {
        let chunks = vec![Ok(Bytes::from("data: {\"cr\":true}\r\n\r\n"))];
        let stream = futures::stream::iter(chunks);
        let results: Vec<String> = parse_sse_lines(stream).collect().await;
        assert_eq!(results, vec!["{\"cr\":true}"]);
    }

    #[tokio::test]
    async fn parse_lines_empty_stream() {
        let chunks: Vec<Result<Bytes, reqwest::Error>> = vec![];
        let stream = futures::stream::iter(chunks);
        let results: Vec<String> = parse_sse_lines(stream).collect().await;
        assert!(results.is_empty());
    }
}
