//! Incremental Server-Sent Events parser
//!
//! Turns the chunked body of a `text/event-stream` response into frames.
//! Chunk boundaries are arbitrary, so bytes are buffered until a full line
//! is available. A frame is dispatched on a blank line; `data:` lines are
//! joined with `\n`, `event:` names the frame, comments and other fields
//! (`id:`, `retry:`) are ignored. A frame with a line longer than
//! `MAX_LINE_LEN` is dropped whole.

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use std::collections::VecDeque;

/// Longest line buffered while waiting for its newline
pub const MAX_LINE_LEN: usize = 8 * 1024 * 1024;

/// One dispatched event-stream frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, if any
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Unnamed frames are what a browser delivers to `onmessage`
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("") | Some("message"))
    }
}

/// Line-buffering parser state
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: BytesMut,
    /// Leading bytes of `buffer` known to hold no newline
    scanned: usize,
    /// Dropping the rest of an oversized line
    in_long_line: bool,
    /// Dropping lines up to the end of the current frame
    skip_frame: bool,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every frame it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let Some(pos) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
                if self.buffer.len() > MAX_LINE_LEN {
                    if !self.in_long_line {
                        self.drop_frame();
                        self.in_long_line = true;
                    }
                    self.buffer.clear();
                }
                self.scanned = self.buffer.len();
                break;
            };

            let mut line = self.buffer.split_to(self.scanned + pos + 1);
            self.scanned = 0;
            if std::mem::take(&mut self.in_long_line) {
                continue;
            }

            line.truncate(line.len() - 1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            if line.len() > MAX_LINE_LEN {
                self.drop_frame();
                continue;
            }
            if self.skip_frame {
                self.skip_frame = !line.is_empty();
                continue;
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn drop_frame(&mut self) {
        tracing::warn!("Dropping live frame with a line over {} bytes", MAX_LINE_LEN);
        self.event = None;
        self.data.clear();
        self.skip_frame = true;
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame { event, data })
    }
}

/// Adapt a byte stream into a stream of frames.
///
/// A read error is yielded once and ends the stream. A frame left
/// incomplete when the body ends is dropped.
pub fn sse_frames<S, E>(byte_stream: S) -> impl Stream<Item = Result<SseFrame, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    futures_util::stream::unfold(
        (byte_stream, SseParser::new(), VecDeque::new(), false),
        |(mut stream, mut parser, mut pending, done)| async move {
            loop {
                if let Some(frame) = pending.pop_front() {
                    return Some((Ok(frame), (stream, parser, pending, done)));
                }
                if done {
                    return None;
                }

                match stream.next().await {
                    Some(Ok(chunk)) => pending.extend(parser.feed(&chunk)),
                    Some(Err(e)) => return Some((Err(e), (stream, parser, pending, true))),
                    None => return None,
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"data: {\"type\":\"new_request\"}\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: None,
                data: "{\"type\":\"new_request\"}".to_string()
            }]
        );
        assert!(frames[0].is_message());
    }

    #[test]
    fn test_frame_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"da").is_empty());
        assert!(parser.feed(b"ta: hel").is_empty());
        assert!(parser.feed(b"lo\r\n").is_empty());
        let frames = parser.feed(b"\r\ndata: next\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "hello");
        assert_eq!(frames[1].data, "next");
    }

    #[test]
    fn test_named_event_without_space() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b"event:connected\ndata:{\"client_id\":\"abc\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("connected"));
        assert_eq!(frames[0].data, "{\"client_id\":\"abc\"}");
        assert!(!frames[0].is_message());
    }

    #[test]
    fn test_multiline_data_and_comments() {
        let mut parser = SseParser::new();
        let frames = parser.feed(b": keepalive\nid: 7\ndata: line one\ndata: line two\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "line one\nline two");
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn test_blank_lines_without_data() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"\n\n: ping\n\n").is_empty());
        // An event name with no data must not leak into the next frame
        assert!(parser.feed(b"event: orphan\n\n").is_empty());
        let frames = parser.feed(b"data: x\n\n");
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn test_line_found_after_many_small_chunks() {
        let mut parser = SseParser::new();
        for b in b"data: one byte at a time" {
            assert!(parser.feed(&[*b]).is_empty());
        }
        let frames = parser.feed(b"\n\n");
        assert_eq!(frames[0].data, "one byte at a time");
    }

    #[test]
    fn test_oversized_line_drops_its_frame() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: big\ndata: head\ndata: ").is_empty());

        // No newline yet: the buffer is released once it passes the limit
        let filler = vec![b'x'; MAX_LINE_LEN];
        assert!(parser.feed(&filler).is_empty());
        assert!(parser.buffer.is_empty());
        assert!(parser.feed(&filler).is_empty());
        assert!(parser.buffer.len() <= MAX_LINE_LEN);

        // The rest of the line and the frame it belongs to are skipped
        assert!(parser.feed(b"tail\ndata: more\n\n").is_empty());

        let frames = parser.feed(b"data: after\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: None,
                data: "after".to_string()
            }]
        );
    }

    #[test]
    fn test_oversized_complete_line_drops_its_frame() {
        let mut parser = SseParser::new();
        let mut chunk = b"data: ".to_vec();
        chunk.extend(vec![b'x'; MAX_LINE_LEN]);
        chunk.extend_from_slice(b"\n\ndata: kept\n\n");

        let frames = parser.feed(&chunk);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "kept");
    }

    #[tokio::test]
    async fn test_stream_adapter() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: a\n\ndata: b")),
            Ok(Bytes::from_static(b"\n\n")),
            Ok(Bytes::from_static(b"data: incomplete")),
        ];
        let frames: Vec<_> = sse_frames(futures_util::stream::iter(chunks))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .map(|r| r.unwrap().data)
            .collect();
        assert_eq!(frames, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stream_adapter_stops_after_error() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: a\n\n")),
            Err(std::io::Error::other("reset")),
            Ok(Bytes::from_static(b"data: never\n\n")),
        ];
        let items: Vec<_> = sse_frames(futures_util::stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }
}
