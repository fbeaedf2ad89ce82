//! Incremental `\r?\n` line splitting over a chunked byte body.

use futures_util::{Stream, StreamExt};
use memchr::memchr_iter;

use crate::transport::{ByteStream, TransportError};

/// Reassembles lines from chunks that may split a line (or a multi-byte
/// character) at any byte offset.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and move every completed line into `out`.
    pub fn feed_into(&mut self, chunk: &[u8], out: &mut Vec<String>) {
        self.buffer.extend_from_slice(chunk);
        let mut consumed = 0usize;
        for pos in memchr_iter(b'\n', &self.buffer) {
            out.push(decode_line(&self.buffer[consumed..pos]));
            consumed = pos + 1;
        }
        if consumed > 0 {
            self.buffer.drain(..consumed);
        }
    }

    #[must_use]
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// The trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = decode_line(&self.buffer);
        self.buffer.clear();
        Some(line)
    }
}

// A `\n` byte never occurs inside a multi-byte UTF-8 sequence, so each line
// is decoded on its own.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Turn a chunk stream into a stream of lines.
///
/// A body error is yielded once and ends the stream.
pub fn line_stream(body: ByteStream) -> impl Stream<Item = Result<String, TransportError>> + Send {
    futures_util::stream::unfold(
        (Some(body), LineBuffer::new(), std::collections::VecDeque::<String>::new()),
        |(mut body, mut buffer, mut pending)| async move {
            loop {
                if let Some(line) = pending.pop_front() {
                    return Some((Ok(line), (body, buffer, pending)));
                }
                let stream = body.as_mut()?;
                match stream.next().await {
                    Some(Ok(chunk)) => {
                        let lines: Vec<String> = buffer.feed(&chunk);
                        pending.extend(lines);
                    }
                    Some(Err(err)) => return Some((Err(err), (None, buffer, pending))),
                    None => {
                        let tail = buffer.finish()?;
                        return Some((Ok(tail), (None, buffer, pending)));
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_lines_across_chunk_boundaries() {
        let mut buffer = LineBuffer::new();
        assert!(buffer.feed(b"data: {\"a\"").is_empty());
        assert_eq!(buffer.feed(b":1}\r\ndata: x\n\nda"), vec![
            "data: {\"a\":1}".to_string(),
            "data: x".to_string(),
            String::new(),
        ]);
        assert_eq!(buffer.finish().as_deref(), Some("da"));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_multibyte_split_between_chunks() {
        let text = "data: héllo\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let mut buffer = LineBuffer::new();
        assert!(buffer.feed(&text[..split]).is_empty());
        assert_eq!(buffer.feed(&text[split..]), vec!["data: héllo".to_string()]);
    }

    #[test]
    fn test_finish_keeps_unterminated_tail() {
        let mut buffer = LineBuffer::new();
        let mut lines = buffer.feed(b"a\r\nb\nc");
        lines.extend(buffer.finish());
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_line_stream_yields_error_then_ends() {
        let chunks: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"one\ntw")),
            Ok(Bytes::from_static(b"o\n")),
            Err(TransportError::Body("reset".into())),
            Ok(Bytes::from_static(b"never\n")),
        ];
        let lines: Vec<_> = line_stream(Box::pin(futures_util::stream::iter(chunks)))
            .collect()
            .await;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].as_deref().unwrap(), "one");
        assert_eq!(lines[1].as_deref().unwrap(), "two");
        assert!(lines[2].is_err());
    }
}
