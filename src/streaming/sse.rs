//! Reassembly of upstream SSE text into `data:` payloads.

/// Accumulates raw chunks and yields complete `data:` payloads.
///
/// Upstream chunks may split lines anywhere; only complete lines are parsed.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: String,
}

/// One parsed `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseData {
    Json(String),
    Done,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw text and drain every complete `data:` line.
    pub fn push(&mut self, text: &str) -> Vec<SseData> {
        self.buffer.push_str(text);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(data) = parse_line(&line) {
                out.push(data);
            }
        }
        out
    }

    /// Parse whatever is left once the upstream closes without a newline.
    pub fn finish(&mut self) -> Option<SseData> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &str) -> Option<SseData> {
    let data = line.trim().strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        None
    } else if data == "[DONE]" {
        Some(SseData::Done)
    } else {
        Some(SseData::Json(data.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_across_chunks() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push("data: {\"a\"").is_empty());
        assert_eq!(
            buf.push(":1}\n\ndata: [DONE]\n"),
            vec![SseData::Json("{\"a\":1}".into()), SseData::Done]
        );
    }

    #[test]
    fn test_ignores_comments_and_events() {
        let mut buf = SseLineBuffer::new();
        let out = buf.push(": keep-alive\nevent: ping\ndata:{\"b\":2}\r\n");
        assert_eq!(out, vec![SseData::Json("{\"b\":2}".into())]);
    }

    #[test]
    fn test_finish_flushes_trailing_line() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push("data: [DONE]").is_empty());
        assert_eq!(buf.finish(), Some(SseData::Done));
        assert_eq!(buf.finish(), None);
    }
}
