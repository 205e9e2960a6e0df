//! Incremental SSE framing over raw transport chunks
//!
//! Upstream byte chunks do not align with logical event boundaries: a read
//! may end mid-line or mid-UTF-8-sequence. The decoder buffers whatever is
//! incomplete and carries it over to the next read.

/// One complete server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// `event:` field, when the provider uses typed events
    pub event: Option<String>,
    /// Joined `data:` payload
    pub data: String,
}

/// Push decoder turning raw byte chunks into complete SSE frames
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    /// Undecoded byte tail (partial UTF-8 sequence from the last read)
    bytes: Vec<u8>,
    /// Decoded text not yet terminated by a newline
    line: String,
    /// Pending `event:` field for the frame being assembled
    event: Option<String>,
    /// Pending `data:` lines for the frame being assembled
    data_lines: Vec<String>,
}

impl SseFrameDecoder {
    /// Fresh decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns every frame it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.bytes.extend_from_slice(chunk);
        self.drain_decodable();

        let mut frames = Vec::new();
        while let Some(newline) = self.line.find('\n') {
            let mut line: String = self.line.drain(..=newline).collect();
            line.truncate(line.trim_end_matches(['\n', '\r']).len());
            if let Some(frame) = self.take_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Move the maximal valid UTF-8 prefix of `bytes` into `line`
    fn drain_decodable(&mut self) {
        loop {
            match std::str::from_utf8(&self.bytes) {
                Ok(text) => {
                    self.line.push_str(text);
                    self.bytes.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    let prefix = std::str::from_utf8(&self.bytes[..valid]).unwrap_or_default();
                    self.line.push_str(prefix);
                    if err.error_len().is_none() {
                        // Incomplete trailing sequence; keep for the next read
                        self.bytes.drain(..valid);
                        return;
                    }
                    // Genuinely invalid byte: replace and continue
                    self.line.push('\u{FFFD}');
                    let skip = valid + err.error_len().unwrap_or(1);
                    self.bytes.drain(..skip);
                }
            }
        }
    }

    /// Process one complete line; returns a frame when a blank line closes one
    fn take_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            if self.data_lines.is_empty() {
                self.event = None;
                return None;
            }
            return Some(SseFrame {
                event: self.event.take(),
                data: std::mem::take(&mut self.data_lines).join("\n"),
            });
        }
        if let Some(rest) = line.strip_prefix("data:") {
            self.data_lines.push(rest.strip_prefix(' ').unwrap_or(rest).to_owned());
        } else if let Some(rest) = line.strip_prefix("event:") {
            self.event = Some(rest.strip_prefix(' ').unwrap_or(rest).to_owned());
        }
        // Comments (":"), "id:", and "retry:" fields are ignored
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_complete_events() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.feed(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "{\"a\":1}");
        assert_eq!(frames[1].data, "{\"b\":2}");
    }

    #[test]
    fn holds_over_partial_lines() {
        let mut decoder = SseFrameDecoder::new();
        assert!(decoder.feed(b"data: {\"text\":\"hel").is_empty());
        let frames = decoder.feed(b"lo\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"text\":\"hello\"}");
    }

    #[test]
    fn holds_over_split_utf8() {
        // "é" is 0xC3 0xA9; split it across reads
        let mut decoder = SseFrameDecoder::new();
        assert!(decoder.feed(b"data: caf\xC3").is_empty());
        let frames = decoder.feed(b"\xA9\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "café");
    }

    #[test]
    fn captures_typed_events() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.feed(b"event: content_block_delta\ndata: {\"x\":1}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("content_block_delta"));
    }

    #[test]
    fn joins_multi_line_data() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.feed(b"data: line1\ndata: line2\n\n");
        assert_eq!(frames[0].data, "line1\nline2");
    }

    #[test]
    fn ignores_comments_and_ids() {
        let mut decoder = SseFrameDecoder::new();
        let frames = decoder.feed(b": keepalive\nid: 7\ndata: x\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "x");
    }
}
