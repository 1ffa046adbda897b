//! Incremental SSE decoder
//!
//! Upstream bodies arrive in network-sized chunks that ignore event and
//! character boundaries. [`StreamDecoder`] appends raw bytes to one buffer
//! and only decodes complete events. Event delimiters are ASCII, so a
//! complete event never ends inside a multi-byte character.

use bytes::{Buf, BytesMut};
use tollgate_billing::TokenUsage;

use crate::usage;

/// Largest delimiter (`\r\n\r\n`) minus one byte
const DELIMITER_OVERLAP: usize = 3;

/// Largest incomplete event kept in memory
///
/// A `response.completed` event repeats the whole response, so this is
/// generous. Bytes past it are still relayed, just not parsed.
pub const MAX_EVENT_BYTES: usize = 8 * 1024 * 1024;

/// Reassembles SSE events from arbitrary chunks and keeps the last usage seen
#[derive(Debug)]
pub struct StreamDecoder {
    buffer: BytesMut,
    /// Offset up to which `buffer` holds no delimiter start
    scanned: usize,
    max_event_bytes: usize,
    /// The current event outgrew the cap and is being skipped
    oversized: bool,
    usage: Option<TokenUsage>,
    events: u64,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::with_max_event_bytes(MAX_EVENT_BYTES)
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that skips events larger than `max_event_bytes`
    pub fn with_max_event_bytes(max_event_bytes: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            scanned: 0,
            max_event_bytes: max_event_bytes.max(DELIMITER_OVERLAP + 1),
            oversized: false,
            usage: None,
            events: 0,
        }
    }

    /// Append a raw chunk and decode every event it completes
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);

        while let Some((end, delimiter_len)) = find_delimiter(&self.buffer, self.scanned) {
            let event = self.buffer.split_to(end);
            self.buffer.advance(delimiter_len);
            self.scanned = 0;

            if self.oversized {
                // Tail of an event whose head was already dropped
                self.oversized = false;
            } else if event.len() > self.max_event_bytes {
                self.warn_oversized();
            } else {
                self.decode_event(&event);
            }
        }

        if self.buffer.len() > self.max_event_bytes {
            if !self.oversized {
                self.warn_oversized();
            }
            self.oversized = true;
            // Keep enough to spot a delimiter split across chunks
            self.buffer.advance(self.buffer.len() - DELIMITER_OVERLAP);
        }

        self.scanned = self.buffer.len().saturating_sub(DELIMITER_OVERLAP);
    }

    /// Decode whatever is left once the upstream body has ended
    ///
    /// Returns the last usage observed over the whole stream.
    pub fn finish(&mut self) -> Option<TokenUsage> {
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            self.scanned = 0;
            if !std::mem::take(&mut self.oversized) && rest.len() <= self.max_event_bytes {
                self.decode_event(&rest);
            }
        }

        self.usage
    }

    /// Last usage observed so far
    pub const fn usage(&self) -> Option<TokenUsage> {
        self.usage
    }

    /// Number of complete events decoded
    pub const fn events(&self) -> u64 {
        self.events
    }

    fn warn_oversized(&self) {
        tracing::warn!(
            max_event_bytes = self.max_event_bytes,
            "SSE event exceeds size limit, skipping it"
        );
    }

    fn decode_event(&mut self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let Some(data) = event_data(&text) else {
            return;
        };

        self.events += 1;

        if data.trim() == "[DONE]" {
            return;
        }

        match serde_json::from_str::<serde_json::Value>(&data) {
            Ok(value) => {
                if let Some(usage) = usage::extract(&value) {
                    self.usage = Some(usage);
                }
            }
            Err(e) => {
                tracing::trace!(error = %e, "skipping non-JSON SSE event");
            }
        }
    }
}

/// Find the earliest `\n\n` or `\r\n\r\n` at or after `from`
fn find_delimiter(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut idx = from;

    while idx + 1 < buf.len() {
        if buf[idx] == b'\n' && buf[idx + 1] == b'\n' {
            return Some((idx, 2));
        }
        if buf[idx..].starts_with(b"\r\n\r\n") {
            return Some((idx, 4));
        }
        idx += 1;
    }

    None
}

/// Join the `data:` lines of one event; `None` when it has none
///
/// Comments (`:`), `event:`, `id:` and `retry:` lines are ignored.
fn event_data(event: &str) -> Option<String> {
    let mut data: Option<String> = None;

    for line in event.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);

        match &mut data {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(value);
            }
            None => data = Some(value.to_owned()),
        }
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT_STREAM: &str = concat!(
        ": keepalive\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"Grüße 👋\"}}],\"usage\":null}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"日本語\"}}],\"usage\":null}\n\n",
        "data: {\"id\":\"c1\",\"choices\":[],\"usage\":{\"prompt_tokens\":100,\"completion_tokens\":50}}\n\n",
        "data: [DONE]\n\n",
    );

    fn expected() -> TokenUsage {
        TokenUsage {
            input: 100,
            output: 50,
            ..TokenUsage::default()
        }
    }

    fn decode_in_pieces(stream: &[u8], cuts: &[usize]) -> Option<TokenUsage> {
        let mut decoder = StreamDecoder::new();
        let mut start = 0;
        for &cut in cuts {
            decoder.feed(&stream[start..cut]);
            start = cut;
        }
        decoder.feed(&stream[start..]);
        decoder.finish()
    }

    #[test]
    fn single_chunk() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(CHAT_STREAM.as_bytes());

        assert_eq!(decoder.usage(), Some(expected()));
        assert_eq!(decoder.events(), 4);
    }

    #[test]
    fn byte_at_a_time() {
        let bytes = CHAT_STREAM.as_bytes();
        let cuts: Vec<usize> = (1..bytes.len()).collect();

        assert_eq!(decode_in_pieces(bytes, &cuts), Some(expected()));
    }

    #[test]
    fn every_two_way_split() {
        let bytes = CHAT_STREAM.as_bytes();

        for cut in 1..bytes.len() {
            assert_eq!(decode_in_pieces(bytes, &[cut]), Some(expected()), "cut at {cut}");
        }
    }

    #[test]
    fn split_inside_delimiter() {
        let bytes = CHAT_STREAM.as_bytes();
        let usage_start = CHAT_STREAM.find("data: {\"id\":\"c1\",\"choices\":[],").unwrap();
        let delimiter = usage_start + CHAT_STREAM[usage_start..].find("\n\n").unwrap();

        assert_eq!(decode_in_pieces(bytes, &[delimiter + 1]), Some(expected()));
    }

    #[test]
    fn split_inside_multibyte_character() {
        let bytes = CHAT_STREAM.as_bytes();
        let emoji = CHAT_STREAM.find('👋').unwrap();

        for offset in 1..4 {
            assert_eq!(decode_in_pieces(bytes, &[emoji + offset]), Some(expected()));
        }
    }

    #[test]
    fn usage_event_split_across_three_chunks() {
        let bytes = CHAT_STREAM.as_bytes();
        let usage_start = CHAT_STREAM.find("\"usage\":{").unwrap();

        let usage = decode_in_pieces(bytes, &[usage_start + 3, usage_start + 17, usage_start + 40]);
        assert_eq!(usage, Some(expected()));
    }

    #[test]
    fn crlf_delimiters_and_multiline_data() {
        let stream = concat!(
            "event: response.completed\r\n",
            "data: {\"type\":\"response.completed\",\r\n",
            "data: \"response\":{\"usage\":{\"input_tokens\":500,\"input_tokens_details\":{\"cached_tokens\":200},",
            "\"output_tokens\":300,\"output_tokens_details\":{\"reasoning_tokens\":50}}}}\r\n\r\n",
        );

        let usage = decode_in_pieces(stream.as_bytes(), &[10, 60]).unwrap();

        assert_eq!(usage.input, 300);
        assert_eq!(usage.output, 250);
        assert_eq!(usage.reasoning, 50);
        assert_eq!(usage.cache_read, 200);
    }

    #[test]
    fn last_usage_wins() {
        let stream = concat!(
            "data: {\"usage\":{\"prompt_tokens\":1,\"completion_tokens\":1}}\n\n",
            "data: {\"usage\":{\"prompt_tokens\":100,\"completion_tokens\":50}}\n\n",
        );

        assert_eq!(decode_in_pieces(stream.as_bytes(), &[]), Some(expected()));
    }

    #[test]
    fn garbage_events_are_skipped() {
        let stream = concat!(
            "data: {not json\n\n",
            "retry: 1000\n\n",
            "data: {\"usage\":{\"prompt_tokens\":100,\"completion_tokens\":50}}\n\n",
        );

        assert_eq!(decode_in_pieces(stream.as_bytes(), &[7]), Some(expected()));
    }

    #[test]
    fn no_usage_in_stream() {
        let stream = "data: {\"choices\":[]}\n\ndata: [DONE]\n\n";

        assert_eq!(decode_in_pieces(stream.as_bytes(), &[5]), None);
    }

    #[test]
    fn trailing_event_without_delimiter_is_decoded_on_finish() {
        let stream = "data: {\"usage\":{\"prompt_tokens\":100,\"completion_tokens\":50}}";

        let mut decoder = StreamDecoder::new();
        decoder.feed(stream.as_bytes());
        assert_eq!(decoder.usage(), None);
        assert_eq!(decoder.finish(), Some(expected()));
    }

    #[test]
    fn unterminated_event_does_not_grow_buffer() {
        let mut decoder = StreamDecoder::with_max_event_bytes(64);
        let filler = [b'x'; 50];

        decoder.feed(b"data: {\"padding\":\"");
        for _ in 0..1_000 {
            decoder.feed(&filler);
            assert!(decoder.buffer.len() <= 64 + filler.len());
        }

        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn oversized_event_is_skipped_and_decoding_resumes() {
        let big = format!("data: {{\"usage\":{{\"prompt_tokens\":1,\"completion_tokens\":1}},\"pad\":\"{}\"}}\n\n", "x".repeat(500));
        let stream = format!("{big}data: {{\"usage\":{{\"prompt_tokens\":100,\"completion_tokens\":50}}}}\n\n");
        let bytes = stream.as_bytes();

        for chunk_size in [1, 7, 64, 256, bytes.len()] {
            let mut decoder = StreamDecoder::with_max_event_bytes(128);
            for chunk in bytes.chunks(chunk_size) {
                decoder.feed(chunk);
            }

            assert_eq!(decoder.finish(), Some(expected()), "chunk size {chunk_size}");
            assert_eq!(decoder.events(), 1, "chunk size {chunk_size}");
        }
    }
}
