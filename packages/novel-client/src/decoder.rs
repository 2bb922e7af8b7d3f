//! Event frame decoder for the search stream.
//!
//! Records are separated by a blank line; each carries a `data: ` line with a
//! JSON payload tagged by `type`. Chunks may split a record (or a multi-byte
//! character) anywhere, so raw bytes are buffered and only complete records are
//! decoded.

use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::types::StreamEvent;
use crate::util::truncate_chars;

/// Separator between two records.
pub const RECORD_SEPARATOR: &[u8] = b"\n\n";

/// Prefix of a payload line.
pub const DATA_PREFIX: &str = "data:";

const SNIPPET_CHARS: usize = 200;

/// Incremental decoder. One instance per stream.
#[derive(Debug, Default)]
pub struct EventFrameDecoder {
    buffer: Vec<u8>,
}

impl EventFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and decode every record it completes.
    ///
    /// Records that carry no payload line are skipped silently; records whose
    /// payload cannot be decoded come back as `Err` without affecting the rest.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, DecodeError>> {
        // The held-back bytes contain no separator, so only the seam with the
        // new chunk and the chunk itself need scanning.
        let mut search_from = self
            .buffer
            .len()
            .saturating_sub(RECORD_SEPARATOR.len() - 1);
        self.buffer.extend_from_slice(chunk);

        let mut decoded = Vec::new();
        let mut consumed = 0;
        while let Some(pos) = find_separator(&self.buffer[search_from..]) {
            let end = search_from + pos;
            if let Some(item) = decode_record(&self.buffer[consumed..end]) {
                decoded.push(item);
            }
            consumed = end + RECORD_SEPARATOR.len();
            search_from = consumed;
        }
        self.buffer.drain(..consumed);

        decoded
    }

    /// Bytes held back waiting for the rest of a record.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Signal end of input. Reports a truncated record if one is left over.
    pub fn finish(&mut self) -> Option<DecodeError> {
        let pending = std::mem::take(&mut self.buffer);
        if pending.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        warn!(pending_bytes = pending.len(), "Search stream ended inside a record");
        Some(DecodeError::Truncated {
            pending_bytes: pending.len(),
        })
    }
}

fn find_separator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(RECORD_SEPARATOR.len())
        .position(|window| window == RECORD_SEPARATOR)
}

/// Decode one complete record. `None` means there was nothing to decode.
fn decode_record(record: &[u8]) -> Option<Result<StreamEvent, DecodeError>> {
    let text = match std::str::from_utf8(record) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Skipping stream record with invalid UTF-8");
            return Some(Err(DecodeError::InvalidUtf8(e.to_string())));
        }
    };

    let mut payload: Option<String> = None;
    for line in text.split('\n') {
        let line = line.trim_end_matches('\r');

        // Skip blank lines and non-data fields (e.g. "event:", "id:", ": comment")
        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            if !line.trim().is_empty() {
                debug!(line = truncate_chars(line, SNIPPET_CHARS), "Skipping non-data line");
            }
            continue;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);

        match payload.as_mut() {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(data);
            }
            None => payload = Some(data.to_string()),
        }
    }

    let payload = payload?;
    if payload.trim().is_empty() {
        return None;
    }

    let result = parse_payload(&payload);
    match &result {
        Ok(event) => debug!(kind = event.kind(), "Decoded stream event"),
        Err(e) => warn!(error = %e, "Skipping malformed stream record"),
    }
    Some(result)
}

/// Parse a JSON payload into a `StreamEvent`, distinguishing the ways it can fail.
pub fn parse_payload(payload: &str) -> Result<StreamEvent, DecodeError> {
    let snippet = || truncate_chars(payload.trim(), SNIPPET_CHARS).to_string();

    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| DecodeError::InvalidJson {
            message: e.to_string(),
            snippet: snippet(),
        })?;

    let Some(kind) = value.get("type").and_then(serde_json::Value::as_str) else {
        return Err(DecodeError::MissingType { snippet: snippet() });
    };
    if !StreamEvent::KINDS.contains(&kind) {
        return Err(DecodeError::UnknownType {
            kind: kind.to_string(),
        });
    }
    let kind = kind.to_string();

    serde_json::from_value(value).map_err(|e| DecodeError::InvalidPayload {
        kind,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = concat!(
        "data: {\"type\":\"start\",\"total\":2,\"keyword\":\"斗破苍穹\"}\n\n",
        "data: {\"type\":\"searching\",\"source\":\"笔趣阁\"}\n\n",
        "data: {\"type\":\"result\",\"source\":\"笔趣阁\",\"completed\":1,\"count\":1,\"total\":2,",
        "\"books\":[{\"source_name\":\"笔趣阁\",\"source_id\":1,\"book_name\":\"斗破苍穹\",",
        "\"author\":\"天蚕土豆\",\"url\":\"https://a.example/1\",\"category\":\"玄幻\",",
        "\"latest_chapter\":null,\"word_count\":\"532万字\",\"status\":\"完结\"}]}\n\n",
        "data: {\"type\":\"error_source\",\"source\":\"S2\",\"error\":\"timeout\",\"completed\":2,\"total\":2}\n\n",
        "data: {\"type\":\"complete\",\"total_books\":0,\"books\":[]}\n\n",
    );

    fn decode_all(decoder: &mut EventFrameDecoder, chunks: &[&[u8]]) -> Vec<StreamEvent> {
        chunks
            .iter()
            .flat_map(|chunk| decoder.push(chunk))
            .map(|item| item.expect("well-formed record"))
            .collect()
    }

    #[test]
    fn test_decodes_whole_stream() {
        let mut decoder = EventFrameDecoder::new();
        let events = decode_all(&mut decoder, &[STREAM.as_bytes()]);

        let kinds: Vec<_> = events.iter().map(StreamEvent::kind).collect();
        assert_eq!(
            kinds,
            ["start", "searching", "result", "error_source", "complete"]
        );
        assert_eq!(decoder.pending_bytes(), 0);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_split_at_every_offset_yields_same_events() {
        let bytes = STREAM.as_bytes();
        let expected = decode_all(&mut EventFrameDecoder::new(), &[bytes]);

        // Includes offsets inside multi-byte characters.
        for offset in 0..=bytes.len() {
            let (head, tail) = bytes.split_at(offset);
            let mut decoder = EventFrameDecoder::new();
            let events = decode_all(&mut decoder, &[head, tail]);
            assert_eq!(events, expected, "split at byte {}", offset);
            assert_eq!(decoder.finish(), None);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let bytes = STREAM.as_bytes();
        let expected = decode_all(&mut EventFrameDecoder::new(), &[bytes]);

        let mut decoder = EventFrameDecoder::new();
        let chunks: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_all(&mut decoder, &chunks), expected);
    }

    #[test]
    fn test_large_record_in_small_pieces() {
        let books: Vec<String> = (0..500)
            .map(|i| {
                format!(
                    r#"{{"source_name":"S","source_id":1,"book_name":"第{}部","url":"https://s/{}"}}"#,
                    i, i
                )
            })
            .collect();
        let record = format!(
            "data: {{\"type\":\"complete\",\"total_books\":500,\"books\":[{}]}}\n\n",
            books.join(",")
        );

        let mut decoder = EventFrameDecoder::new();
        let mut events = Vec::new();
        for piece in record.as_bytes().chunks(13) {
            events.extend(decoder.push(piece));
            // Nothing is emitted until the separator arrives.
            if decoder.pending_bytes() > 0 {
                assert!(events.is_empty());
            }
        }

        assert_eq!(decoder.pending_bytes(), 0);
        match &events[..] {
            [Ok(StreamEvent::Complete { books, .. })] => assert_eq!(books.len(), 500),
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_separator_split_across_pushes() {
        let mut decoder = EventFrameDecoder::new();
        assert!(decoder
            .push(b"data: {\"type\":\"searching\",\"source\":\"A\"}\n")
            .is_empty());
        let results = decoder.push(b"\ndata: {\"type\":\"searching\",\"source\":\"B\"}\n");
        assert_eq!(results.len(), 1);
        assert_eq!(decoder.push(b"\n").len(), 1);
        assert_eq!(decoder.pending_bytes(), 0);
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let input = concat!(
            "data: {\"type\":\"searching\",\"source\":\"A\"}\n\n",
            "data: {not json\n\n",
            "data: {\"type\":\"searching\",\"source\":\"B\"}\n\n",
        );

        let results = EventFrameDecoder::new().push(input.as_bytes());
        assert_eq!(results.len(), 3);
        assert!(matches!(
            &results[0],
            Ok(StreamEvent::SourceSearching { source_name }) if source_name == "A"
        ));
        assert!(matches!(&results[1], Err(DecodeError::InvalidJson { .. })));
        assert!(matches!(
            &results[2],
            Ok(StreamEvent::SourceSearching { source_name }) if source_name == "B"
        ));
    }

    #[test]
    fn test_lines_without_prefix_are_ignored() {
        let input = concat!(
            ": keep-alive\n\n",
            "\n\n",
            "event: progress\ndata: {\"type\":\"searching\",\"source\":\"A\"}\n\n",
            "garbage\n\n",
        );

        let results = EventFrameDecoder::new().push(input.as_bytes());
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[test]
    fn test_crlf_and_multiline_data() {
        let input = "data: {\"type\":\"error\",\r\ndata: \"message\":\"down\"}\r\n\n";

        let results = EventFrameDecoder::new().push(input.as_bytes());
        assert_eq!(
            results,
            vec![Ok(StreamEvent::Fatal {
                message: "down".into()
            })]
        );
    }

    #[test]
    fn test_type_discriminator_errors() {
        assert!(matches!(
            parse_payload(r#"{"source":"A"}"#),
            Err(DecodeError::MissingType { .. })
        ));
        assert_eq!(
            parse_payload(r#"{"type":"progress"}"#),
            Err(DecodeError::UnknownType {
                kind: "progress".into()
            })
        );
        assert!(matches!(
            parse_payload(r#"{"type":"result","source":"A"}"#),
            Err(DecodeError::InvalidPayload { kind, .. }) if kind == "result"
        ));
    }

    #[test]
    fn test_invalid_utf8_record() {
        let mut input = b"data: {\"type\":\"error\",\"message\":\"".to_vec();
        input.extend_from_slice(&[0xff, 0xfe]);
        input.extend_from_slice(b"\"}\n\n");

        let results = EventFrameDecoder::new().push(&input);
        assert!(matches!(&results[..], [Err(DecodeError::InvalidUtf8(_))]));
    }

    #[test]
    fn test_truncated_tail_reported_on_finish() {
        let mut decoder = EventFrameDecoder::new();
        let results = decoder.push(b"data: {\"type\":\"start\",\"total\":1,\"keyword\":\"k\"}\n\ndata: {\"ty");
        assert_eq!(results.len(), 1);
        assert_eq!(decoder.pending_bytes(), 10);

        assert_eq!(
            decoder.finish(),
            Some(DecodeError::Truncated { pending_bytes: 10 })
        );
        // Reported once.
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_trailing_newline_is_not_truncation() {
        let mut decoder = EventFrameDecoder::new();
        decoder.push(b"data: {\"type\":\"error\",\"message\":\"x\"}\n\n\n");
        assert_eq!(decoder.finish(), None);
    }
}
