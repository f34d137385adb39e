//! Incremental decoding of `text/event-stream` bodies.

/// Accumulates body chunks and yields the data of each complete event.
///
/// Bytes are buffered raw and decoded one complete frame at a time, so a
/// character split across chunks arrives intact.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Append a chunk of the response body.
    ///
    /// Carriage returns are dropped, turning `\r\n` line endings into `\n`.
    /// `\r` never occurs inside a multi-byte UTF-8 sequence.
    pub(crate) fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));
    }

    /// Take the next complete event that carries data.
    ///
    /// Comment-only frames (keep-alives) are skipped.
    pub(crate) fn next_event(&mut self) -> Option<String> {
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(data) = frame_data(&String::from_utf8_lossy(&frame)) {
                return Some(data);
            }
        }
        None
    }
}

/// Join the `data:` lines of one frame, or `None` if it has none.
fn frame_data(frame: &str) -> Option<String> {
    let lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        decoder.push(b"data: {\"step\":");
        assert_eq!(decoder.next_event(), None);

        decoder.push(b"1}\n\ndata: {\"step\":2}\n");
        assert_eq!(decoder.next_event().as_deref(), Some("{\"step\":1}"));
        assert_eq!(decoder.next_event(), None);

        decoder.push(b"\n");
        assert_eq!(decoder.next_event().as_deref(), Some("{\"step\":2}"));
    }

    #[test]
    fn keep_alive_comments_are_skipped() {
        let mut decoder = SseDecoder::default();
        decoder.push(b":\n\n: ping\n\ndata: ready\n\n");
        assert_eq!(decoder.next_event().as_deref(), Some("ready"));
        assert_eq!(decoder.next_event(), None);
    }

    #[test]
    fn characters_split_across_chunks_stay_intact() {
        let frame = "data: {\"code\":\"Text('θ → π')\"}\n\n".as_bytes();
        let split = frame.iter().position(|&b| b == 0xCE).unwrap() + 1;

        let mut decoder = SseDecoder::default();
        decoder.push(&frame[..split]);
        assert_eq!(decoder.next_event(), None);
        decoder.push(&frame[split..]);

        assert_eq!(
            decoder.next_event().as_deref(),
            Some("{\"code\":\"Text('θ → π')\"}")
        );
    }

    #[test]
    fn multiline_data_and_crlf() {
        let mut decoder = SseDecoder::default();
        decoder.push(b"event: progress\r\ndata: a\r\ndata: b\r\n\r\n");
        assert_eq!(decoder.next_event().as_deref(), Some("a\nb"));
    }
}
