/// Accumulates raw SSE bytes and yields complete `\n\n`-terminated frames.
///
/// Bytes are kept undecoded until a frame is complete, so a multibyte
/// character split across network chunks survives intact.
#[derive(Debug, Default)]
pub struct SseBuffer {
    buffer: Vec<u8>,
}

impl SseBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) {
        // CR never occurs inside a UTF-8 sequence or a JSON payload.
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));
    }

    pub fn next_event_block(&mut self) -> Option<String> {
        let boundary = self.buffer.windows(2).position(|w| w == b"\n\n")?;
        let rest = self.buffer.split_off(boundary + 2);
        let frame = std::mem::replace(&mut self.buffer, rest);
        Some(String::from_utf8_lossy(&frame).into_owned())
    }

    /// Whatever is left after the final complete frame.
    pub fn take_remainder(&mut self) -> String {
        let rest = std::mem::take(&mut self.buffer);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

pub fn parse_data_lines_without_done(event_block: &str) -> Vec<&str> {
    event_block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .filter(|data| *data != "[DONE]")
        .collect()
}
