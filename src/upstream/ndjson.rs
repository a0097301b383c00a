//! Incremental decoder for newline-delimited JSON progress streams.
//!
//! Network chunks do not respect line boundaries, so bytes are buffered until a
//! newline arrives. Blank lines, lines that fail to parse, and objects without
//! a `status` are dropped.

use super::types::PullProgress;
use serde::Deserialize;

#[derive(Deserialize)]
struct RawProgress {
    status: Option<String>,
    completed: Option<u64>,
    total: Option<u64>,
}

#[derive(Debug, Default)]
pub struct ProgressDecoder {
    buf: Vec<u8>,
}

impl ProgressDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every complete event it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<PullProgress> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(self) -> Option<PullProgress> {
        parse_line(&self.buf)
    }
}

fn parse_line(line: &[u8]) -> Option<PullProgress> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    let raw: RawProgress = serde_json::from_str(text).ok()?;
    Some(PullProgress {
        status: raw.status?,
        completed_units: raw.completed,
        total_units: raw.total,
    })
}
