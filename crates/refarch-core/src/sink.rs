//! Destinations for live subprocess output.

use std::sync::Mutex;

/// Receives subprocess output as it is produced.
pub trait LineSink: Send + Sync {
    /// One stdout line, without its trailing newline.
    fn line(&self, line: &str);

    /// Buffered diagnostic text from a failed command.
    fn diagnostic(&self, text: &str);
}

/// Forwards output to `tracing` under the `refarch::subprocess` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LineSink for TracingSink {
    fn line(&self, line: &str) {
        tracing::info!(target: "refarch::subprocess", "{line}");
    }

    fn diagnostic(&self, text: &str) {
        tracing::error!(target: "refarch::subprocess", "{text}");
    }
}

/// Keeps everything in memory. Useful for tests and for callers that want
/// to inspect output after the fact.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
    diagnostics: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl LineSink for MemorySink {
    fn line(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }

    fn diagnostic(&self, text: &str) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.line("one");
        sink.line("two");
        sink.diagnostic("boom");
        assert_eq!(sink.lines(), vec!["one", "two"]);
        assert_eq!(sink.diagnostics(), vec!["boom"]);
    }
}
