use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Where supervised output ends up.
pub trait LogSink: Send + Sync {
    fn write_info(&self, label: &str, line: &str);
    fn write_error(&self, label: &str, line: &str);
}


/*
    @@@
    @ConsoleSink;
    . Prints each line prefixed with the process label, info to stdout and errors to stderr.
    . Optionally prepends a local HH:MM:SS time stamp.
*/
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    timestamps: bool,
}

impl ConsoleSink {
    pub fn new(timestamps: bool) -> Self {
        Self { timestamps }
    }

    fn format(&self, label: &str, line: &str) -> String {
        if self.timestamps {
            format!("{} {} | {}", chrono::Local::now().format("%H:%M:%S"), label, line)
        } else {
            format!("{} | {}", label, line)
        }
    }
}

impl LogSink for ConsoleSink {
    fn write_info(&self, label: &str, line: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", self.format(label, line));
    }

    fn write_error(&self, label: &str, line: &str) {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{}", self.format(label, line));
    }
}


/// Routes lines into the tracing subscriber instead of the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_info(&self, label: &str, line: &str) {
        tracing::info!(program = %label, "{}", line);
    }

    fn write_error(&self, label: &str, line: &str) {
        tracing::warn!(program = %label, "{}", line);
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub stream: Stream,
    pub label: String,
    pub line: String,
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn info_lines(&self) -> Vec<String> {
        self.lines(Stream::Info)
    }

    pub fn error_lines(&self) -> Vec<String> {
        self.lines(Stream::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }

    fn lines(&self, stream: Stream) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.stream == stream)
            .map(|e| e.line.clone())
            .collect()
    }

    fn push(&self, stream: Stream, label: &str, line: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                stream,
                label: label.to_string(),
                line: line.to_string(),
            });
    }
}

impl LogSink for MemorySink {
    fn write_info(&self, label: &str, line: &str) {
        self.push(Stream::Info, label, line);
    }

    fn write_error(&self, label: &str, line: &str) {
        self.push(Stream::Error, label, line);
    }
}
