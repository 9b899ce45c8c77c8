use crate::deferred::Deferred;
use crate::error::LaunchError;
use crate::filter::{CompoundLineFilter, LineFilter};
use crate::sink::LogSink;
use std::io;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Watches one launch's output and settles its readiness result.
///
/// Shared by every child the supervisor spawns for the launch, so the
/// filter set and the readiness latch outlive restarts.
pub struct ReadinessDetector {
    label: String,
    marker: String,
    filter: Mutex<CompoundLineFilter>,
    sink: Arc<dyn LogSink>,
    readiness: Deferred,
}

impl ReadinessDetector {
    pub fn new(
        label: impl Into<String>,
        marker: impl Into<String>,
        filter: CompoundLineFilter,
        sink: Arc<dyn LogSink>,
        readiness: Deferred,
    ) -> Self {
        Self {
            label: label.into(),
            marker: marker.into(),
            filter: Mutex::new(filter),
            sink,
            readiness,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn readiness(&self) -> &Deferred {
        &self.readiness
    }

    pub fn on_stdout(&self, line: &str) {
        let forward = self
            .filter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .filter(line);
        if forward {
            self.sink.write_info(&self.label, line);
        }

        // the raw line decides readiness, whatever the filter said
        if line.contains(self.marker.as_str()) && self.readiness.resolve() {
            info!(program = %self.label, "ready");
        }
    }

    pub fn on_stderr(&self, line: &str) {
        self.sink.write_error(&self.label, line);
    }

    pub fn on_error(&self, error: LaunchError) {
        let shown = error.to_string();
        match self.readiness.reject(error) {
            Ok(()) => warn!(program = %self.label, error = %shown, "launch failed"),
            Err(late) => self.log_error(&late),
        }
    }

    pub fn on_exit(&self, status: ExitStatus) {
        let exited = LaunchError::Exited {
            label: self.label.clone(),
            status: status.to_string(),
        };
        match self.readiness.reject(exited) {
            Ok(()) => warn!(program = %self.label, exit_code = ?status.code(), "exited before becoming ready"),
            Err(_) => info!(program = %self.label, exit_code = ?status.code(), "exited"),
        }
    }

    pub fn on_stopped(&self) {
        let stopped = LaunchError::Stopped {
            label: self.label.clone(),
        };
        if self.readiness.reject(stopped).is_ok() {
            debug!(program = %self.label, "stopped before becoming ready");
        }
    }

    pub fn log_error(&self, error: &LaunchError) {
        error!(program = %self.label, error = %error, "process error");
        self.sink.write_error(&self.label, &error.to_string());
    }

    /// Takes the child's pipes and feeds them to this detector.
    pub fn attach(self: &Arc<Self>, child: &mut Child) -> OutputPumps {
        let mut handles = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            handles.push(tokio::spawn(forward_stdout(stdout, Arc::clone(self))));
        }
        if let Some(stderr) = child.stderr.take() {
            handles.push(tokio::spawn(forward_stderr(stderr, Arc::clone(self))));
        }
        OutputPumps {
            label: self.label.clone(),
            handles,
        }
    }
}


/// Line pumps of one child.
pub struct OutputPumps {
    label: String,
    handles: Vec<JoinHandle<()>>,
}

impl OutputPumps {
    /// Waits for every pump to reach end of stream, at most `limit`.
    pub async fn drain(self, limit: Duration) {
        if timeout(limit, futures::future::join_all(self.handles)).await.is_err() {
            warn!(program = %self.label, "output still open after {:?}; unread lines are not checked for the marker", limit);
        }
    }
}

pub async fn forward_stdout<R>(reader: R, detector: Arc<ReadinessDetector>)
where
    R: AsyncRead + Unpin,
{
    if let Err(e) = read_lines(reader, |line| detector.on_stdout(line)).await {
        detector.on_error(LaunchError::process(detector.label(), e));
    }
}

pub async fn forward_stderr<R>(reader: R, detector: Arc<ReadinessDetector>)
where
    R: AsyncRead + Unpin,
{
    if let Err(e) = read_lines(reader, |line| detector.on_stderr(line)).await {
        detector.on_error(LaunchError::process(detector.label(), e));
    }
}

// Invalid UTF-8 is replaced rather than treated as a pipe error.
async fn read_lines<R, F>(reader: R, mut on_line: F) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&buf);
        on_line(text.trim_end_matches(|c: char| c == '\n' || c == '\r'));
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::Readiness;
    use crate::parse::{READY_MARKER, SUPPRESSED_BANNERS};
    use crate::sink::MemorySink;
    use futures::FutureExt;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;
    use tracing_test::traced_test;

    fn detector() -> (Arc<ReadinessDetector>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let detector = ReadinessDetector::new(
            "Renderer",
            READY_MARKER,
            CompoundLineFilter::suppress_once(SUPPRESSED_BANNERS),
            sink.clone(),
            Deferred::new(),
        );
        (Arc::new(detector), sink)
    }

    fn broken_pipe() -> LaunchError {
        LaunchError::process("Renderer", io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }

    #[tokio::test]
    async fn banners_hidden_and_marker_resolves() {
        let (d, sink) = detector();
        let waiter = d.readiness().wait();

        d.on_stdout("Project is running at http://localhost:9000");
        d.on_stdout("webpack output is served from /");
        assert!(waiter.now_or_never().is_none());
        d.on_stdout("webpack: Compiled successfully.");

        assert!(d.readiness().wait().await.is_ok());
        assert_eq!(sink.info_lines(), vec!["webpack: Compiled successfully."]);
    }

    #[tokio::test]
    async fn repeated_banner_is_shown() {
        let (d, sink) = detector();
        d.on_stdout("Project is running at http://localhost:9000");
        d.on_stdout("Project is running at http://localhost:9000");
        assert!(!d.readiness().is_settled());
        d.on_stdout("webpack: Compiled successfully.");

        assert!(d.readiness().wait().await.is_ok());
        assert_eq!(
            sink.info_lines(),
            vec!["Project is running at http://localhost:9000", "webpack: Compiled successfully."]
        );
    }

    #[tokio::test]
    async fn repeated_marker_settles_once() {
        let (d, sink) = detector();
        for _ in 0..3 {
            d.on_stdout("webpack: Compiled successfully.");
        }
        assert!(matches!(d.readiness().state(), Readiness::Ready));
        assert!(!d.readiness().resolve());
        assert_eq!(sink.info_lines().len(), 3);
    }

    #[tokio::test]
    async fn marker_inside_suppressed_banner_still_resolves() {
        let sink = Arc::new(MemorySink::new());
        let d = ReadinessDetector::new(
            "Renderer",
            READY_MARKER,
            CompoundLineFilter::suppress_once(["webpack: "]),
            sink.clone(),
            Deferred::new(),
        );
        d.on_stdout("webpack: Compiled successfully.");
        assert!(sink.is_empty());
        assert!(d.readiness().wait().await.is_ok());
    }

    #[tokio::test]
    async fn marker_matches_as_substring() {
        let (d, _) = detector();
        d.on_stdout("\u{1b}[32mwebpack: Compiled successfully.\u{1b}[39m");
        assert!(d.readiness().is_settled());
    }

    #[tokio::test]
    async fn error_before_marker_fails_launch() {
        let (d, sink) = detector();
        d.on_error(broken_pipe());
        d.on_stdout("webpack: Compiled successfully.");

        assert!(matches!(d.readiness().wait().await, Err(LaunchError::Process { .. })));
        assert!(matches!(d.readiness().state(), Readiness::Failed(_)));
        assert_eq!(sink.info_lines(), vec!["webpack: Compiled successfully."]);
        assert!(sink.error_lines().is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn error_after_ready_is_only_logged() {
        let (d, sink) = detector();
        d.on_stdout("webpack: Compiled successfully.");
        d.on_error(broken_pipe());

        assert!(d.readiness().wait().await.is_ok());
        assert_eq!(sink.error_lines(), vec!["Renderer: process error: pipe closed"]);
        assert!(logs_contain("ready"));
        assert!(logs_contain("process error"));
    }

    #[tokio::test]
    async fn stderr_lines_pass_unchanged() {
        let (d, sink) = detector();
        d.on_stderr("Project is running at http://localhost:9000");
        assert_eq!(sink.error_lines(), vec!["Project is running at http://localhost:9000"]);
        assert!(!d.readiness().is_settled());
    }

    #[tokio::test]
    async fn stop_before_ready_fails_with_stopped() {
        let (d, _) = detector();
        d.on_stopped();
        assert!(matches!(d.readiness().wait().await, Err(LaunchError::Stopped { .. })));
    }

    #[tokio::test]
    async fn forward_splits_lines() {
        let (d, sink) = detector();
        let input: &[u8] = b"Project is running at x\r\nhello\nwebpack: Compiled successfully.\nno newline";
        forward_stdout(input, d.clone()).await;
        assert_eq!(
            sink.info_lines(),
            vec!["hello", "webpack: Compiled successfully.", "no newline"]
        );
        assert!(d.readiness().wait().await.is_ok());
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
        }
    }

    #[tokio::test]
    async fn pipe_read_error_is_a_process_error() {
        let (d, _) = detector();
        forward_stderr(FailingReader, d.clone()).await;
        assert!(matches!(d.readiness().wait().await, Err(LaunchError::Process { .. })));
    }

    #[tokio::test]
    #[traced_test]
    async fn drain_warns_when_output_stays_open() {
        let (d, _) = detector();
        // writer half stays alive, so the pump never sees end of stream
        let (_writer, reader) = tokio::io::duplex(64);
        let pumps = OutputPumps {
            label: d.label().to_string(),
            handles: vec![tokio::spawn(forward_stdout(reader, d.clone()))],
        };

        pumps.drain(Duration::from_millis(50)).await;
        assert!(logs_contain("output still open"));
        assert!(!d.readiness().is_settled());
    }

    #[tokio::test]
    #[traced_test]
    async fn drain_after_end_of_stream_is_quiet() {
        let (d, _) = detector();
        let input: &[u8] = b"webpack: Compiled successfully.\n";
        let pumps = OutputPumps {
            label: d.label().to_string(),
            handles: vec![tokio::spawn(forward_stdout(input, d.clone()))],
        };

        pumps.drain(Duration::from_secs(5)).await;
        assert!(d.readiness().is_settled());
        assert!(!logs_contain("output still open"));
    }
}
