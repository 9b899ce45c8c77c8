#![allow(dead_code)]

use async_trait::async_trait;
use devserver_supervisor::command::CommandSpec;
use devserver_supervisor::parse::{LauncherConfig, RestartPolicy};
use devserver_supervisor::runtime::ProcessSpawner;
use std::io;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::{Child, Command};

pub const BANNER: &str = "Project is running at http://localhost:9000";
pub const SERVED_FROM: &str = "webpack output is served from /";
pub const MARKER: &str = "webpack: Compiled successfully.";

/// Runs `scripts[n]` through `sh -c` on the n-th spawn (the last one repeats),
/// failing every spawn from `fail_from` on.
pub struct ScriptSpawner {
    scripts: Vec<String>,
    fail_from: Option<usize>,
    calls: AtomicUsize,
    last_spec: Mutex<Option<CommandSpec>>,
}

impl ScriptSpawner {
    pub fn new<S: Into<String>>(scripts: impl IntoIterator<Item = S>) -> Self {
        Self {
            scripts: scripts.into_iter().map(Into::into).collect(),
            fail_from: None,
            calls: AtomicUsize::new(0),
            last_spec: Mutex::new(None),
        }
    }

    pub fn failing_from(mut self, n: usize) -> Self {
        self.fail_from = Some(n);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The command the launcher asked for on the latest spawn.
    pub fn last_spec(&self) -> Option<CommandSpec> {
        self.last_spec.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessSpawner for ScriptSpawner {
    async fn spawn(&self, spec: &CommandSpec) -> io::Result<Child> {
        *self.last_spec.lock().unwrap() = Some(spec.clone());
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_from.map_or(false, |from| n >= from) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "webpack-dev-server not found"));
        }
        let script = &self.scripts[n.min(self.scripts.len() - 1)];
        Command::new("sh")
            .args(["-c", script])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }
}

pub fn test_config(policy: RestartPolicy, startretries: usize) -> LauncherConfig {
    LauncherConfig {
        autorestart: policy,
        startretries,
        restart_delay_ms: 10,
        stoptime: 2,
        ..LauncherConfig::default()
    }
}

pub async fn wait_until<F: FnMut() -> bool>(mut cond: F) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}

pub fn lines(text: &[&str]) -> String {
    text.iter().map(|l| format!("echo '{}'; ", l)).collect()
}
