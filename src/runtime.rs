use crate::command::CommandSpec;
use crate::control::stop_child;
use crate::detector::{OutputPumps, ReadinessDetector};
use crate::error::LaunchError;
use crate::parse::{LauncherConfig, OneOrMany, RestartPolicy};
use async_trait::async_trait;
use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};

// How long an exited child's pipes may take to drain before its exit is reported.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);


// Shared view of the supervised job
// Updated on every spawn, exit and stop
pub type SupervisorState = Arc<RwLock<RuntimeJob>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeJob {
    pub pid: Option<u32>,
    pub restarts: usize,
    pub retries_left: usize,
    pub last_exit: Option<String>,
    pub stopped: bool,
}


#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    async fn spawn(&self, spec: &CommandSpec) -> io::Result<Child>;
}

/// Spawns the real command.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

#[async_trait]
impl ProcessSpawner for TokioSpawner {
    async fn spawn(&self, spec: &CommandSpec) -> io::Result<Child> {
        spec.command().spawn()
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartSettings {
    pub policy: RestartPolicy,
    pub exitcodes: OneOrMany<i32>,
    pub startretries: usize,
    pub restart_delay: Duration,
    pub stopsignal: String,
    pub stoptime: Duration,
}

impl From<&LauncherConfig> for RestartSettings {
    fn from(cfg: &LauncherConfig) -> Self {
        Self {
            policy: cfg.autorestart,
            exitcodes: cfg.exitcodes.clone(),
            startretries: cfg.startretries,
            restart_delay: Duration::from_millis(cfg.restart_delay_ms),
            stopsignal: cfg.stopsignal.clone(),
            stoptime: Duration::from_secs(cfg.stoptime),
        }
    }
}


/*
    @@@
    @should_restart();
    . Always restarts, Never does not.
    . Unexpected restarts when the exit code is not one of the expected codes; a child killed by a signal has no code and counts as unexpected.
*/
pub fn should_restart(code: Option<i32>, policy: RestartPolicy, expected: &OneOrMany<i32>) -> bool {
    match policy {
        RestartPolicy::Always => true,
        RestartPolicy::Never => false,
        RestartPolicy::Unexpected => match code {
            Some(code) => !expected.contains(&code),
            None => true,
        },
    }
}


pub struct SupervisorHandle {
    stop_tx: watch::Sender<bool>,
    state: SupervisorState,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    pub async fn status(&self) -> RuntimeJob {
        self.state.read().await.clone()
    }

    pub fn state(&self) -> SupervisorState {
        Arc::clone(&self.state)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Asks the supervisor to stop its child without waiting for it.
    pub fn request_stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub async fn stop(self) {
        self.request_stop();
        let _ = self.task.await;
    }

    /// Waits until supervision ends on its own (retries exhausted, policy said no, or stopped).
    pub async fn finished(self) {
        let _ = self.task.await;
    }

    /// Like [`finished`](Self::finished), but keeps the handle usable.
    /// The supervisor owns the only stop receiver; it is dropped when the loop returns.
    pub async fn exited(&self) {
        self.stop_tx.closed().await;
    }
}


pub struct ProcessSupervisor {
    label: String,
    spec: CommandSpec,
    settings: RestartSettings,
    spawner: Arc<dyn ProcessSpawner>,
    notifier: Arc<ReadinessDetector>,
    state: SupervisorState,
    stop_rx: watch::Receiver<bool>,
}

impl ProcessSupervisor {
    /// Takes ownership of an already spawned `child` and supervises it on a new task.
    pub fn start(
        mut child: Child,
        label: impl Into<String>,
        notifier: Arc<ReadinessDetector>,
        spec: CommandSpec,
        settings: RestartSettings,
        spawner: Arc<dyn ProcessSpawner>,
    ) -> SupervisorHandle {
        let label = label.into();
        let pumps = notifier.attach(&mut child);
        let state: SupervisorState = Arc::new(RwLock::new(RuntimeJob {
            pid: child.id(),
            retries_left: settings.startretries,
            ..RuntimeJob::default()
        }));
        info!(program = %label, pid = ?child.id(), "Spawned new instance");

        let (stop_tx, stop_rx) = watch::channel(false);
        let supervisor = ProcessSupervisor {
            label,
            spec,
            settings,
            spawner,
            notifier,
            state: Arc::clone(&state),
            stop_rx,
        };
        let task = tokio::spawn(supervisor.run(child, pumps));

        SupervisorHandle { stop_tx, state, task }
    }




    /*
        @@@
        @run();
        . Waits for the current child to exit, or for a stop request.
        . On exit, lets the child's output drain, then restarts it or reports the exit through the notifier.
        . On stop, stops the child gracefully and fails a launch that is still pending.
    */
    async fn run(mut self, mut child: Child, mut pumps: OutputPumps) {
        loop {
            let exit = tokio::select! {
                status = child.wait() => status,
                _ = self.stop_rx.changed() => {
                    self.shutdown(&mut child).await;
                    return;
                }
            };

            let status = match exit {
                Ok(status) => status,
                Err(e) => {
                    self.mark_stopped().await;
                    self.notifier.on_error(LaunchError::process(&self.label, e));
                    return;
                }
            };
            pumps.drain(DRAIN_TIMEOUT).await;

            match self.handle_child_exit(status).await {
                Some((next, next_pumps)) => {
                    child = next;
                    pumps = next_pumps;
                }
                None => return,
            }
        }
    }


    /*
        @@@
        @handle_child_exit();
        . Records the exit, checks the restart policy and the retries left.
        . Respawns after restart_delay and re-attaches the new child's output to the same detector.
        . Otherwise hands the exit status to the notifier, which fails the launch if it was not ready yet.
    */
    async fn handle_child_exit(&mut self, status: ExitStatus) -> Option<(Child, OutputPumps)> {
        let restart = should_restart(status.code(), self.settings.policy, &self.settings.exitcodes);
        {
            let mut job = self.state.write().await;
            job.pid = None;
            job.last_exit = Some(status.to_string());

            if !restart || job.retries_left == 0 {
                info!(program = %self.label, "Not restarting (policy: {:?}, retries left: {})",
                      self.settings.policy, job.retries_left);
                job.stopped = true;
                drop(job);
                self.notifier.on_exit(status);
                return None;
            }

            job.retries_left -= 1;
            job.restarts += 1;
            info!(program = %self.label, exit_code = ?status.code(),
                  "Restarting child; {} retries left", job.retries_left);
        }

        tokio::select! {
            _ = sleep(self.settings.restart_delay) => {}
            _ = self.stop_rx.changed() => {
                self.mark_stopped().await;
                self.notifier.on_stopped();
                return None;
            }
        }

        match self.spawner.spawn(&self.spec).await {
            Ok(mut child) => {
                let pumps = self.notifier.attach(&mut child);
                let pid = child.id();
                self.state.write().await.pid = pid;
                info!(program = %self.label, pid = ?pid, "Spawned new instance");
                Some((child, pumps))
            }
            Err(e) => {
                self.mark_stopped().await;
                self.notifier
                    .on_error(LaunchError::spawn(self.spec.program.display().to_string(), e));
                None
            }
        }
    }

    async fn shutdown(&mut self, child: &mut Child) {
        match stop_child(&self.label, child, &self.settings.stopsignal, self.settings.stoptime).await {
            Ok(status) => self.state.write().await.last_exit = Some(status.to_string()),
            Err(e) => error!(program = %self.label, error = %e, "failed to stop child"),
        }
        self.mark_stopped().await;
        self.notifier.on_stopped();
    }

    async fn mark_stopped(&self) {
        let mut job = self.state.write().await;
        job.pid = None;
        job.stopped = true;
    }
}

