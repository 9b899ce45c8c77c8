use crate::command::{CommandSpec, Platform};
use crate::deferred::Deferred;
use crate::detector::ReadinessDetector;
use crate::error::LaunchError;
use crate::filter::CompoundLineFilter;
use crate::parse::LauncherConfig;
use crate::runtime::{ProcessSpawner, ProcessSupervisor, RestartSettings, RuntimeJob, SupervisorHandle, TokioSpawner};
use crate::sink::LogSink;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

pub struct Launcher {
    config: LauncherConfig,
    sink: Arc<dyn LogSink>,
    spawner: Arc<dyn ProcessSpawner>,
    platform: Platform,
}

impl Launcher {
    pub fn new(config: LauncherConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            sink,
            spawner: Arc::new(TokioSpawner),
            platform: Platform::current(),
        }
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn ProcessSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }




    /*
        @@@
        @launch();
        . Builds a fresh one-time filter set for this launch; restarts within it reuse the same set.
        . Spawns the dev server; a spawn failure is returned at once and nothing reaches the sink.
        . Hands the child to the supervisor, whose detector settles the returned launch's readiness.
    */
    pub async fn launch(&self, project_root: &Path) -> Result<Launch, LaunchError> {
        let label = self.config.label.clone();
        let filter = CompoundLineFilter::suppress_once(self.config.suppress_once.iter().cloned());
        let readiness = Deferred::new();

        let spec = CommandSpec::dev_server(project_root, &self.config, self.platform);
        debug!(program = %label, command = %spec.display(), "Start dev server");

        let child = match self.spawner.spawn(&spec).await {
            Ok(child) => child,
            Err(e) => {
                let err = LaunchError::spawn(spec.program.display().to_string(), e);
                error!(program = %label, error = %err, "spawn failed");
                return Err(err);
            }
        };

        let detector = Arc::new(ReadinessDetector::new(
            label.clone(),
            self.config.ready_marker.clone(),
            filter,
            Arc::clone(&self.sink),
            readiness.clone(),
        ));
        let supervisor = ProcessSupervisor::start(
            child,
            label.clone(),
            detector,
            spec,
            RestartSettings::from(&self.config),
            Arc::clone(&self.spawner),
        );

        Ok(Launch {
            label,
            readiness,
            supervisor,
        })
    }

    /// [`launch`](Self::launch), then wait until the first successful compile.
    pub async fn launch_and_wait(&self, project_root: &Path) -> Result<Launch, LaunchError> {
        let launch = self.launch(project_root).await?;
        launch.ready().await?;
        Ok(launch)
    }
}


/// A running launch. Dropping it stops the supervised process.
pub struct Launch {
    label: String,
    readiness: Deferred,
    supervisor: SupervisorHandle,
}

impl Launch {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn readiness(&self) -> &Deferred {
        &self.readiness
    }

    /// Settles once: ready, or the first failure before that.
    pub fn ready(&self) -> impl Future<Output = Result<(), LaunchError>> + Send + 'static {
        self.readiness.wait()
    }

    pub fn supervisor(&self) -> &SupervisorHandle {
        &self.supervisor
    }

    pub async fn status(&self) -> RuntimeJob {
        self.supervisor.status().await
    }

    pub fn request_stop(&self) {
        self.supervisor.request_stop();
    }

    pub async fn stop(self) {
        self.supervisor.stop().await;
    }

    pub async fn finished(self) {
        self.supervisor.finished().await;
    }

    pub async fn exited(&self) {
        self.supervisor.exited().await;
    }
}


/// Launches the dev server for `project_root` and waits until it is ready.
pub async fn start_dev_server(
    project_root: &Path,
    config: LauncherConfig,
    sink: Arc<dyn LogSink>,
) -> Result<Launch, LaunchError> {
    Launcher::new(config, sink).launch_and_wait(project_root).await
}
