use anyhow::Context;
use devserver_supervisor::launcher::Launcher;
use devserver_supervisor::logger::init_tracing;
use devserver_supervisor::parse::{parser, LauncherConfig};
use devserver_supervisor::shell::run_shell;
use devserver_supervisor::sink::ConsoleSink;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg: LauncherConfig = match std::env::args().nth(1) {
        Some(path) => parser(&path)?,
        None => LauncherConfig::default(),
    };
    let _guard = init_tracing(&cfg.log)?;

    let launcher = Launcher::new(cfg.clone(), Arc::new(ConsoleSink::new(cfg.timestamps)));
    let launch = launcher
        .launch(&cfg.project_dir)
        .await
        .with_context(|| format!("{}: could not start dev server", cfg.label))?;

    tokio::select! {
        ready = launch.ready() => {
            ready.with_context(|| format!("{}: dev server did not become ready", cfg.label))?;
        }
        _ = wait_for_shutdown() => {
            info!(program = %cfg.label, "shutdown requested before ready");
            launch.stop().await;
            return Ok(());
        }
    }
    println!("{} ready", cfg.label);

    if cfg.shell {
        let history = cfg.log.dir.join("history.txt");
        let launch = &launch;
        run_shell(
            &history,
            move || async move {
                let job = launch.status().await;
                println!(
                    "{}: pid {:?}, restarts {}, retries left {}, last exit {}, {}",
                    launch.label(),
                    job.pid,
                    job.restarts,
                    job.retries_left,
                    job.last_exit.as_deref().unwrap_or("-"),
                    if job.stopped { "stopped" } else { "running" },
                );
            },
            move || async move {
                launch.request_stop();
                println!("{}: stopping", launch.label());
            },
        )
        .await?;
    } else {
        tokio::select! {
            _ = wait_for_shutdown() => {}
            _ = launch.exited() => {
                let job = launch.status().await;
                info!(program = %cfg.label, last_exit = ?job.last_exit, "supervision ended");
            }
        }
    }

    launch.stop().await;
    info!(program = %cfg.label, "supervisor exited");
    Ok(())
}


#[cfg(unix)]
async fn wait_for_shutdown() {
    use futures::StreamExt;
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook_tokio::Signals;

    match Signals::new([SIGINT, SIGTERM]) {
        Ok(mut signals) => {
            if let Some(sig) = signals.next().await {
                info!(signal = sig, "shutdown signal received");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to register signal handlers");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
