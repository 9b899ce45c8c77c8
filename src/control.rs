use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
#[cfg(unix)]
use tokio::time::timeout;
use tracing::{info, warn};
#[cfg(unix)]
use tracing::error;

#[cfg(unix)]
use nix::sys::signal::{kill, Signal};
#[cfg(unix)]
use nix::unistd::Pid;


#[cfg(unix)]
pub fn parse_signal(name: &str) -> Signal {
    match name.to_uppercase().as_str() {
        "TERM" | "SIGTERM" => Signal::SIGTERM,
        "INT"  | "SIGINT"  => Signal::SIGINT,
        "QUIT" | "SIGQUIT" => Signal::SIGQUIT,
        "HUP"  | "SIGHUP"  => Signal::SIGHUP,
        "USR1" | "SIGUSR1" => Signal::SIGUSR1,
        "USR2" | "SIGUSR2" => Signal::SIGUSR2,
        "KILL" | "SIGKILL" => Signal::SIGKILL,
        _                  => Signal::SIGTERM,
    }
}




/*
    @@@
    @stop_child();
    . Sends the configured stop signal to the child (Unix) and waits up to stoptime for it to exit.
    . Force-kills the child when it is still alive after the grace period, or right away where signals are unavailable.
    . Returns the exit status once the child has been reaped.
*/
pub async fn stop_child(
    label: &str,
    child: &mut Child,
    stopsignal: &str,
    stoptime: Duration,
) -> io::Result<ExitStatus> {
    // already gone
    if let Some(status) = child.try_wait()? {
        return Ok(status);
    }

    if let Some(status) = signal_and_wait(label, child, stopsignal, stoptime).await? {
        return Ok(status);
    }

    child.kill().await?;
    warn!(program = %label, "sent SIGKILL after timeout");
    child.wait().await
}


#[cfg(unix)]
async fn signal_and_wait(
    label: &str,
    child: &mut Child,
    stopsignal: &str,
    stoptime: Duration,
) -> io::Result<Option<ExitStatus>> {
    let Some(pid) = child.id() else {
        return Ok(None);
    };
    let sig = parse_signal(stopsignal);
    info!(program = %label, pid, signal = ?sig, "sending stop signal");
    if let Err(e) = kill(Pid::from_raw(pid as i32), sig) {
        error!(program = %label, error = %e, "failed to send {}", sig);
        return Ok(None);
    }
    match timeout(stoptime, child.wait()).await {
        Ok(status) => {
            let status = status?;
            info!(program = %label, exit_code = ?status.code(), "exited cleanly");
            Ok(Some(status))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(not(unix))]
async fn signal_and_wait(
    _label: &str,
    _child: &mut Child,
    _stopsignal: &str,
    _stoptime: Duration,
) -> io::Result<Option<ExitStatus>> {
    Ok(None)
}
