use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

/// How long a signalled server gets to shut down cleanly before SIGKILL.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("start script not found at {0}; run `dayzctl configure` first")]
    MissingScript(PathBuf),
    #[error("failed to start server: {0}")]
    Spawn(String),
    #[error("signal handling failed: {0}")]
    Signal(String),
}

/// How a signalled child went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    /// Exited on its own within the grace window; carries its exit code.
    Graceful(i32),
    /// Had to be SIGKILLed after the grace window elapsed.
    Killed,
}

/// Run the server's startup script and supervise it until it exits or a
/// termination signal arrives. The returned code becomes the process exit
/// status, so the container reflects the server's own exit status. No
/// restart on crash; that is the outer orchestrator's job.
pub async fn supervise(script: &Path, work_dir: &Path) -> Result<i32, SupervisorError> {
    if tokio::fs::metadata(script).await.is_err() {
        return Err(SupervisorError::MissingScript(script.to_path_buf()));
    }

    let mut child = Command::new(script)
        .current_dir(work_dir)
        .spawn()
        .map_err(|err| SupervisorError::Spawn(err.to_string()))?;

    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|err| SupervisorError::Signal(format!("failed to install SIGINT handler: {err}")))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|err| SupervisorError::Signal(format!("failed to install SIGTERM handler: {err}")))?;

    info!("server started (pid {:?})", child.id());

    let received = tokio::select! {
        status = child.wait() => {
            let status = status
                .map_err(|err| SupervisorError::Spawn(format!("failed to wait for server: {err}")))?;
            let code = exit_code_of(status);
            info!("server exited with code {code}");
            return Ok(code);
        }
        _ = sigint.recv() => Signal::SIGINT,
        _ = sigterm.recv() => Signal::SIGTERM,
    };

    info!("received {received}, forwarding to server");
    match stop_child(&mut child, received, SHUTDOWN_GRACE).await? {
        StopKind::Graceful(code) => {
            info!("server shut down with code {code}");
            Ok(code)
        }
        StopKind::Killed => {
            warn!("server ignored {received} for {}s, killed", SHUTDOWN_GRACE.as_secs());
            Ok(128 + Signal::SIGKILL as i32)
        }
    }
}

/// Forward `sig` to the child, give it `grace` to exit, then SIGKILL.
pub async fn stop_child(
    child: &mut Child,
    sig: Signal,
    grace: Duration,
) -> Result<StopKind, SupervisorError> {
    let pid = match child.id() {
        Some(pid) => pid,
        None => {
            // Already reaped; nothing left to signal.
            let status = child
                .wait()
                .await
                .map_err(|err| SupervisorError::Signal(format!("failed to wait: {err}")))?;
            return Ok(StopKind::Graceful(exit_code_of(status)));
        }
    };

    kill(Pid::from_raw(pid as i32), sig)
        .map_err(|err| SupervisorError::Signal(format!("failed to signal pid {pid}: {err}")))?;

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => Ok(StopKind::Graceful(exit_code_of(status))),
        Ok(Err(err)) => Err(SupervisorError::Signal(format!("failed to wait: {err}"))),
        Err(_elapsed) => {
            child
                .kill()
                .await
                .map_err(|err| SupervisorError::Signal(format!("failed to kill pid {pid}: {err}")))?;
            Ok(StopKind::Killed)
        }
    }
}

/// Child exit code, or the conventional 128+N when it died to signal N.
fn exit_code_of(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}
