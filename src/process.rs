// ABOUTME: Runs external build commands through the platform shell.
// ABOUTME: Captures output, enforces timeouts, and kills the child on expiry or cancel.

use parking_lot::Mutex;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Hard bound on total build time.
pub const BUILD_TIMEOUT: Duration = Duration::from_secs(60);

/// Bound on output draining after the process has exited. A stalled drain
/// returns whatever was read so far instead of hanging the caller.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The command could not be started (not found, permission denied).
    #[error("failed to launch command: {0}")]
    Spawn(#[source] std::io::Error),

    /// The command started but its exit status could not be collected.
    #[error("failed to collect command status: {0}")]
    Wait(#[source] std::io::Error),

    /// The command ran and exited non-zero.
    #[error("command failed with exit code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    /// The command exceeded the run-time bound and was killed.
    #[error("command timed out after {0} seconds")]
    Timeout(u64),

    /// Shutdown was requested while the command was running.
    #[error("command cancelled")]
    Cancelled,
}

/// Captured output of a successfully completed command.
#[derive(Debug)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run `command` through the platform shell with [`BUILD_TIMEOUT`].
pub async fn run_command(
    command: &str,
    working_dir: &Path,
    cancel: &CancellationToken,
) -> Result<CommandOutput, ProcessError> {
    run_command_with_timeout(command, working_dir, BUILD_TIMEOUT, cancel).await
}

/// Run `command` with an explicit run-time bound.
///
/// On expiry or cancellation the child is forcibly terminated; neither case
/// is reported as an exit code.
pub async fn run_command_with_timeout(
    command: &str,
    working_dir: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<CommandOutput, ProcessError> {
    let mut cmd = shell_command(command);
    cmd.current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(ProcessError::Spawn)?;

    let stdout = child.stdout.take().expect("stdout is piped");
    let stderr = child.stderr.take().expect("stderr is piped");

    // Shared buffers so a stalled drain can still hand back partial output.
    let out_buf = Arc::new(Mutex::new(Vec::new()));
    let err_buf = Arc::new(Mutex::new(Vec::new()));
    let out_task = drain_stream(stdout, Arc::clone(&out_buf));
    let err_task = drain_stream(stderr, Arc::clone(&err_buf));

    let status = tokio::select! {
        status = child.wait() => status.map_err(ProcessError::Wait)?,
        _ = tokio::time::sleep(timeout) => {
            kill_child(&mut child).await;
            out_task.abort();
            err_task.abort();
            return Err(ProcessError::Timeout(timeout.as_secs()));
        }
        _ = cancel.cancelled() => {
            kill_child(&mut child).await;
            out_task.abort();
            err_task.abort();
            return Err(ProcessError::Cancelled);
        }
    };

    // Give the readers a bounded window to finish after exit.
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        let _ = out_task.await;
        let _ = err_task.await;
    })
    .await;
    if drained.is_err() {
        tracing::warn!("output draining stalled, returning partial output");
    }

    let stdout = String::from_utf8_lossy(&out_buf.lock()).into_owned();
    let stderr = String::from_utf8_lossy(&err_buf.lock()).into_owned();
    let exit_code = status.code().unwrap_or(-1);

    if !status.success() {
        return Err(ProcessError::Failed {
            code: exit_code,
            stderr,
        });
    }

    Ok(CommandOutput {
        exit_code,
        stdout,
        stderr,
    })
}

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

async fn kill_child(child: &mut tokio::process::Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "failed to kill child process");
    }
    let _ = child.wait().await;
}

fn drain_stream<R>(mut stream: R, buf: Arc<Mutex<Vec<u8>>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.lock().extend_from_slice(&chunk[..n]),
            }
        }
    })
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;

    fn cwd() -> std::path::PathBuf {
        std::env::temp_dir()
    }

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let cancel = CancellationToken::new();
        let output = run_command("echo hello", &cwd(), &cancel).await.unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_build_failure() {
        let cancel = CancellationToken::new();
        let err = run_command("echo oops >&2; exit 3", &cwd(), &cancel)
            .await
            .unwrap_err();
        match err {
            ProcessError::Failed { code, stderr } => {
                assert_eq!(code, 3);
                assert!(stderr.contains("oops"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_command_is_a_spawn_or_exit_failure() {
        let cancel = CancellationToken::new();
        // The shell itself spawns fine, so a missing binary surfaces as a
        // non-zero exit (127) rather than a spawn error.
        let err = run_command("definitely-not-a-real-command-xyz", &cwd(), &cancel)
            .await
            .unwrap_err();
        match err {
            ProcessError::Failed { code, .. } => assert_eq!(code, 127),
            ProcessError::Spawn(_) => {}
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn wait_failure_is_not_reported_as_a_launch_failure() {
        let err = ProcessError::Wait(std::io::Error::other("broken pipe"));
        let message = err.to_string();
        assert!(!message.contains("launch"));
        assert!(message.contains("status"));
    }

    #[tokio::test]
    async fn long_running_command_times_out() {
        let cancel = CancellationToken::new();
        let started = std::time::Instant::now();
        let err = run_command_with_timeout(
            "sleep 30",
            &cwd(),
            Duration::from_millis(200),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout(_)));
        // The child was killed rather than awaited to completion.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run_command("sleep 30", &cwd(), &cancel).await.unwrap_err();
        assert!(matches!(err, ProcessError::Cancelled));
    }
}
