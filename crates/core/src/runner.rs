//! Subprocess execution with combined output capture and an optional
//! deadline.

use crate::error::{ScanError, ScanResult};
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const CHUNK_SIZE: usize = 8 * 1024;

enum Outcome {
    Exited(io::Result<ExitStatus>),
    Deadline,
    Cancelled,
}

/// Run `program` with `args` and return its interleaved stdout/stderr.
///
/// A zero `timeout` means the process may run for as long as it likes.
/// On timeout or cancellation the child and everything it started are
/// killed, and the output captured so far travels inside the returned
/// error, as it does for non-zero exits.
pub async fn run_command(
    program: &str,
    args: &[String],
    cancel: &CancellationToken,
    timeout: Duration,
) -> ScanResult<Vec<u8>> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // the scanner leads its own process group so its helpers die with it
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command
        .spawn()
        .map_err(|source| ScanError::LaunchFailed {
            program: program.to_string(),
            source,
        })?;

    debug!(program, ?args, pid = ?child.id(), ?timeout, "Spawned subprocess");

    let mut output = Vec::new();
    let outcome = tokio::select! {
        status = collect(&mut child, &mut output) => Outcome::Exited(status),
        _ = deadline(timeout) => Outcome::Deadline,
        _ = cancel.cancelled() => Outcome::Cancelled,
    };

    match outcome {
        Outcome::Exited(Ok(status)) if status.success() => {
            debug!(program, bytes = output.len(), "Subprocess finished");
            Ok(output)
        }
        Outcome::Exited(Ok(status)) => {
            debug!(program, %status, bytes = output.len(), "Subprocess exited with failure");
            Err(ScanError::ToolFailed {
                program: program.to_string(),
                status,
                output,
            })
        }
        Outcome::Exited(Err(source)) => {
            terminate(&mut child).await;
            Err(ScanError::Io {
                program: program.to_string(),
                source,
            })
        }
        Outcome::Deadline => {
            warn!(program, ?timeout, "Subprocess exceeded its deadline, killing it");
            terminate(&mut child).await;
            Err(ScanError::Timeout {
                program: program.to_string(),
                timeout,
                output,
            })
        }
        Outcome::Cancelled => {
            warn!(program, "Subprocess cancelled, killing it");
            terminate(&mut child).await;
            Err(ScanError::Cancelled {
                program: program.to_string(),
                output,
            })
        }
    }
}

async fn deadline(timeout: Duration) {
    if timeout.is_zero() {
        std::future::pending::<()>().await
    } else {
        tokio::time::sleep(timeout).await
    }
}

async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!("Failed to kill process group {}: {}", pid, e);
        }
    }

    // kill() also reaps, so no zombie is left behind
    if let Err(e) = child.kill().await {
        debug!("Failed to kill subprocess: {}", e);
    }
}

/// Drain both pipes into `output` in arrival order, then reap the child.
async fn collect(child: &mut Child, output: &mut Vec<u8>) -> io::Result<ExitStatus> {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_chunk = [0u8; CHUNK_SIZE];
    let mut err_chunk = [0u8; CHUNK_SIZE];

    while stdout.is_some() || stderr.is_some() {
        let (read, from_stdout) = tokio::select! {
            n = read_chunk(&mut stdout, &mut out_chunk) => (n?, true),
            n = read_chunk(&mut stderr, &mut err_chunk) => (n?, false),
        };

        match (read, from_stdout) {
            (0, true) => stdout = None,
            (0, false) => stderr = None,
            (n, true) => output.extend_from_slice(&out_chunk[..n]),
            (n, false) => output.extend_from_slice(&err_chunk[..n]),
        }
    }

    child.wait().await
}

async fn read_chunk<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}
