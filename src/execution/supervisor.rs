//! Process supervision: start, drain, race against the deadline, reduce.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::process::Process;
use super::run_config::{ErrorSource, RunConfig};
use super::state::RunState;
use crate::capture::{CaptureBuffer, Tee};
use crate::error::DeputyError;
use crate::Result;

/// How long drains may keep reading after a timed-out process was killed.
///
/// Descendants of the killed process can hold its pipes open indefinitely.
pub const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// How the completion/deadline race ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    /// The process exited; `None` when it was ended by a signal.
    Exited(Option<i32>),
    /// The deadline passed first.
    TimedOut,
}

/// Drain task for one stream plus a handle on what it captured.
struct Drain {
    stream: &'static str,
    task: JoinHandle<Option<Vec<u8>>>,
    captured: Option<CaptureBuffer>,
}

impl Drain {
    fn spawn<R>(tee: Tee, stream: &'static str, reader: R) -> Self
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let captured = tee.captured();
        let task = tokio::spawn(tee.drain(reader));
        Self {
            stream,
            task,
            captured,
        }
    }

    /// Wait for the drain to reach end of stream.
    async fn join(self) -> Result<Option<Vec<u8>>> {
        let stream = self.stream;
        self.task.await.map_err(|e| DeputyError::Drain {
            stream,
            message: e.to_string(),
        })
    }

    /// Wait until `deadline`, then give up on the stream and keep whatever
    /// was captured so far.
    async fn join_until(mut self, deadline: Instant) -> Result<Option<Vec<u8>>> {
        let joined = tokio::time::timeout_at(deadline, &mut self.task).await;
        match joined {
            Ok(joined) => joined.map_err(|e| DeputyError::Drain {
                stream: self.stream,
                message: e.to_string(),
            }),
            Err(_) => {
                warn!(stream = self.stream, "stream still open after kill, abandoning drain");
                Ok(self.abort().await)
            }
        }
    }

    /// Stop the drain and return the bytes captured up to that point.
    async fn abort(self) -> Option<Vec<u8>> {
        self.task.abort();
        // Once the aborted task is joined nothing writes to the buffer.
        let _ = self.task.await;
        self.captured.map(|buffer| buffer.take())
    }
}

/// Run `process` under `config`.
///
/// Both output streams are drained on their own tasks, which are joined
/// before the result is built. After a timeout the drains get
/// [`DRAIN_GRACE`] to finish; streams still held open by surviving
/// descendants are abandoned with their output captured so far. Returns
/// `Ok(())` only when the process exits with status 0 before the deadline.
pub async fn run(config: &RunConfig, process: Process) -> Result<()> {
    let mut state = RunState::Created;
    let program = process.program();
    let (mut command, stdout_sink, stderr_sink) = process.into_parts();

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let stdout_tee = Tee::new("stdout")
        .capture(config.errors == ErrorSource::FromStdout)
        .lines(config.stdout_log.clone())
        .sink(stdout_sink);
    let stderr_tee = Tee::new("stderr")
        .capture(config.errors == ErrorSource::FromStderr)
        .lines(config.stderr_log.clone())
        .sink(stderr_sink);

    let mut child = command.spawn().map_err(|source| DeputyError::Spawn {
        program: program.clone(),
        source,
    })?;
    state.transition_to(RunState::Running);
    debug!(program = %program, pid = ?child.id(), timeout = ?config.timeout, "process started");

    let stdout = child
        .stdout
        .take()
        .ok_or(DeputyError::MissingPipe("stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or(DeputyError::MissingPipe("stderr"))?;
    let stdout_drain = Drain::spawn(stdout_tee, "stdout", stdout);
    let stderr_drain = Drain::spawn(stderr_tee, "stderr", stderr);

    let outcome = match supervise(&mut child, config.timeout, &program).await {
        Ok(outcome) => outcome,
        Err(e) => {
            stdout_drain.abort().await;
            stderr_drain.abort().await;
            return Err(e);
        }
    };

    let (stdout_buf, stderr_buf) = match outcome {
        RunOutcome::Exited(_) => {
            state.transition_to(RunState::Completed);
            let stdout_buf = stdout_drain.join().await;
            let stderr_buf = stderr_drain.join().await;
            (stdout_buf?, stderr_buf?)
        }
        RunOutcome::TimedOut => {
            state.transition_to(RunState::TimedOut);
            let deadline = Instant::now() + DRAIN_GRACE;
            let stdout_buf = stdout_drain.join_until(deadline).await;
            let stderr_buf = stderr_drain.join_until(deadline).await;
            (stdout_buf?, stderr_buf?)
        }
    };

    state.transition_to(RunState::Reduced);
    reduce(config, outcome, stdout_buf, stderr_buf)
}

/// Wait for the process, killing and reaping it if the deadline passes.
async fn supervise(child: &mut Child, timeout: Duration, program: &str) -> Result<RunOutcome> {
    let outcome = wait_or_timeout(child, timeout).await?;
    match outcome {
        RunOutcome::Exited(code) => {
            debug!(program = %program, exit_code = ?code, "process exited");
        }
        RunOutcome::TimedOut => {
            debug!(program = %program, timeout = ?timeout, "deadline passed, killing process");
            // The process may have exited just after the timer fired.
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "kill failed, process already gone");
            }
            let status = child.wait().await?;
            trace!(?status, "killed process reaped");
        }
    }
    Ok(outcome)
}

/// Wait for exit, racing a timer when `timeout` is non-zero.
async fn wait_or_timeout(child: &mut Child, timeout: Duration) -> Result<RunOutcome> {
    if timeout.is_zero() {
        let status = child.wait().await?;
        return Ok(RunOutcome::Exited(status.code()));
    }

    tokio::select! {
        status = child.wait() => Ok(RunOutcome::Exited(status?.code())),
        _ = tokio::time::sleep(timeout) => Ok(RunOutcome::TimedOut),
    }
}

/// Turn the raw outcome and capture buffers into the caller's result.
fn reduce(
    config: &RunConfig,
    outcome: RunOutcome,
    stdout: Option<Vec<u8>>,
    stderr: Option<Vec<u8>>,
) -> Result<()> {
    let captured = || {
        let bytes = match config.errors {
            ErrorSource::None => None,
            ErrorSource::FromStdout => stdout,
            ErrorSource::FromStderr => stderr,
        }?;
        Some(String::from_utf8_lossy(&bytes).trim_end().to_string())
    };

    match outcome {
        RunOutcome::Exited(Some(0)) => Ok(()),
        RunOutcome::Exited(code) => Err(DeputyError::ExitFailure {
            code,
            output: captured(),
        }),
        RunOutcome::TimedOut => Err(DeputyError::Timeout {
            timeout: config.timeout,
            output: captured(),
        }),
    }
}
