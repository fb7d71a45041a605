//! Worker invocation through `tokio::process`.
//!
//! Each call takes a permit from a fixed-size semaphore, spawns one child
//! with piped stdout/stderr, drains both pipes concurrently and reaps the
//! child before its output is classified. Each worker leads its own process
//! group, so a cancelled or overdue worker is killed together with anything
//! it started. If the whole future is dropped instead, the group guard and
//! `kill_on_drop` do the same.

use async_trait::async_trait;
use std::future::Future;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::{BrokerConfig, ConfigError, WorkerFailure, WorkerInvocation, WorkerResult};
use crate::metrics::BrokerStats;
use crate::ports::WorkerInvoker;

const READ_CHUNK: usize = 8 * 1024;
const LOG_STDERR_LIMIT: usize = 512;

/// Spawns the configured executable once per invocation
pub struct ProcessWorker {
    config: Arc<BrokerConfig>,
    permits: Arc<Semaphore>,
    stats: Arc<BrokerStats>,
}

impl ProcessWorker {
    pub fn new(config: BrokerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let permits = Arc::new(Semaphore::new(config.max_concurrent));
        Ok(Self {
            config: Arc::new(config),
            permits,
            stats: Arc::new(BrokerStats::new()),
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<BrokerStats> {
        Arc::clone(&self.stats)
    }

    /// Worker slots not currently in use
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Refuse new invocations; waiters and later calls get `PoolClosed`
    pub fn close(&self) {
        self.permits.close();
    }

    fn command(&self, arguments: &[String]) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.program_args)
            .args(arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    async fn run(&self, arguments: Vec<String>, cancel: CancellationToken) -> WorkerResult {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WorkerFailure::Cancelled),
            permit = Arc::clone(&self.permits).acquire_owned() => {
                permit.map_err(|_| WorkerFailure::PoolClosed)?
            }
        };

        let mut child = self
            .command(&arguments)
            .spawn()
            .map_err(|source| WorkerFailure::Spawn { source })?;
        let mut group = ProcessGroup::of(&child);
        debug!(pid = ?child.id(), "Spawned worker");

        let deadline = self.config.timeout;
        let limit = self.config.max_output_bytes;

        let interrupt = supervise(&cancel, deadline, collect(&mut child, limit)).await;

        match interrupt {
            Interrupt::Finished(Ok(collected)) => {
                // leader reaped; its pid may be reused from here on
                group.release();
                let mut invocation = WorkerInvocation::new(arguments);
                invocation.exit_code = collected.status.code();
                invocation.stdout = collected.stdout.bytes;
                invocation.stderr = collected.stderr.bytes;
                if collected.stdout.overflowed {
                    invocation.stdout_overflow = Some(limit);
                }
                debug!(exit_code = ?invocation.exit_code, "Worker exited");
                invocation.decode()
            }
            Interrupt::Finished(Err(source)) => {
                terminate(&mut child, &mut group).await;
                Err(WorkerFailure::Stream { source })
            }
            Interrupt::Cancelled => {
                terminate(&mut child, &mut group).await;
                Err(WorkerFailure::Cancelled)
            }
            Interrupt::TimedOut => {
                warn!(timeout_ms = deadline.as_millis() as u64, "Worker timed out, killing");
                terminate(&mut child, &mut group).await;
                Err(WorkerFailure::Timeout { after: deadline })
            }
        }
    }
}

#[async_trait]
impl WorkerInvoker for ProcessWorker {
    async fn invoke(&self, arguments: Vec<String>, cancel: CancellationToken) -> WorkerResult {
        let _in_flight = self.stats.begin();
        let result = self.run(arguments, cancel).await;
        self.stats.record_outcome(&result);

        match &result {
            Ok(_) => {}
            Err(WorkerFailure::Cancelled) => debug!("Worker invocation cancelled"),
            Err(WorkerFailure::Worker { exit_code, stderr }) => warn!(
                exit_code = ?exit_code,
                stderr = truncate_for_log(stderr, LOG_STDERR_LIMIT),
                "Worker reported failure"
            ),
            Err(failure) => warn!(kind = %failure.kind(), error = %failure, "Worker invocation failed"),
        }

        result
    }
}

/// Race the worker against cancellation and its deadline.
///
/// A worker that finished is reported as finished even if the deadline
/// expired in the same poll.
async fn supervise<F>(cancel: &CancellationToken, deadline: Duration, collect: F) -> Interrupt
where
    F: Future<Output = std::io::Result<Collected>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Interrupt::Cancelled,
        collected = collect => Interrupt::Finished(collected),
        _ = tokio::time::sleep(deadline) => Interrupt::TimedOut,
    }
}

enum Interrupt {
    Finished(std::io::Result<Collected>),
    Cancelled,
    TimedOut,
}

struct Collected {
    stdout: Drained,
    stderr: Drained,
    status: ExitStatus,
}

#[derive(Default)]
struct Drained {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Drain both pipes to EOF, then reap the child
async fn collect(child: &mut Child, limit: usize) -> std::io::Result<Collected> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (stdout, stderr) = tokio::try_join!(drain(stdout, limit), drain(stderr, limit))?;
    let status = child.wait().await?;
    Ok(Collected {
        stdout,
        stderr,
        status,
    })
}

/// Read a pipe to EOF keeping at most `limit` bytes.
///
/// Reading continues past the limit so the child never blocks on a full pipe.
async fn drain<R>(pipe: Option<R>, limit: usize) -> std::io::Result<Drained>
where
    R: AsyncRead + Unpin,
{
    let mut drained = Drained::default();
    let Some(mut pipe) = pipe else {
        return Ok(drained);
    };

    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(drained.bytes.len());
        if n > room {
            drained.overflowed = true;
        }
        drained.bytes.extend_from_slice(&chunk[..n.min(room)]);
    }
    Ok(drained)
}

/// Kill the worker's process group, then reap the worker so no zombie is
/// left behind
async fn terminate(child: &mut Child, group: &mut ProcessGroup) {
    group.kill();
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill worker");
    }
}

/// Process group led by a spawned worker.
///
/// Killed on drop unless released, so dropping an invocation mid-flight
/// takes the worker's own children down with it.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self { pgid: child.id() }
    }

    /// Forget the group without signalling it
    fn release(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        debug!(pgid, error = %e, "Failed to kill worker process group");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

fn truncate_for_log(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
