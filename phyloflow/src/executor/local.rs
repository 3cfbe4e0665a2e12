//! Executor that runs tasks as local shell processes.

use super::future::{FailureKind, TaskFuture, TaskPromise};
use super::unit::TaskUnit;
use super::{Dependencies, LoadHint, TaskExecutor};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// Runs each task as `sh -c "<worker_init>; <command>"` on the local host.
///
/// Stdout and stderr of every task go to `<log_dir>/<task_id>.stdout` and
/// `.stderr`. Concurrency is bounded only by the lane dependencies the graph
/// builder attaches.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    log_dir: Option<PathBuf>,
    worker_init: Option<String>,
    dry_run: bool,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    /// Shell snippet run before every command (module loads, env setup).
    pub fn with_worker_init(mut self, init: impl Into<String>) -> Self {
        let init = init.into();
        self.worker_init = (!init.trim().is_empty()).then_some(init);
        self
    }

    /// Log commands instead of running them; every task succeeds.
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    fn shell_line(&self, command: &str) -> String {
        match &self.worker_init {
            Some(init) => format!("{}; {}", init, command),
            None => command.to_string(),
        }
    }
}

impl TaskExecutor for LocalExecutor {
    fn submit(&self, unit: TaskUnit, dependencies: Dependencies) -> TaskFuture {
        let (promise, future) = TaskFuture::pending(&unit);
        let line = self.shell_line(&unit.command);
        let log_dir = self.log_dir.clone();
        let dry_run = self.dry_run;

        tracing::trace!(
            task = %unit.id,
            stage = %unit.stage,
            dependencies = dependencies.len(),
            "Task submitted"
        );

        tokio::spawn(async move {
            if let Err(failure) = dependencies.wait().await {
                tracing::warn!(
                    task = %unit.id,
                    stage = %unit.stage,
                    upstream = %failure,
                    "Skipping task, dependency failed"
                );
                promise.fail(failure.poison());
                return;
            }
            run_task(unit, line, log_dir.as_deref(), dry_run, promise).await;
        });

        future
    }

    fn apply_load_hint(&self, hint: &LoadHint) {
        tracing::debug!(
            items = hint.item_count,
            nodes_per_block = hint.nodes_per_block,
            workers_per_node = hint.workers_per_node,
            "Local executor ignores worker sizing"
        );
    }
}

async fn run_task(
    unit: TaskUnit,
    line: String,
    log_dir: Option<&Path>,
    dry_run: bool,
    promise: TaskPromise,
) {
    let started = Instant::now();

    if dry_run {
        tracing::info!(task = %unit.id, label = %unit.label, command = %line, "Dry run");
        promise.succeed(0, 0);
        return;
    }

    tracing::info!(task = %unit.id, label = %unit.label, "Starting task");
    tracing::debug!(task = %unit.id, command = %line, "Task command");

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(&line).stdin(Stdio::null());

    match log_dir {
        Some(dir) => {
            let (stdout, stderr) = match open_logs(dir, &unit) {
                Ok(files) => files,
                Err(e) => {
                    promise.fail(FailureKind::Spawn(format!("cannot open task logs: {}", e)));
                    return;
                }
            };
            cmd.stdout(Stdio::from(stdout)).stderr(Stdio::from(stderr));
        }
        None => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }

    let status = match cmd.status().await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(task = %unit.id, error = %e, "Failed to start task");
            promise.fail(FailureKind::Spawn(e.to_string()));
            return;
        }
    };

    let duration_ms = started.elapsed().as_millis();
    match status.code() {
        Some(0) => {
            tracing::info!(task = %unit.id, duration_ms = duration_ms as u64, "Task completed");
            promise.succeed(0, duration_ms);
        }
        Some(code) => {
            tracing::error!(task = %unit.id, label = %unit.label, code, "Task failed");
            promise.fail(FailureKind::Exited(code));
        }
        None => {
            tracing::error!(task = %unit.id, label = %unit.label, "Task killed by signal");
            promise.fail(FailureKind::Signaled);
        }
    }
}

fn open_logs(dir: &Path, unit: &TaskUnit) -> std::io::Result<(File, File)> {
    std::fs::create_dir_all(dir)?;
    let stdout = File::create(dir.join(format!("{}.stdout", unit.id)))?;
    let stderr = File::create(dir.join(format!("{}.stderr", unit.id)))?;
    Ok((stdout, stderr))
}
