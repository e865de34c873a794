//! Process pool: bounded parallel execution with outcome accounting.
//!
//! The pool is driven by a single controller (the caller of [`ProcessPool::submit`]
//! and [`ProcessPool::drain`]). Slot bookkeeping happens only inside the wait
//! loop on that controller, so no locking is needed. Child processes are not
//! killed when the pool is dropped.

use super::runner::{CommandRunner, ExecStatus, ShellRunner};
use crate::error::DatasetError;
use crate::plan::Operation;
use crate::progress::Progress;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default delay between wait-loop passes.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One in-flight command and the operation it came from.
struct RunningSlot<H> {
    operation: Operation,
    handle: H,
}

/// Aggregate outcome of everything that ran through a pool.
#[derive(Debug, Default)]
pub struct PoolResult {
    pub succeeded: usize,
    pub failed: usize,
    /// Exit status per finished operation, in completion order. Completion
    /// order is not deterministic across runs.
    pub outputs: Vec<i32>,
    /// One `OperationFailed` or `SpawnFailed` entry per failed operation.
    pub failures: Vec<DatasetError>,
}

/// Runs operations with at most `capacity` of them in flight.
///
/// A failed operation never stops the pool; callers inspect the counters
/// after [`drain`](Self::drain). There is no retry and no cancellation.
pub struct ProcessPool<R: CommandRunner = ShellRunner> {
    runner: R,
    capacity: usize,
    dry_run: bool,
    poll_interval: Duration,
    progress: Progress,
    running: Vec<RunningSlot<R::Handle>>,
    succeeded: usize,
    failed: usize,
    outputs: Vec<i32>,
    failures: Vec<DatasetError>,
}

impl ProcessPool<ShellRunner> {
    /// Pool running commands through the system shell.
    pub fn new(capacity: usize) -> Self {
        Self::with_runner(ShellRunner::new(), capacity)
    }
}

impl<R: CommandRunner> ProcessPool<R> {
    /// Pool using a custom runner. A capacity of 0 is raised to 1.
    pub fn with_runner(runner: R, capacity: usize) -> Self {
        if capacity == 0 {
            warn!("Process pool capacity 0 requested, using 1");
        }
        Self {
            runner,
            capacity: capacity.max(1),
            dry_run: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            progress: Progress::none(),
            running: Vec::new(),
            succeeded: 0,
            failed: 0,
            outputs: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Describe operations instead of running them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the delay between wait-loop passes.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Report dry-run descriptions and completions to `progress`.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Number of started operations that have not been retired yet.
    pub fn in_flight(&self) -> usize {
        self.running.len()
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Exit statuses of retired operations, in completion order.
    pub fn outputs(&self) -> &[i32] {
        &self.outputs
    }

    /// Submit an operation, waiting for a free slot when the pool is full.
    ///
    /// In dry-run mode the command is only reported; nothing is spawned, no
    /// slot is used and the call never waits.
    pub async fn submit(&mut self, operation: Operation) {
        if self.dry_run {
            self.progress
                .report(&format!("Dry run: {}", operation.command));
            return;
        }

        if self.running.len() >= self.capacity {
            self.wait_for_one().await;
        }

        info!("Starting a new process: {}", operation.command);
        let handle = self.runner.start(&operation.command);
        self.running.push(RunningSlot { operation, handle });
    }

    /// Wait until every running operation has finished.
    pub async fn drain(&mut self) {
        while !self.running.is_empty() {
            self.wait_for_one().await;
        }
    }

    /// Drain and return the accumulated outcome.
    pub async fn finish(mut self) -> PoolResult {
        self.drain().await;
        PoolResult {
            succeeded: self.succeeded,
            failed: self.failed,
            outputs: self.outputs,
            failures: self.failures,
        }
    }

    /// Poll running slots until one has finished, then retire it.
    ///
    /// Exactly one slot is retired per call; other finished slots are picked
    /// up by later calls.
    async fn wait_for_one(&mut self) {
        debug!(
            "Waiting for command to finish ({} running)",
            self.running.len()
        );
        loop {
            let runner = &self.runner;
            let ready = self
                .running
                .iter_mut()
                .enumerate()
                .find_map(|(idx, slot)| match runner.poll(&mut slot.handle) {
                    ExecStatus::Running => None,
                    done => Some((idx, done)),
                });

            if let Some((idx, status)) = ready {
                self.retire(idx, status);
                return;
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn retire(&mut self, idx: usize, status: ExecStatus) {
        let slot = self.running.remove(idx);
        let command = slot.operation.command;

        match status {
            ExecStatus::Succeeded => {
                self.succeeded += 1;
                self.outputs.push(0);
                self.progress
                    .report(&format!("Process completed: {}", command));
            }
            ExecStatus::Failed(failure) => {
                self.failed += 1;
                self.outputs.push(failure.exit_code());
                let error = failure.into_error(&command);
                warn!("{}", error);
                self.progress.report(&format!(
                    "Process failed: table={}: {}",
                    slot.operation.table_name, error
                ));
                self.failures.push(error);
            }
            ExecStatus::Running => unreachable!("running slots are never retired"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ExecFailure;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Runner whose commands are scripts of the form `ok:<polls>` or
    /// `fail:<polls>:<code>`, finishing after the given number of polls.
    #[derive(Default, Clone)]
    struct ScriptedRunner {
        started: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    struct ScriptedHandle {
        polls_left: usize,
        result: ExecStatus,
    }

    impl CommandRunner for ScriptedRunner {
        type Handle = ScriptedHandle;

        fn start(&self, command: &str) -> ScriptedHandle {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let parts: Vec<&str> = command.split(':').collect();
            let polls_left = parts[1].parse().unwrap();
            let result = match parts[0] {
                "ok" => ExecStatus::Succeeded,
                "fail" => ExecStatus::Failed(ExecFailure::Exit(parts[2].parse().unwrap())),
                "nostart" => ExecStatus::Failed(ExecFailure::Spawn("not found".into())),
                other => panic!("unknown script {}", other),
            };
            ScriptedHandle { polls_left, result }
        }

        fn poll(&self, handle: &mut ScriptedHandle) -> ExecStatus {
            if handle.polls_left > 0 {
                handle.polls_left -= 1;
                return ExecStatus::Running;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            handle.result.clone()
        }
    }

    fn op(command: &str) -> Operation {
        Operation::new("t", None, "data-all.csv", command)
    }

    fn pool(runner: ScriptedRunner, capacity: usize) -> ProcessPool<ScriptedRunner> {
        ProcessPool::with_runner(runner, capacity).with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_capacity() {
        for capacity in 1..=4 {
            let runner = ScriptedRunner::default();
            let mut pool = pool(runner.clone(), capacity);

            for i in 0..10 {
                pool.submit(op(&format!("ok:{}", i % 3))).await;
                assert!(pool.in_flight() <= capacity);
            }
            pool.drain().await;

            assert_eq!(pool.in_flight(), 0);
            assert!(runner.max_in_flight.load(Ordering::SeqCst) <= capacity);
            assert_eq!(pool.succeeded(), 10);
        }
    }

    #[tokio::test]
    async fn test_counters_cover_every_submission() {
        let runner = ScriptedRunner::default();
        let mut pool = pool(runner, 2);

        pool.submit(op("ok:1")).await;
        pool.submit(op("fail:0:2")).await;
        pool.submit(op("ok:0")).await;
        pool.submit(op("nostart:0")).await;
        pool.submit(op("fail:3:1")).await;
        let result = pool.finish().await;

        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 3);
        assert_eq!(result.succeeded + result.failed, 5);
        assert_eq!(result.outputs.len(), 5);
        assert_eq!(result.outputs.iter().filter(|c| **c == 0).count(), 2);
        assert!(result.outputs.contains(&127));
        assert_eq!(result.failures.len(), 3);
        assert!(result
            .failures
            .iter()
            .any(|e| matches!(e, DatasetError::SpawnFailed { .. })));
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings() {
        let runner = ScriptedRunner::default();
        let mut pool = pool(runner.clone(), 1);

        pool.submit(op("fail:0:1")).await;
        pool.submit(op("ok:0")).await;
        pool.submit(op("ok:0")).await;
        pool.drain().await;

        assert_eq!(runner.started.load(Ordering::SeqCst), 3);
        assert_eq!(pool.failed(), 1);
        assert_eq!(pool.succeeded(), 2);
        assert_eq!(pool.outputs(), &[1, 0, 0]);
    }

    #[tokio::test]
    async fn test_dry_run_never_blocks_or_counts() {
        let runner = ScriptedRunner::default();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let mut pool = pool(runner.clone(), 1)
            .dry_run(true)
            .with_progress(Progress::new(move |m| sink.lock().unwrap().push(m.to_string())));

        for _ in 0..20 {
            // Would never finish if it were started.
            pool.submit(op("ok:1000000")).await;
        }
        let result = pool.finish().await;

        assert_eq!(runner.started.load(Ordering::SeqCst), 0);
        assert_eq!(result.succeeded, 0);
        assert_eq!(result.failed, 0);
        assert!(result.outputs.is_empty());
        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 20);
        assert!(messages[0].starts_with("Dry run: "));
    }

    #[tokio::test]
    async fn test_completion_reported_to_progress() {
        let runner = ScriptedRunner::default();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let mut pool = pool(runner, 2)
            .with_progress(Progress::new(move |m| sink.lock().unwrap().push(m.to_string())));

        pool.submit(op("ok:0")).await;
        pool.submit(op("fail:0:4")).await;
        pool.drain().await;

        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| m == "Process completed: ok:0"));
        assert!(messages
            .iter()
            .any(|m| m.starts_with("Process failed: table=t") && m.contains("exit code 4")));
    }

    #[tokio::test]
    async fn test_full_pool_retires_one_slot_per_wait() {
        let runner = ScriptedRunner::default();
        let mut pool = pool(runner, 2);

        pool.submit(op("ok:0")).await;
        pool.submit(op("ok:0")).await;
        // Both are finished, but only one is retired to make room.
        pool.submit(op("ok:5")).await;
        assert_eq!(pool.in_flight(), 2);
        assert_eq!(pool.succeeded(), 1);

        pool.drain().await;
        assert_eq!(pool.succeeded(), 3);
    }

    #[test]
    fn test_zero_capacity_becomes_one() {
        let pool = ProcessPool::with_runner(ScriptedRunner::default(), 0);
        assert_eq!(pool.capacity(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shell_pool_runs_commands() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let mut pool = ProcessPool::new(2).with_poll_interval(Duration::from_millis(10));

        pool.submit(op(&format!("echo done > {}", marker.display()))).await;
        pool.submit(op("exit 5")).await;
        pool.submit(op("true")).await;
        let result = pool.finish().await;

        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert!(result.outputs.contains(&5));
        assert_eq!(std::fs::read_to_string(marker).unwrap(), "done\n");
    }
}
