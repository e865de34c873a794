//! Starting and polling a single external command.

use crate::error::DatasetError;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Exit code reported when the command could not be started at all.
const SPAWN_FAILURE_CODE: i32 = 127;

/// Status of a started command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecStatus {
    Running,
    Succeeded,
    Failed(ExecFailure),
}

/// Why a command failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecFailure {
    /// Exited with a non-zero code.
    Exit(i32),
    /// Terminated by a signal.
    Signal(i32),
    /// Never started.
    Spawn(String),
}

impl ExecFailure {
    /// Exit status recorded in pool outputs, following shell conventions:
    /// `128 + signal` for signals and 127 for commands that never started.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecFailure::Exit(code) => *code,
            ExecFailure::Signal(signal) => 128 + signal,
            ExecFailure::Spawn(_) => SPAWN_FAILURE_CODE,
        }
    }

    /// Error recorded by the pool for this failure.
    pub fn into_error(self, command: &str) -> DatasetError {
        match self {
            ExecFailure::Spawn(reason) => DatasetError::SpawnFailed {
                command: command.to_string(),
                reason,
            },
            other => DatasetError::OperationFailed {
                command: command.to_string(),
                code: other.exit_code(),
            },
        }
    }
}

/// Starts commands and reports their status.
///
/// `start` must return immediately; failures to start are reported by the
/// next `poll` as [`ExecFailure::Spawn`] rather than raised.
pub trait CommandRunner: Send + Sync {
    type Handle: Send;

    /// Start `command` without waiting for it.
    fn start(&self, command: &str) -> Self::Handle;

    /// Current status of a started command. Never blocks.
    fn poll(&self, handle: &mut Self::Handle) -> ExecStatus;
}

/// Runs command lines with `sh -c`, inheriting environment, working
/// directory and standard streams.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
    flag: &'static str,
}

impl ShellRunner {
    pub fn new() -> Self {
        #[cfg(windows)]
        {
            Self::with_shell("cmd", "/C")
        }
        #[cfg(not(windows))]
        {
            Self::with_shell("/bin/sh", "-c")
        }
    }

    /// Use another shell executable, e.g. `bash` with `-c`.
    pub fn with_shell(shell: impl Into<PathBuf>, flag: &'static str) -> Self {
        Self {
            shell: shell.into(),
            flag,
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// A command started by [`ShellRunner`].
#[derive(Debug)]
pub enum ShellHandle {
    Started(Child),
    NotStarted(String),
}

impl CommandRunner for ShellRunner {
    type Handle = ShellHandle;

    fn start(&self, command: &str) -> ShellHandle {
        let spawned = Command::new(&self.shell)
            .arg(self.flag)
            .arg(command)
            .stdin(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => {
                debug!("Spawned pid {:?}: {}", child.id(), command);
                ShellHandle::Started(child)
            }
            Err(e) => {
                warn!("Unable to start {:?}: {}", self.shell, e);
                ShellHandle::NotStarted(e.to_string())
            }
        }
    }

    fn poll(&self, handle: &mut ShellHandle) -> ExecStatus {
        match handle {
            ShellHandle::NotStarted(reason) => {
                ExecStatus::Failed(ExecFailure::Spawn(reason.clone()))
            }
            ShellHandle::Started(child) => match child.try_wait() {
                Ok(None) => ExecStatus::Running,
                Ok(Some(status)) => status_of(status),
                Err(e) => ExecStatus::Failed(ExecFailure::Spawn(e.to_string())),
            },
        }
    }
}

fn status_of(status: ExitStatus) -> ExecStatus {
    if status.success() {
        return ExecStatus::Succeeded;
    }
    if let Some(code) = status.code() {
        return ExecStatus::Failed(ExecFailure::Exit(code));
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExecStatus::Failed(ExecFailure::Signal(signal));
        }
    }
    ExecStatus::Failed(ExecFailure::Exit(-1))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait(runner: &ShellRunner, handle: &mut ShellHandle) -> ExecStatus {
        loop {
            match runner.poll(handle) {
                ExecStatus::Running => tokio::time::sleep(Duration::from_millis(5)).await,
                done => return done,
            }
        }
    }

    #[tokio::test]
    async fn test_success() {
        let runner = ShellRunner::new();
        let mut handle = runner.start("true");
        assert_eq!(wait(&runner, &mut handle).await, ExecStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_exit_code() {
        let runner = ShellRunner::new();
        let mut handle = runner.start("exit 3");
        assert_eq!(
            wait(&runner, &mut handle).await,
            ExecStatus::Failed(ExecFailure::Exit(3))
        );
    }

    #[tokio::test]
    async fn test_start_does_not_block() {
        let runner = ShellRunner::new();
        let mut handle = runner.start("sleep 2");
        assert_eq!(runner.poll(&mut handle), ExecStatus::Running);
        if let ShellHandle::Started(child) = &mut handle {
            child.start_kill().unwrap();
        }
        assert_eq!(
            wait(&runner, &mut handle).await,
            ExecStatus::Failed(ExecFailure::Signal(9))
        );
    }

    #[tokio::test]
    async fn test_missing_shell_is_spawn_failure() {
        let runner = ShellRunner::with_shell("/nonexistent/shell", "-c");
        let mut handle = runner.start("true");
        match runner.poll(&mut handle) {
            ExecStatus::Failed(failure @ ExecFailure::Spawn(_)) => {
                assert_eq!(failure.exit_code(), 127);
                assert!(matches!(
                    failure.into_error("true"),
                    DatasetError::SpawnFailed { .. }
                ));
            }
            other => panic!("expected spawn failure, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_exit_codes() {
        assert_eq!(ExecFailure::Exit(2).exit_code(), 2);
        assert_eq!(ExecFailure::Signal(15).exit_code(), 143);
        assert!(matches!(
            ExecFailure::Exit(2).into_error("false"),
            DatasetError::OperationFailed { code: 2, .. }
        ));
    }
}
