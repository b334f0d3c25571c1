//! Worker supervisor: keeps the voice worker process alive.
//!
//! ```text
//! Stopped ─start→ Starting ─spawned→ Running ─exit (any code)→ Backoff
//!                    ↑                                            │
//!                    └──────────── fixed delay ───────────────────┘
//! ```
//!
//! There is no retry limit and no growth in the delay. Only the shutdown
//! signal leaves the loop.

use crate::error::{DaemonError, DaemonResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Stopped,
    Starting,
    Running,
    Backoff,
}

/// One supervised worker process. A restart produces a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisedProcessRecord {
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub last_exit_code: Option<i32>,
}

impl SupervisedProcessRecord {
    fn started(pid: Option<u32>) -> Self {
        Self {
            pid,
            started_at: Utc::now(),
            last_exit_code: None,
        }
    }

    fn exited(self, code: Option<i32>) -> Self {
        Self {
            last_exit_code: code,
            ..self
        }
    }
}

/// What the supervisor publishes after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorSnapshot {
    pub state: SupervisorState,
    pub record: Option<SupervisedProcessRecord>,
    pub restarts: u64,
}

impl Default for SupervisorSnapshot {
    fn default() -> Self {
        Self {
            state: SupervisorState::Stopped,
            record: None,
            restarts: 0,
        }
    }
}

/// A running child process.
#[async_trait]
pub trait ChildProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Wait for exit. `None` when the process ended without an exit code.
    async fn wait(&mut self) -> Option<i32>;

    async fn kill(&mut self);
}

/// Starts child processes.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn spawn(&self, command: &[String]) -> DaemonResult<Box<dyn ChildProcess>>;
}

#[async_trait]
impl<T: ProcessLauncher + ?Sized> ProcessLauncher for std::sync::Arc<T> {
    async fn spawn(&self, command: &[String]) -> DaemonResult<Box<dyn ChildProcess>> {
        (**self).spawn(command).await
    }
}

/// Launches real processes with `tokio::process`, inheriting env and stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLauncher;

struct WorkerChild(tokio::process::Child);

#[async_trait]
impl ChildProcess for WorkerChild {
    fn id(&self) -> Option<u32> {
        self.0.id()
    }

    async fn wait(&mut self) -> Option<i32> {
        match self.0.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(target: "lingo::daemon", error = %e, "failed to wait on worker");
                None
            }
        }
    }

    async fn kill(&mut self) {
        if let Err(e) = self.0.kill().await {
            warn!(target: "lingo::daemon", error = %e, "failed to kill worker");
        }
    }
}

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn spawn(&self, command: &[String]) -> DaemonResult<Box<dyn ChildProcess>> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| DaemonError::Config("empty worker command".to_string()))?;

        let child = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DaemonError::Spawn {
                command: command.join(" "),
                source,
            })?;

        Ok(Box::new(WorkerChild(child)))
    }
}

pub struct WorkerSupervisor<L> {
    launcher: L,
    command: Vec<String>,
    restart_delay: Duration,
    snapshot_tx: watch::Sender<SupervisorSnapshot>,
}

impl<L: ProcessLauncher> WorkerSupervisor<L> {
    pub fn new(launcher: L, command: Vec<String>, restart_delay: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(SupervisorSnapshot::default());
        Self {
            launcher,
            command,
            restart_delay,
            snapshot_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SupervisorSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SupervisorSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Supervise until `shutdown` turns true. A live worker is killed on shutdown.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let mut record: Option<SupervisedProcessRecord> = None;
        let mut restarts: u64 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.publish(SupervisorState::Starting, record.clone(), restarts);
            info!(
                target: "lingo::daemon",
                command = %self.command.join(" "),
                restarts,
                "starting voice worker"
            );

            match self.launcher.spawn(&self.command).await {
                Ok(mut child) => {
                    let current = SupervisedProcessRecord::started(child.id());
                    record = Some(current.clone());
                    self.publish(SupervisorState::Running, record.clone(), restarts);
                    info!(target: "lingo::daemon", pid = ?current.pid, "voice worker running");

                    let exit = tokio::select! {
                        biased;
                        _ = wait_shutdown(shutdown.clone()) => None,
                        code = child.wait() => Some(code),
                    };

                    let Some(code) = exit else {
                        info!(target: "lingo::daemon", pid = ?current.pid, "stopping voice worker");
                        child.kill().await;
                        break;
                    };

                    let finished = current.exited(code);
                    warn!(
                        target: "lingo::daemon",
                        pid = ?finished.pid,
                        exit_code = ?finished.last_exit_code,
                        restart_in = ?self.restart_delay,
                        "voice worker exited; restarting"
                    );
                    record = Some(finished);
                }
                Err(e) => {
                    error!(
                        target: "lingo::daemon",
                        error = %e,
                        restart_in = ?self.restart_delay,
                        "voice worker failed to start; retrying"
                    );
                }
            }

            self.publish(SupervisorState::Backoff, record.clone(), restarts);
            tokio::select! {
                biased;
                _ = wait_shutdown(shutdown.clone()) => break,
                _ = tokio::time::sleep(self.restart_delay) => {}
            }
            restarts += 1;
        }

        self.publish(SupervisorState::Stopped, record, restarts);
        info!(target: "lingo::daemon", restarts, "supervisor stopped");
    }

    fn publish(&self, state: SupervisorState, record: Option<SupervisedProcessRecord>, restarts: u64) {
        self.snapshot_tx.send_replace(SupervisorSnapshot {
            state,
            record,
            restarts,
        });
    }
}

/// Resolves once shutdown is requested. A dropped sender never requests it.
async fn wait_shutdown(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
