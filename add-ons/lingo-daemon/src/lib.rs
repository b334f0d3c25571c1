//! Lingo daemon: keeps the voice worker running and answers health checks.
//!
//! The supervisor runs on its own task and publishes a [`SupervisorSnapshot`]
//! after each transition; the health route reads the latest one.

pub mod config;
pub mod error;
pub mod health;
pub mod supervisor;

pub use config::{DaemonConfig, DEFAULT_RESTART_DELAY_SECS};
pub use error::{DaemonError, DaemonResult};
pub use health::{router, HealthState};
pub use supervisor::{
    ChildProcess, ProcessLauncher, SupervisedProcessRecord, SupervisorSnapshot, SupervisorState,
    TokioLauncher, WorkerSupervisor,
};
