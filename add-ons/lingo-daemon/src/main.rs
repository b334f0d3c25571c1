//! Lingo daemon
//!
//! Supervises the `lingo-worker` process, restarting it after any exit, and
//! serves a health endpoint until CTRL-C or SIGTERM.

use lingo_daemon::{health, DaemonConfig, DaemonError, DaemonResult, HealthState, TokioLauncher, WorkerSupervisor};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[lingo-daemon] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match DaemonConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load daemon config");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "lingo daemon failed");
        std::process::exit(1);
    }
}

async fn run(config: DaemonConfig) -> DaemonResult<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|source| DaemonError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;

    let supervisor = Arc::new(WorkerSupervisor::new(
        TokioLauncher,
        config.worker_command.clone(),
        config.restart_delay(),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let supervisor_task = tokio::spawn({
        let supervisor = Arc::clone(&supervisor);
        async move { supervisor.run(shutdown_rx).await }
    });

    tracing::info!(
        addr = %config.bind_addr,
        worker = %config.worker_command.join(" "),
        restart_delay_secs = config.restart_delay_secs,
        "Lingo daemon started"
    );

    let app = health::router(HealthState::new(config.service_name.clone(), supervisor.subscribe()));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    shutdown_tx.send_replace(true);
    if let Err(e) = supervisor_task.await {
        tracing::warn!(error = %e, "supervisor task ended abnormally");
    }

    served.map_err(DaemonError::Io)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for CTRL-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("CTRL-C received; shutting down daemon"),
        _ = terminate => tracing::info!("SIGTERM received; shutting down daemon"),
    }
}
