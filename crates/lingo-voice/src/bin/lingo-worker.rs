//! Lingo voice worker.
//!
//! Reads finalized utterances (one per line) from stdin, runs them through a
//! conversation session and writes spoken output to stdout. Logs go to
//! stderr. The session stays open after the transcript feed ends and only
//! closes on Ctrl-C or SIGTERM.

use lingo_voice::{
    AssistantConfig, ChatCompletionModel, ConsoleOutput, ConversationSession, TaggedRecognizer,
    VoiceError, VoiceResult,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[lingo-worker] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "voice worker failed");
        std::process::exit(1);
    }
}

async fn run() -> VoiceResult<()> {
    let config = AssistantConfig::load()?;
    let table = config.language_table()?;
    let initial_tag = table
        .get(config.default_language)
        .map(|p| p.recognizer_tag.clone())
        .ok_or_else(|| VoiceError::Config(format!("no profile for {}", config.default_language)))?;

    let model = Arc::new(ChatCompletionModel::from_config(&config.model)?);
    let recognizer = Arc::new(TaggedRecognizer::new(
        initial_tag,
        table.profiles().iter().map(|p| p.recognizer_tag.clone()),
    ));

    tracing::info!(
        mode = ?model.mode(),
        language = %config.default_language,
        languages = table.profiles().len(),
        "voice worker starting"
    );

    let (mut session, handle) =
        ConversationSession::from_config(&config, model, recognizer, Arc::new(ConsoleOutput))?;

    let (utterance_tx, utterance_rx) = mpsc::channel::<String>(32);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if utterance_tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::info!("transcript feed closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "transcript feed read failed");
                    break;
                }
            }
        }
    });

    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.close();
    });

    let state = session.run_until_closed(utterance_rx).await;
    tracing::info!(turns = state.turn_count(), "voice worker exiting");
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
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
        _ = ctrl_c => tracing::info!("CTRL-C received; closing session"),
        _ = terminate => tracing::info!("SIGTERM received; closing session"),
    }
}
