//! **Reply output**: where greetings and replies leave the session.
//!
//! Delivery is fire-and-forget from the session's point of view: an output
//! that cannot deliver logs the problem and returns.

use async_trait::async_trait;
use std::io::Write;
use tokio::sync::mpsc;
use tracing::warn;

/// Delivers speech (and optionally a text transcript) to the user.
#[async_trait]
pub trait ReplyOutput: Send + Sync {
    /// Speak `text` to the user.
    async fn say(&self, text: &str);

    /// Publish `text` on the text channel (chat transcript). Default: nothing.
    async fn send_text(&self, _text: &str) {}
}

/// What an output emitted, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Spoken(String),
    Text(String),
}

/// Forwards every line into an unbounded channel (hosting layers, tests).
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    tx: mpsc::UnboundedSender<OutputEvent>,
}

impl ChannelOutput {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutputEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: OutputEvent) {
        if self.tx.send(event).is_err() {
            warn!("reply output channel closed; dropping line");
        }
    }
}

#[async_trait]
impl ReplyOutput for ChannelOutput {
    async fn say(&self, text: &str) {
        self.emit(OutputEvent::Spoken(text.to_string()));
    }

    async fn send_text(&self, text: &str) {
        self.emit(OutputEvent::Text(text.to_string()));
    }
}

/// Writes spoken lines to stdout. Stand-in for a TTS transport in the worker.
#[derive(Debug, Default)]
pub struct ConsoleOutput;

#[async_trait]
impl ReplyOutput for ConsoleOutput {
    async fn say(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", text).and_then(|_| out.flush()) {
            warn!(error = %e, "failed to write reply to stdout");
        }
    }
}
