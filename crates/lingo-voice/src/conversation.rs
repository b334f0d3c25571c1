//! **Conversation session**: one live conversation, driven serially.
//!
//! The session owns its [`SessionState`] and takes utterances one at a time
//! from a channel. Closing the session through its [`SessionHandle`] drops
//! any turn still in flight, so a late model answer never lands on a
//! torn-down session.

use crate::config::AssistantConfig;
use crate::error::{VoiceError, VoiceResult};
use crate::intent::IntentClassifier;
use crate::keyword::KeywordLanguageMatcher;
use crate::language::LanguageCode;
use crate::llm::LanguageModel;
use crate::recognizer::SpeechRecognizer;
use crate::reply::LlmReplyPipeline;
use crate::session::{SessionLanguageState, SessionState};
use crate::turn::{ConversationTurnController, TurnAction};
use crate::voice_output::ReplyOutput;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Closes a running [`ConversationSession`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    closed_tx: Arc<watch::Sender<bool>>,
}

impl SessionHandle {
    pub fn close(&self) {
        self.closed_tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_tx.borrow()
    }
}

pub struct ConversationSession {
    controller: ConversationTurnController,
    state: SessionState,
    output: Arc<dyn ReplyOutput>,
    welcome: String,
    closed_rx: watch::Receiver<bool>,
}

impl ConversationSession {
    pub fn new(
        controller: ConversationTurnController,
        initial_language: LanguageCode,
        output: Arc<dyn ReplyOutput>,
        welcome: impl Into<String>,
    ) -> VoiceResult<(Self, SessionHandle)> {
        if !controller.languages().contains(initial_language) {
            return Err(VoiceError::Config(format!(
                "initial language '{}' has no profile",
                initial_language
            )));
        }

        let (closed_tx, closed_rx) = watch::channel(false);
        let session = Self {
            controller,
            state: SessionState::new(initial_language),
            output,
            welcome: welcome.into(),
            closed_rx,
        };
        let handle = SessionHandle {
            closed_tx: Arc::new(closed_tx),
        };
        Ok((session, handle))
    }

    /// Wire a session from configuration with the default LLM reply pipeline.
    pub fn from_config(
        config: &AssistantConfig,
        model: Arc<dyn LanguageModel>,
        recognizer: Arc<dyn SpeechRecognizer>,
        output: Arc<dyn ReplyOutput>,
    ) -> VoiceResult<(Self, SessionHandle)> {
        config.validate()?;
        let languages = Arc::new(config.language_table()?);

        let classifier = IntentClassifier::new(
            KeywordLanguageMatcher::new(&config.keywords),
            Arc::clone(&model),
            Arc::clone(&languages),
        )
        .with_timeout(config.model.intent_timeout())
        .with_max_output_tokens(config.model.intent_max_tokens);

        let switcher = SessionLanguageState::new(languages, recognizer, Arc::clone(&output));

        let mut replies = LlmReplyPipeline::new(model, Arc::clone(&output), config.persona.clone())
            .with_max_output_tokens(config.model.reply_max_tokens);
        if let Some(t) = config.model.reply_temperature {
            replies = replies.with_temperature(t);
        }

        let controller = ConversationTurnController::new(classifier, switcher, Arc::new(replies));
        Self::new(
            controller,
            config.default_language,
            output,
            config.welcome.clone(),
        )
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    /// Speak the welcome line.
    pub async fn start(&self) {
        info!(
            target: "lingo::voice",
            language = %self.state.active_language(),
            "conversation session started"
        );
        if !self.welcome.trim().is_empty() {
            self.output.say(&self.welcome).await;
        }
    }

    /// Run one turn unless the session closes first.
    pub async fn handle_utterance(&mut self, text: &str) -> TurnAction {
        if self.is_closed() {
            return TurnAction::Discarded;
        }

        let closed = wait_closed(self.closed_rx.clone());
        tokio::select! {
            biased;
            _ = closed => {
                debug!("session closed mid-turn; discarding result");
                TurnAction::Discarded
            }
            action = self.controller.on_utterance(text, &mut self.state) => action,
        }
    }

    /// Drain `utterances` until the feed ends or the session is closed.
    pub async fn run(&mut self, utterances: mpsc::Receiver<String>) -> SessionState {
        self.drive(utterances, false).await
    }

    /// Like [`run`](Self::run), but an ended feed leaves the session open.
    /// Only [`SessionHandle::close`] ends it.
    pub async fn run_until_closed(&mut self, utterances: mpsc::Receiver<String>) -> SessionState {
        self.drive(utterances, true).await
    }

    async fn drive(&mut self, mut utterances: mpsc::Receiver<String>, hold_open: bool) -> SessionState {
        self.start().await;

        loop {
            let next = tokio::select! {
                biased;
                _ = wait_closed(self.closed_rx.clone()) => None,
                next = utterances.recv() => next,
            };
            let Some(text) = next else {
                if hold_open && !self.is_closed() {
                    info!(target: "lingo::voice", "transcript feed ended; session stays open until closed");
                    wait_closed(self.closed_rx.clone()).await;
                }
                break;
            };

            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            if self.handle_utterance(text).await == TurnAction::Discarded {
                break;
            }
        }

        info!(
            target: "lingo::voice",
            turns = self.state.turn_count(),
            language = %self.state.active_language(),
            "conversation session ended"
        );
        self.state.clone()
    }
}

/// Resolves once the session is closed. A dropped handle can never close it.
async fn wait_closed(mut closed_rx: watch::Receiver<bool>) {
    if closed_rx.wait_for(|closed| *closed).await.is_err() {
        std::future::pending::<()>().await;
    }
}
