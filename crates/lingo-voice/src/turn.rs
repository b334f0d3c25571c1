//! Turn controller for the conversational flow
//!
//! Every finalized utterance either switches the listening language or goes
//! to reply generation, never both and never neither. The one exception is a
//! keyword command naming the language already active, which is consumed.
//!
//! The controller borrows the session state mutably for the whole turn, so
//! turns for one session are strictly serial.

use crate::intent::{ClassificationSource, IntentClassifier};
use crate::language::{LanguageCode, LanguageProfile, LanguageTable};
use crate::reply::ReplyPipeline;
use crate::session::{SessionLanguageState, SessionState, SwitchOutcome};
use std::sync::Arc;
use tracing::{debug, warn};

/// What the controller did with one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAction {
    /// The utterance switched the listening language; it was not forwarded.
    SwitchedLanguage { from: LanguageCode, to: LanguageCode },
    /// The utterance went to reply generation and counted as a turn.
    ForwardedToReply,
    /// A keyword command named the language already active; consumed silently.
    AlreadyActive { language: LanguageCode },
    /// The recognizer refused the switch. The language is unchanged and the
    /// utterance went to reply generation like ordinary conversation.
    SwitchRejected { target: LanguageCode, reason: String },
    /// The session closed before the turn finished; nothing was applied.
    Discarded,
}

impl TurnAction {
    pub fn forwarded(&self) -> bool {
        matches!(
            self,
            TurnAction::ForwardedToReply | TurnAction::SwitchRejected { .. }
        )
    }
}

/// Routes each utterance to the language switch or to reply generation.
pub struct ConversationTurnController {
    classifier: IntentClassifier,
    switcher: SessionLanguageState,
    replies: Arc<dyn ReplyPipeline>,
}

impl ConversationTurnController {
    pub fn new(
        classifier: IntentClassifier,
        switcher: SessionLanguageState,
        replies: Arc<dyn ReplyPipeline>,
    ) -> Self {
        Self {
            classifier,
            switcher,
            replies,
        }
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn languages(&self) -> &LanguageTable {
        self.switcher.languages()
    }

    /// Process one finalized utterance against `state`.
    pub async fn on_utterance(&self, text: &str, state: &mut SessionState) -> TurnAction {
        let classification = self.classifier.classify(text, state.active_language()).await;
        let outcome = self.switcher.maybe_switch(&classification, state).await;

        match outcome {
            SwitchOutcome::Switched { from, to } => TurnAction::SwitchedLanguage { from, to },
            SwitchOutcome::Rejected { target, reason } => {
                self.forward(text, state).await;
                TurnAction::SwitchRejected { target, reason }
            }
            SwitchOutcome::AlreadyActive(language)
                if classification.source == ClassificationSource::Keyword =>
            {
                debug!(language = %language, "language already active; command consumed");
                TurnAction::AlreadyActive { language }
            }
            // A model answer naming the current language is not a switch request.
            SwitchOutcome::AlreadyActive(_) | SwitchOutcome::NoIntent => {
                self.forward(text, state).await;
                TurnAction::ForwardedToReply
            }
        }
    }

    async fn forward(&self, text: &str, state: &mut SessionState) {
        let active = state.active_language();
        match self.switcher.languages().get(active) {
            Some(profile) => self.replies.respond(text, profile).await,
            // Only reachable with a state built outside the session's table.
            None => {
                warn!(language = %active, "active language has no profile; replying without one");
                let bare = LanguageProfile::new(active, active.as_str(), "", "");
                self.replies.respond(text, &bare).await;
            }
        }
        state.record_forwarded_turn();
        debug!(turns = state.turn_count(), "utterance forwarded to reply generation");
    }
}
