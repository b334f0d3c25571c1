//! Session language state and the switch transition.
//!
//! A switch is: reconfigure the recognizer, then commit the new language, then
//! greet. If the recognizer refuses the tag nothing else happens, so the
//! session language always matches the last configuration the recognizer
//! accepted.

use crate::intent::ClassificationResult;
use crate::language::{LanguageCode, LanguageTable};
use crate::recognizer::SpeechRecognizer;
use crate::voice_output::ReplyOutput;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Mutable per-session state. Owned by exactly one conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    active_language: LanguageCode,
    turn_count: u64,
}

impl SessionState {
    pub fn new(active_language: LanguageCode) -> Self {
        Self {
            active_language,
            turn_count: 0,
        }
    }

    pub fn active_language(&self) -> LanguageCode {
        self.active_language
    }

    /// Number of utterances forwarded to reply generation.
    pub fn turn_count(&self) -> u64 {
        self.turn_count
    }

    pub(crate) fn record_forwarded_turn(&mut self) {
        self.turn_count += 1;
    }
}

/// Result of [`SessionLanguageState::maybe_switch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The classification named no language.
    NoIntent,
    /// The named language is already active; nothing was reconfigured.
    AlreadyActive(LanguageCode),
    Switched { from: LanguageCode, to: LanguageCode },
    /// The switch was aborted; the session stays on its current language.
    Rejected { target: LanguageCode, reason: String },
}

impl SwitchOutcome {
    pub fn switched(&self) -> bool {
        matches!(self, SwitchOutcome::Switched { .. })
    }
}

/// Owns the language-switch transition for one session.
pub struct SessionLanguageState {
    languages: Arc<LanguageTable>,
    recognizer: Arc<dyn SpeechRecognizer>,
    output: Arc<dyn ReplyOutput>,
}

impl SessionLanguageState {
    pub fn new(
        languages: Arc<LanguageTable>,
        recognizer: Arc<dyn SpeechRecognizer>,
        output: Arc<dyn ReplyOutput>,
    ) -> Self {
        Self {
            languages,
            recognizer,
            output,
        }
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.languages
    }

    /// Switch `state` to the classified language when it differs from the active one.
    ///
    /// Takes `&mut SessionState`, so two switches can never run at once for
    /// the same session.
    pub async fn maybe_switch(
        &self,
        classification: &ClassificationResult,
        state: &mut SessionState,
    ) -> SwitchOutcome {
        let Some(target) = classification.matched_code else {
            return SwitchOutcome::NoIntent;
        };

        let from = state.active_language;
        if target == from {
            return SwitchOutcome::AlreadyActive(target);
        }

        let Some(profile) = self.languages.get(target) else {
            warn!(language = %target, "no profile configured; ignoring switch");
            return SwitchOutcome::Rejected {
                target,
                reason: "no language profile configured".to_string(),
            };
        };

        if let Err(e) = self.recognizer.update_language(&profile.recognizer_tag).await {
            warn!(
                target: "lingo::voice",
                language = %target,
                tag = %profile.recognizer_tag,
                error = %e,
                "recognizer refused language switch; staying on {}",
                from
            );
            return SwitchOutcome::Rejected {
                target,
                reason: e.to_string(),
            };
        }

        state.active_language = target;
        info!(
            target: "lingo::voice",
            from = %from,
            to = %target,
            source = ?classification.source,
            "listening language switched"
        );
        self.output.say(&profile.greeting).await;

        SwitchOutcome::Switched { from, to: target }
    }
}
