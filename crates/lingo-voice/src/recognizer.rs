//! **Speech recognizer** collaborator: live language reconfiguration.
//!
//! The session never talks to an STT provider directly. It asks a
//! [`SpeechRecognizer`] to change tag; the transport that owns the audio
//! stream watches [`TaggedRecognizer::subscribe`] and applies the change to
//! its provider connection.

use crate::error::{VoiceError, VoiceResult};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::watch;
use tracing::info;

/// Reconfigures the language of a live speech recognizer.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Switch subsequent utterances to `recognizer_tag`. Idempotent.
    async fn update_language(&self, recognizer_tag: &str) -> VoiceResult<()>;
}

/// Recognizer front that validates tags and publishes the active one.
pub struct TaggedRecognizer {
    allowed: HashSet<String>,
    tag_tx: watch::Sender<String>,
}

impl TaggedRecognizer {
    /// `initial_tag` is accepted even if `allowed` does not list it.
    pub fn new<I, S>(initial_tag: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let initial_tag = initial_tag.into();
        let mut allowed: HashSet<String> = allowed.into_iter().map(Into::into).collect();
        allowed.insert(initial_tag.clone());
        let (tag_tx, _) = watch::channel(initial_tag);
        Self { allowed, tag_tx }
    }

    pub fn current_tag(&self) -> String {
        self.tag_tx.borrow().clone()
    }

    /// Observe tag changes (the transport side).
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tag_tx.subscribe()
    }
}

#[async_trait]
impl SpeechRecognizer for TaggedRecognizer {
    async fn update_language(&self, recognizer_tag: &str) -> VoiceResult<()> {
        if !self.allowed.contains(recognizer_tag) {
            return Err(VoiceError::RecognizerRejected {
                tag: recognizer_tag.to_string(),
                reason: "tag is not offered by this recognizer".to_string(),
            });
        }

        let changed = self.tag_tx.send_if_modified(|current| {
            if current == recognizer_tag {
                false
            } else {
                *current = recognizer_tag.to_string();
                true
            }
        });
        if changed {
            info!(target: "lingo::voice", tag = recognizer_tag, "recognizer language updated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publishes_tag_changes() {
        let recognizer = TaggedRecognizer::new("en-US", ["es", "fr"]);
        let mut rx = recognizer.subscribe();

        recognizer.update_language("es").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), "es");
        assert_eq!(recognizer.current_tag(), "es");

        // Same tag again is a no-op for observers.
        recognizer.update_language("es").await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn rejects_unknown_tag() {
        let recognizer = TaggedRecognizer::new("en-US", ["es"]);
        let err = recognizer.update_language("xx").await.unwrap_err();
        assert!(matches!(err, VoiceError::RecognizerRejected { .. }));
        assert_eq!(recognizer.current_tag(), "en-US");
    }
}
