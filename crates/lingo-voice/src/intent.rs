//! Hybrid language-intent classifier.
//!
//! Keywords first, then a single constrained model query. Every failure path
//! resolves to [`ClassificationResult::none`]: a switch is never invented.

use crate::keyword::KeywordLanguageMatcher;
use crate::language::{LanguageCode, LanguageTable};
use crate::llm::{CompletionRequest, LanguageModel};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_INTENT_TIMEOUT: Duration = Duration::from_millis(2500);
pub const DEFAULT_INTENT_MAX_TOKENS: u32 = 4;

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    Keyword,
    Model,
    None,
}

/// Outcome of classifying one utterance. Produced per turn, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub matched_code: Option<LanguageCode>,
    pub source: ClassificationSource,
}

impl ClassificationResult {
    pub fn keyword(code: LanguageCode) -> Self {
        Self {
            matched_code: Some(code),
            source: ClassificationSource::Keyword,
        }
    }

    pub fn model(code: LanguageCode) -> Self {
        Self {
            matched_code: Some(code),
            source: ClassificationSource::Model,
        }
    }

    pub fn none() -> Self {
        Self {
            matched_code: None,
            source: ClassificationSource::None,
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched_code.is_some()
    }
}

/// Decides whether an utterance asks to change the listening language.
pub struct IntentClassifier {
    matcher: KeywordLanguageMatcher,
    model: Arc<dyn LanguageModel>,
    languages: Arc<LanguageTable>,
    timeout: Duration,
    max_output_tokens: u32,
}

impl IntentClassifier {
    pub fn new(
        matcher: KeywordLanguageMatcher,
        model: Arc<dyn LanguageModel>,
        languages: Arc<LanguageTable>,
    ) -> Self {
        Self {
            matcher,
            model,
            languages,
            timeout: DEFAULT_INTENT_TIMEOUT,
            max_output_tokens: DEFAULT_INTENT_MAX_TOKENS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens.max(1);
        self
    }

    pub async fn classify(&self, text: &str, current: LanguageCode) -> ClassificationResult {
        let keyword = self.matcher.classify(text);
        if keyword.is_match() {
            return keyword;
        }

        if text.trim().is_empty() {
            return ClassificationResult::none();
        }

        let request = self.intent_request(text, current);
        let raw = match tokio::time::timeout(self.timeout, self.model.complete(&request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(error = %e, "intent query failed; staying on {}", current);
                return ClassificationResult::none();
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "intent query timed out; staying on {}", current);
                return ClassificationResult::none();
            }
        };

        let result = self.parse_answer(&raw);
        debug!(raw = %raw.trim(), result = ?result.matched_code, "intent model answered");
        result
    }

    /// Accept only an exact supported code after trimming and lowercasing.
    pub fn parse_answer(&self, raw: &str) -> ClassificationResult {
        let normalised = raw.trim().to_lowercase();
        match self.languages.parse_supported(&normalised) {
            Some(code) => ClassificationResult::model(code),
            None => ClassificationResult::none(),
        }
    }

    fn intent_request(&self, text: &str, current: LanguageCode) -> CompletionRequest {
        let options = self
            .languages
            .profiles()
            .iter()
            .map(|p| format!("{} ({})", p.code, p.display_name))
            .collect::<Vec<_>>()
            .join(", ");

        let system = format!(
            "You detect whether a user is asking a voice assistant to change the language it listens in. \
             Answer with exactly one token: one of the codes {} or the word none. \
             Answer none unless the user clearly asks to switch languages.",
            options
        );
        let prompt = format!(
            "Current listening language: {}\nUtterance: \"{}\"\nAnswer:",
            current,
            text.trim()
        );

        CompletionRequest::new(prompt, self.max_output_tokens)
            .with_system(system)
            .with_temperature(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{VoiceError, VoiceResult};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedModel {
        answer: VoiceResult<&'static str>,
        calls: AtomicUsize,
    }

    impl FixedModel {
        fn answering(answer: &'static str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: Err(VoiceError::ModelTransport("connection reset".to_string())),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, _request: &CompletionRequest) -> VoiceResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Ok(s) => Ok(s.to_string()),
                Err(e) => Err(VoiceError::ModelTransport(e.to_string())),
            }
        }
    }

    fn classifier(model: Arc<FixedModel>) -> IntentClassifier {
        IntentClassifier::new(
            KeywordLanguageMatcher::default(),
            model,
            Arc::new(LanguageTable::default()),
        )
    }

    #[tokio::test]
    async fn keyword_match_skips_the_model() {
        let model = FixedModel::answering("fr");
        let result = classifier(model.clone())
            .classify("can you speak spanish", LanguageCode::En)
            .await;
        assert_eq!(result, ClassificationResult::keyword(LanguageCode::Es));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_code_is_normalised() {
        let model = FixedModel::answering("  FR \n");
        let result = classifier(model.clone())
            .classify("parlons autrement", LanguageCode::En)
            .await;
        assert_eq!(result, ClassificationResult::model(LanguageCode::Fr));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn model_extra_words_are_rejected() {
        for answer in ["fr please", "none", "f", "french", "es."] {
            let result = classifier(FixedModel::answering(answer))
                .classify("something ambiguous", LanguageCode::En)
                .await;
            assert_eq!(result, ClassificationResult::none(), "answer {:?}", answer);
        }
    }

    #[tokio::test]
    async fn model_failure_is_swallowed() {
        let result = classifier(FixedModel::failing())
            .classify("something ambiguous", LanguageCode::En)
            .await;
        assert_eq!(result.source, ClassificationSource::None);
    }

    #[tokio::test]
    async fn blank_utterance_skips_the_model() {
        let model = FixedModel::answering("de");
        let result = classifier(model.clone()).classify("   ", LanguageCode::En).await;
        assert_eq!(result, ClassificationResult::none());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn intent_request_is_constrained() {
        let c = classifier(FixedModel::answering("none")).with_max_output_tokens(3);
        let req = c.intent_request("hello there", LanguageCode::It);
        assert_eq!(req.max_output_tokens, 3);
        assert_eq!(req.temperature, Some(0.0));
        let system = req.system.unwrap();
        for code in LanguageCode::ALL {
            assert!(system.contains(code.as_str()));
        }
        assert!(system.contains("none"));
        assert!(req.prompt.contains("Current listening language: it"));
    }
}
