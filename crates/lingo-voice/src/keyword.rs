//! Keyword language matcher: the zero-cost first pass of intent classification.
//!
//! Rules are checked in configuration order and the first rule with any
//! trigger inside the utterance wins, so the order of the table is the
//! tie-break when an utterance names two languages.

use crate::intent::ClassificationResult;
use crate::language::LanguageCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Trigger phrases that select one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub code: LanguageCode,
    pub triggers: Vec<String>,
}

impl KeywordRule {
    pub fn new<I, S>(code: LanguageCode, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            code,
            triggers: triggers.into_iter().map(Into::into).collect(),
        }
    }

    /// Built-in trigger table. Order matters (see module docs).
    pub fn defaults() -> Vec<KeywordRule> {
        vec![
            KeywordRule::new(LanguageCode::En, ["english", "inglés"]),
            KeywordRule::new(LanguageCode::Es, ["spanish", "español", "espanol"]),
            KeywordRule::new(LanguageCode::Fr, ["french", "français", "francais"]),
            KeywordRule::new(LanguageCode::De, ["german", "deutsch"]),
            KeywordRule::new(LanguageCode::It, ["italian", "italiano"]),
            KeywordRule::new(LanguageCode::Hi, ["hindi", "हिंदी"]),
        ]
    }
}

/// Case-insensitive substring matcher over an ordered rule table.
#[derive(Debug, Clone)]
pub struct KeywordLanguageMatcher {
    rules: Vec<(LanguageCode, Vec<String>)>,
}

impl KeywordLanguageMatcher {
    pub fn new(rules: &[KeywordRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| {
                let triggers = rule
                    .triggers
                    .iter()
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect();
                (rule.code, triggers)
            })
            .collect();
        Self { rules }
    }

    /// Classify `text` using the trigger table alone.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let haystack = text.to_lowercase();

        for (code, triggers) in &self.rules {
            if let Some(trigger) = triggers.iter().find(|t| haystack.contains(t.as_str())) {
                debug!(language = %code, trigger = %trigger, "keyword trigger matched");
                return ClassificationResult::keyword(*code);
            }
        }

        ClassificationResult::none()
    }
}

impl Default for KeywordLanguageMatcher {
    fn default() -> Self {
        Self::new(&KeywordRule::defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::ClassificationSource;

    #[test]
    fn matches_case_insensitive_substring() {
        let matcher = KeywordLanguageMatcher::default();
        let result = matcher.classify("Can you speak SPANISH please");
        assert_eq!(result.matched_code, Some(LanguageCode::Es));
        assert_eq!(result.source, ClassificationSource::Keyword);
    }

    #[test]
    fn no_trigger_yields_none() {
        let matcher = KeywordLanguageMatcher::default();
        let result = matcher.classify("I have had a headache since yesterday");
        assert_eq!(result, ClassificationResult::none());
    }

    #[test]
    fn earlier_rule_wins_when_two_languages_match() {
        let matcher = KeywordLanguageMatcher::default();
        // French is named first in the sentence, but Spanish comes first in the table.
        let result = matcher.classify("not french, switch to spanish");
        assert_eq!(result.matched_code, Some(LanguageCode::Es));

        let reordered = KeywordLanguageMatcher::new(&[
            KeywordRule::new(LanguageCode::Fr, ["french"]),
            KeywordRule::new(LanguageCode::Es, ["spanish"]),
        ]);
        let result = reordered.classify("not french, switch to spanish");
        assert_eq!(result.matched_code, Some(LanguageCode::Fr));
    }

    #[test]
    fn blank_triggers_never_match() {
        let matcher = KeywordLanguageMatcher::new(&[KeywordRule::new(LanguageCode::De, ["", "  "])]);
        assert_eq!(matcher.classify("anything at all").matched_code, None);
    }

    #[test]
    fn non_ascii_triggers_match() {
        let matcher = KeywordLanguageMatcher::default();
        assert_eq!(
            matcher.classify("मुझसे हिंदी में बात करो").matched_code,
            Some(LanguageCode::Hi)
        );
        assert_eq!(
            matcher.classify("Habla ESPAÑOL").matched_code,
            Some(LanguageCode::Es)
        );
    }
}
