//! Supported listening languages and their per-session profiles.
//!
//! A [`LanguageTable`] is built once when a session starts and never changes
//! afterwards. Its order is the configuration order, which is also the order
//! used when rendering the intent prompt.

use crate::error::{VoiceError, VoiceResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A language the assistant can listen in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    En,
    Es,
    Fr,
    De,
    It,
    Hi,
}

impl LanguageCode {
    pub const ALL: [LanguageCode; 6] = [
        LanguageCode::En,
        LanguageCode::Es,
        LanguageCode::Fr,
        LanguageCode::De,
        LanguageCode::It,
        LanguageCode::Hi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::En => "en",
            LanguageCode::Es => "es",
            LanguageCode::Fr => "fr",
            LanguageCode::De => "de",
            LanguageCode::It => "it",
            LanguageCode::Hi => "hi",
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive parse of a two-letter code. Callers normalise first.
impl FromStr for LanguageCode {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LanguageCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| VoiceError::UnsupportedLanguage(s.to_string()))
    }
}

/// Everything the session needs to know about one listening language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub code: LanguageCode,
    pub display_name: String,
    /// Spoken once, right after the recognizer has switched to this language.
    pub greeting: String,
    /// Identifier handed to the speech recognizer (e.g. `en-US`, `es`).
    pub recognizer_tag: String,
}

impl LanguageProfile {
    pub fn new(
        code: LanguageCode,
        display_name: impl Into<String>,
        greeting: impl Into<String>,
        recognizer_tag: impl Into<String>,
    ) -> Self {
        Self {
            code,
            display_name: display_name.into(),
            greeting: greeting.into(),
            recognizer_tag: recognizer_tag.into(),
        }
    }

    /// Built-in profiles for every [`LanguageCode`].
    pub fn defaults() -> Vec<LanguageProfile> {
        vec![
            LanguageProfile::new(LanguageCode::En, "English", "Listening in English!", "en-US"),
            LanguageProfile::new(LanguageCode::Es, "Spanish", "¡Escuchando en español!", "es"),
            LanguageProfile::new(LanguageCode::Fr, "French", "J'écoute en français !", "fr"),
            LanguageProfile::new(LanguageCode::De, "German", "Ich höre jetzt auf Deutsch zu!", "de"),
            LanguageProfile::new(LanguageCode::It, "Italian", "Ti ascolto in italiano!", "it"),
            LanguageProfile::new(LanguageCode::Hi, "Hindi", "अब मैं हिंदी में सुन रही हूँ!", "hi"),
        ]
    }
}

/// Immutable, ordered mapping from [`LanguageCode`] to [`LanguageProfile`].
#[derive(Debug, Clone)]
pub struct LanguageTable {
    profiles: Vec<LanguageProfile>,
}

impl LanguageTable {
    /// Validate and freeze a set of profiles.
    pub fn new(profiles: Vec<LanguageProfile>) -> VoiceResult<Self> {
        if profiles.is_empty() {
            return Err(VoiceError::Config("at least one language profile is required".to_string()));
        }

        let mut seen = HashSet::new();
        for profile in &profiles {
            if !seen.insert(profile.code) {
                return Err(VoiceError::Config(format!(
                    "duplicate language profile for '{}'",
                    profile.code
                )));
            }
            if profile.greeting.trim().is_empty() {
                return Err(VoiceError::Config(format!(
                    "language '{}' has an empty greeting",
                    profile.code
                )));
            }
            if profile.recognizer_tag.trim().is_empty() {
                return Err(VoiceError::Config(format!(
                    "language '{}' has an empty recognizer tag",
                    profile.code
                )));
            }
        }

        Ok(Self { profiles })
    }

    pub fn get(&self, code: LanguageCode) -> Option<&LanguageProfile> {
        self.profiles.iter().find(|p| p.code == code)
    }

    pub fn contains(&self, code: LanguageCode) -> bool {
        self.get(code).is_some()
    }

    /// Supported codes in configuration order.
    pub fn codes(&self) -> impl Iterator<Item = LanguageCode> + '_ {
        self.profiles.iter().map(|p| p.code)
    }

    pub fn profiles(&self) -> &[LanguageProfile] {
        &self.profiles
    }

    /// Accept `raw` only if it is exactly one of this table's codes.
    pub fn parse_supported(&self, raw: &str) -> Option<LanguageCode> {
        raw.parse::<LanguageCode>().ok().filter(|code| self.contains(*code))
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self {
            profiles: LanguageProfile::defaults(),
        }
    }
}
