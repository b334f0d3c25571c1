//! Session configuration: language tables, persona and model settings.
//!
//! Precedence: environment (`LINGO_*`, `__` for nesting) > TOML file at
//! `LINGO_CONFIG` (default `config/lingo.toml`) > built-in defaults.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | LINGO_DEFAULT_LANGUAGE | en | Listening language at session start. |
//! | LINGO_MODEL__MODE | mock | `mock` or `live`. |
//! | LINGO_MODEL__API_URL | Groq chat completions | OpenAI-compatible endpoint. |
//! | LINGO_MODEL__MODEL | llama3-8b-8192 | Model name. |
//! | LINGO_MODEL__INTENT_TIMEOUT_MS | 2500 | Bound on the intent query. |
//! | LINGO_LLM_API_KEY / GROQ_API_KEY / OPENROUTER_API_KEY | (none) | Bearer key, first one set wins. |

use crate::error::{VoiceError, VoiceResult};
use crate::intent::{DEFAULT_INTENT_MAX_TOKENS, DEFAULT_INTENT_TIMEOUT};
use crate::keyword::KeywordRule;
use crate::language::{LanguageCode, LanguageProfile, LanguageTable};
use crate::llm::LlmMode;
use crate::reply::DEFAULT_REPLY_MAX_TOKENS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/lingo";
const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "llama3-8b-8192";

fn default_language() -> LanguageCode {
    LanguageCode::En
}

fn default_welcome() -> String {
    "Hi! I'm Lingo. Tell me what's on your mind, or ask me to switch languages.".to_string()
}

fn default_persona() -> String {
    "You are Lingo, a friendly voice assistant. Understand many languages, keep answers \
     short and conversational, and never use markdown since everything you say is spoken aloud."
        .to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> Vec<String> {
    vec![
        "LINGO_LLM_API_KEY".to_string(),
        "GROQ_API_KEY".to_string(),
        "OPENROUTER_API_KEY".to_string(),
    ]
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_reply_max_tokens() -> u32 {
    DEFAULT_REPLY_MAX_TOKENS
}

fn default_intent_timeout_ms() -> u64 {
    DEFAULT_INTENT_TIMEOUT.as_millis() as u64
}

fn default_intent_max_tokens() -> u32 {
    DEFAULT_INTENT_MAX_TOKENS
}

/// Language model settings shared by the intent query and reply generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub mode: LlmMode,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Inline key. Prefer the environment.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variables consulted, in order, when `api_key` is unset.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_reply_max_tokens")]
    pub reply_max_tokens: u32,
    #[serde(default)]
    pub reply_temperature: Option<f32>,
    #[serde(default = "default_intent_timeout_ms")]
    pub intent_timeout_ms: u64,
    #[serde(default = "default_intent_max_tokens")]
    pub intent_max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            mode: LlmMode::default(),
            api_url: default_api_url(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
            reply_max_tokens: default_reply_max_tokens(),
            reply_temperature: None,
            intent_timeout_ms: default_intent_timeout_ms(),
            intent_max_tokens: default_intent_max_tokens(),
        }
    }
}

impl ModelConfig {
    /// Inline key if set, else the first non-empty variable from `api_key_env`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.api_key_env.iter().find_map(|name| {
                    std::env::var(name)
                        .ok()
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                })
            })
    }

    pub fn intent_timeout(&self) -> Duration {
        Duration::from_millis(self.intent_timeout_ms.max(1))
    }
}

/// Everything a session needs at start. Immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_language")]
    pub default_language: LanguageCode,
    /// Spoken when a session starts.
    #[serde(default = "default_welcome")]
    pub welcome: String,
    /// System instructions for reply generation.
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default = "LanguageProfile::defaults")]
    pub languages: Vec<LanguageProfile>,
    /// Ordered trigger table; earlier rules win ties.
    #[serde(default = "KeywordRule::defaults")]
    pub keywords: Vec<KeywordRule>,
    #[serde(default)]
    pub model: ModelConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            welcome: default_welcome(),
            persona: default_persona(),
            languages: LanguageProfile::defaults(),
            keywords: KeywordRule::defaults(),
            model: ModelConfig::default(),
        }
    }
}

impl AssistantConfig {
    /// Load from `LINGO_CONFIG` (or `config/lingo`) and the environment.
    pub fn load() -> VoiceResult<Self> {
        let path = std::env::var("LINGO_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::build(config::File::with_name(&path).required(false))
    }

    /// Load from an explicit file (must exist) and the environment.
    pub fn load_from_path(path: &Path) -> VoiceResult<Self> {
        Self::build(config::File::from(path).required(true))
    }

    fn build<S>(file: S) -> VoiceResult<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let built = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("LINGO")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        let config: AssistantConfig = built.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-table checks that serde cannot express.
    pub fn validate(&self) -> VoiceResult<()> {
        let table = self.language_table()?;
        if !table.contains(self.default_language) {
            return Err(VoiceError::Config(format!(
                "default language '{}' has no profile",
                self.default_language
            )));
        }
        if let Some(rule) = self.keywords.iter().find(|r| !table.contains(r.code)) {
            return Err(VoiceError::Config(format!(
                "keyword rule for '{}' has no profile",
                rule.code
            )));
        }
        Ok(())
    }

    pub fn language_table(&self) -> VoiceResult<LanguageTable> {
        LanguageTable::new(self.languages.clone())
    }
}
