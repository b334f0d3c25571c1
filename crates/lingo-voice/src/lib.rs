//! # Lingo Voice - Language-Switching Session Orchestration
//!
//! This crate decides, turn by turn, whether a finalized utterance asks the
//! assistant to listen in another language or is ordinary conversation, and
//! applies the answer: reconfigure the recognizer and greet, or forward the
//! utterance to reply generation. Speech transport lives outside the crate
//! and is reached through narrow collaborator traits.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Conversation Session                         │
//! │  utterance ─→ ┌──────────────────┐                                │
//! │               │ Turn Controller  │                                │
//! │               └────────┬─────────┘                                │
//! │                        ↓                                          │
//! │  ┌─────────────────────────────────────┐                          │
//! │  │ Intent Classifier                   │                          │
//! │  │  keywords ─(no match)→ LanguageModel│                          │
//! │  └────────┬──────────────────┬─────────┘                          │
//! │           ↓ language         ↓ none                               │
//! │  ┌──────────────────┐  ┌──────────────────┐                       │
//! │  │ Session Language │  │  Reply Pipeline  │                       │
//! │  │ recognizer+greet │  │  LLM → output    │                       │
//! │  └──────────────────┘  └──────────────────┘                       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod intent;
pub mod keyword;
pub mod language;
pub mod llm;
pub mod recognizer;
pub mod reply;
pub mod session;
pub mod turn;
pub mod voice_output;

pub use config::{AssistantConfig, ModelConfig};
pub use conversation::{ConversationSession, SessionHandle};
pub use error::{VoiceError, VoiceResult};
pub use intent::{ClassificationResult, ClassificationSource, IntentClassifier};
pub use keyword::{KeywordLanguageMatcher, KeywordRule};
pub use language::{LanguageCode, LanguageProfile, LanguageTable};
pub use llm::{ChatCompletionModel, CompletionRequest, LanguageModel, LlmMode};
pub use recognizer::{SpeechRecognizer, TaggedRecognizer};
pub use reply::{LlmReplyPipeline, ReplyPipeline};
pub use session::{SessionLanguageState, SessionState, SwitchOutcome};
pub use turn::{ConversationTurnController, TurnAction};
pub use voice_output::{ChannelOutput, ConsoleOutput, OutputEvent, ReplyOutput};
