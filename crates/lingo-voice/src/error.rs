//! Error types for the Lingo voice session runtime

use thiserror::Error;

/// Result type alias for voice session operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur while orchestrating a voice session
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported language code: {0}")]
    UnsupportedLanguage(String),

    #[error("Language model transport error: {0}")]
    ModelTransport(String),

    #[error("Language model returned {status}: {body}")]
    ModelStatus { status: u16, body: String },

    #[error("Recognizer rejected tag {tag}: {reason}")]
    RecognizerRejected { tag: String, reason: String },
}

impl From<config::ConfigError> for VoiceError {
    fn from(err: config::ConfigError) -> Self {
        VoiceError::Config(err.to_string())
    }
}

impl From<reqwest::Error> for VoiceError {
    fn from(err: reqwest::Error) -> Self {
        VoiceError::ModelTransport(err.to_string())
    }
}
