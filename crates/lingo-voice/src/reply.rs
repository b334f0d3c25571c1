//! Reply generation for ordinary conversational turns.

use crate::language::LanguageProfile;
use crate::llm::{CompletionRequest, LanguageModel};
use crate::voice_output::ReplyOutput;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub const DEFAULT_REPLY_MAX_TOKENS: u32 = 160;
const FALLBACK_REPLY: &str = "Sorry, I didn't catch that. Could you say it again?";

/// Receives every utterance that is conversation rather than a language command.
#[async_trait]
pub trait ReplyPipeline: Send + Sync {
    async fn respond(&self, utterance: &str, language: &LanguageProfile);
}

/// Persona-prompted model reply, spoken and mirrored to the text channel.
pub struct LlmReplyPipeline {
    model: Arc<dyn LanguageModel>,
    output: Arc<dyn ReplyOutput>,
    persona: String,
    max_output_tokens: u32,
    temperature: Option<f32>,
}

impl LlmReplyPipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        output: Arc<dyn ReplyOutput>,
        persona: impl Into<String>,
    ) -> Self {
        Self {
            model,
            output,
            persona: persona.into(),
            max_output_tokens: DEFAULT_REPLY_MAX_TOKENS,
            temperature: None,
        }
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn request(&self, utterance: &str, language: &LanguageProfile) -> CompletionRequest {
        let system = format!(
            "{}\nThe user is currently speaking {}. Reply in {}.",
            self.persona.trim(),
            language.display_name,
            language.display_name
        );
        let request = CompletionRequest::new(utterance, self.max_output_tokens).with_system(system);
        match self.temperature {
            Some(t) => request.with_temperature(t),
            None => request,
        }
    }
}

#[async_trait]
impl ReplyPipeline for LlmReplyPipeline {
    async fn respond(&self, utterance: &str, language: &LanguageProfile) {
        let request = self.request(utterance, language);
        let reply = match self.model.complete(&request).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                warn!("reply model returned an empty completion");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                warn!(error = %e, "reply generation failed");
                FALLBACK_REPLY.to_string()
            }
        };

        self.output.say(&reply).await;
        self.output.send_text(&reply).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{VoiceError, VoiceResult};
    use crate::language::LanguageCode;
    use crate::voice_output::{ChannelOutput, OutputEvent};
    use std::sync::Mutex;

    struct CapturingModel {
        reply: Option<&'static str>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LanguageModel for CapturingModel {
        async fn complete(&self, request: &CompletionRequest) -> VoiceResult<String> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply
                .map(str::to_string)
                .ok_or_else(|| VoiceError::ModelTransport("down".to_string()))
        }
    }

    fn spanish() -> LanguageProfile {
        LanguageProfile::new(LanguageCode::Es, "Spanish", "¡Escuchando en español!", "es")
    }

    #[tokio::test]
    async fn reply_is_spoken_and_mirrored() {
        let model = Arc::new(CapturingModel {
            reply: Some(" Bebe agua y descansa. "),
            seen: Mutex::new(Vec::new()),
        });
        let (output, mut rx) = ChannelOutput::new();
        let pipeline = LlmReplyPipeline::new(model.clone(), Arc::new(output), "You are Lingo.")
            .with_max_output_tokens(80);

        pipeline.respond("tengo fiebre", &spanish()).await;

        assert_eq!(rx.try_recv().unwrap(), OutputEvent::Spoken("Bebe agua y descansa.".to_string()));
        assert_eq!(rx.try_recv().unwrap(), OutputEvent::Text("Bebe agua y descansa.".to_string()));

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].prompt, "tengo fiebre");
        assert_eq!(seen[0].max_output_tokens, 80);
        assert!(seen[0].system.as_deref().unwrap().contains("Reply in Spanish"));
    }

    #[tokio::test]
    async fn model_failure_speaks_fallback() {
        let model = Arc::new(CapturingModel {
            reply: None,
            seen: Mutex::new(Vec::new()),
        });
        let (output, mut rx) = ChannelOutput::new();
        let pipeline = LlmReplyPipeline::new(model, Arc::new(output), "You are Lingo.");

        pipeline.respond("hello", &spanish()).await;

        assert_eq!(rx.try_recv().unwrap(), OutputEvent::Spoken(FALLBACK_REPLY.to_string()));
    }
}
