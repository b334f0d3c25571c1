//! Test doubles for the session collaborators.
#![allow(dead_code)]

use async_trait::async_trait;
use lingo_voice::{
    ChannelOutput, CompletionRequest, ConversationSession, ConversationTurnController,
    IntentClassifier, KeywordLanguageMatcher, LanguageCode, LanguageModel, LanguageProfile,
    LanguageTable, OutputEvent, ReplyPipeline, SessionHandle, SessionLanguageState,
    SpeechRecognizer, VoiceError, VoiceResult,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// One scripted model reaction.
pub enum Answer {
    Text(&'static str),
    Fail,
    Hang,
}

/// Model that plays back a script, then answers "none".
pub struct ScriptedModel {
    answers: Mutex<VecDeque<Answer>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(answers: Vec<Answer>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, _request: &CompletionRequest) -> VoiceResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.answers.lock().unwrap().pop_front();
        match next {
            Some(Answer::Text(s)) => Ok(s.to_string()),
            Some(Answer::Fail) => Err(VoiceError::ModelTransport("connection refused".to_string())),
            Some(Answer::Hang) => std::future::pending().await,
            None => Ok("none".to_string()),
        }
    }
}

#[derive(Default)]
pub struct RecordingRecognizer {
    pub tags: Mutex<Vec<String>>,
    pub refuse: bool,
}

impl RecordingRecognizer {
    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse: true,
            ..Default::default()
        })
    }

    pub fn tags(&self) -> Vec<String> {
        self.tags.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechRecognizer for RecordingRecognizer {
    async fn update_language(&self, recognizer_tag: &str) -> VoiceResult<()> {
        if self.refuse {
            return Err(VoiceError::RecognizerRejected {
                tag: recognizer_tag.to_string(),
                reason: "stream not accepting reconfiguration".to_string(),
            });
        }
        self.tags.lock().unwrap().push(recognizer_tag.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingReplies {
    pub forwarded: Mutex<Vec<(String, LanguageCode)>>,
}

impl RecordingReplies {
    pub fn forwarded(&self) -> Vec<(String, LanguageCode)> {
        self.forwarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyPipeline for RecordingReplies {
    async fn respond(&self, utterance: &str, language: &LanguageProfile) {
        self.forwarded
            .lock()
            .unwrap()
            .push((utterance.to_string(), language.code));
    }
}

pub struct Harness {
    pub controller: ConversationTurnController,
    pub model: Arc<ScriptedModel>,
    pub recognizer: Arc<RecordingRecognizer>,
    pub replies: Arc<RecordingReplies>,
    pub output_rx: mpsc::UnboundedReceiver<OutputEvent>,
}

impl Harness {
    pub fn new(model: Arc<ScriptedModel>, recognizer: Arc<RecordingRecognizer>) -> Self {
        Self::with_timeout(model, recognizer, Duration::from_millis(500))
    }

    pub fn with_timeout(
        model: Arc<ScriptedModel>,
        recognizer: Arc<RecordingRecognizer>,
        timeout: Duration,
    ) -> Self {
        let languages = Arc::new(LanguageTable::default());
        let (output, output_rx) = ChannelOutput::new();
        let output = Arc::new(output);
        let replies = Arc::new(RecordingReplies::default());

        let classifier = IntentClassifier::new(
            KeywordLanguageMatcher::default(),
            model.clone(),
            Arc::clone(&languages),
        )
        .with_timeout(timeout);
        let switcher = SessionLanguageState::new(languages, recognizer.clone(), output);
        let controller = ConversationTurnController::new(classifier, switcher, replies.clone());

        Self {
            controller,
            model,
            recognizer,
            replies,
            output_rx,
        }
    }

    pub fn spoken(&mut self) -> Vec<String> {
        drain_spoken(&mut self.output_rx)
    }

    /// Hand the controller to a session (silent welcome) and keep the doubles.
    pub fn into_session(self, initial: LanguageCode) -> (ConversationSession, SessionHandle, Doubles) {
        let (welcome_output, _) = ChannelOutput::new();
        let (session, handle) =
            ConversationSession::new(self.controller, initial, Arc::new(welcome_output), "")
                .unwrap();
        let doubles = Doubles {
            model: self.model,
            recognizer: self.recognizer,
            replies: self.replies,
            output_rx: self.output_rx,
        };
        (session, handle, doubles)
    }
}

/// The doubles behind a controller that now belongs to a session.
pub struct Doubles {
    pub model: Arc<ScriptedModel>,
    pub recognizer: Arc<RecordingRecognizer>,
    pub replies: Arc<RecordingReplies>,
    pub output_rx: mpsc::UnboundedReceiver<OutputEvent>,
}

impl Doubles {
    pub fn spoken(&mut self) -> Vec<String> {
        drain_spoken(&mut self.output_rx)
    }
}

fn drain_spoken(rx: &mut mpsc::UnboundedReceiver<OutputEvent>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let OutputEvent::Spoken(s) = event {
            lines.push(s);
        }
    }
    lines
}
