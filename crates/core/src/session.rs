//! One voice call, from start to the post-call destination.
//!
//! [`CallSession`] owns the call lifecycle, the transcript and the transport
//! subscription, and consumes transport events and user control requests on a
//! single task. What happens once the call is over is decided by the session's
//! [`SessionPurpose`]: an interview is evaluated, a question-gathering call
//! simply returns home.

use crate::Command;
use crate::interview::format_questions;
use crate::lifecycle::{CallLifecycle, CallPhase, FinishReason};
use crate::orchestrator::{FeedbackOrchestrator, FeedbackRequest};
use crate::prompts::{PromptSet, render};
use crate::router::{Destination, route};
use crate::transcript::Transcript;
use crate::voice::{CallConfig, VoiceEvent, VoiceTransport};
use async_trait::async_trait;
use tokio::sync::mpsc;

pub const DEFAULT_USER_NAME: &str = "Candidate";
pub const NO_QUESTIONS_NOTICE: &str = "No questions available for the interview";
pub const START_FAILED_NOTICE: &str = "Failed to start the interview";
pub const TRANSPORT_ERROR_NOTICE: &str = "An error occurred during the interview";
pub const FEEDBACK_FAILED_NOTICE: &str = "Failed to save feedback";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No questions available for the interview")]
    NoQuestions,
    #[error("voice transport unavailable: {0:#}")]
    Transport(#[source] anyhow::Error),
}

/// Requests a user can make while a call is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    Stop,
}

/// The per-variant half of a session: how to place the call and what to do
/// once it has finished.
#[async_trait]
pub trait SessionPurpose: Send {
    fn call_config(&self) -> Result<CallConfig, SessionError>;

    /// Runs once, after the call reached `Finished` for any reason other than a
    /// failed start.
    async fn complete(
        &mut self,
        transcript: Transcript,
        reason: FinishReason,
        commands: &mpsc::Sender<Command>,
    ) -> Destination;
}

/// Who is being interviewed, on what, and where feedback goes.
#[derive(Debug, Clone, Default)]
pub struct InterviewContext {
    pub interview_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub feedback_id: Option<String>,
    pub questions: Vec<String>,
}

impl InterviewContext {
    fn user_name(&self) -> &str {
        self.user_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_USER_NAME)
    }
}

/// A session that asks prepared questions and then requests feedback.
pub struct ConductInterview {
    context: InterviewContext,
    orchestrator: FeedbackOrchestrator,
    prompts: PromptSet,
}

impl ConductInterview {
    pub fn new(context: InterviewContext, orchestrator: FeedbackOrchestrator, prompts: PromptSet) -> Self {
        Self {
            context,
            orchestrator,
            prompts,
        }
    }
}

#[async_trait]
impl SessionPurpose for ConductInterview {
    fn call_config(&self) -> Result<CallConfig, SessionError> {
        if self.context.questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        let username = self.context.user_name();
        let questions = format_questions(&self.context.questions);
        let values = [("username", username), ("questions", questions.as_str())];

        Ok(CallConfig {
            assistant_name: "Interviewer".to_string(),
            instructions: render(&self.prompts.interviewer, &values),
            first_message: Some(render(&self.prompts.interviewer_first_message, &values)),
            ..CallConfig::default()
        }
        .with_variable("questions", questions.as_str())
        .with_variable("username", username)
        .with_variable("userid", self.context.user_id.clone().unwrap_or_default()))
    }

    async fn complete(
        &mut self,
        transcript: Transcript,
        reason: FinishReason,
        commands: &mpsc::Sender<Command>,
    ) -> Destination {
        tracing::info!(
            "Interview finished ({:?}) with {} utterances, generating feedback",
            reason,
            transcript.len()
        );
        emit(commands, Command::Processing(true)).await;
        let request = FeedbackRequest {
            interview_id: self.context.interview_id.clone(),
            user_id: self.context.user_id.clone(),
            feedback_id: self.context.feedback_id.clone(),
            transcript,
        };
        let outcome = self.orchestrator.create_feedback(&request).await;
        emit(commands, Command::Processing(false)).await;

        if !outcome.is_saved() {
            emit(commands, Command::Notify(FEEDBACK_FAILED_NOTICE.to_string())).await;
        }
        route(&outcome)
    }
}

/// A session in which the assistant gathers what the user wants to practise.
/// The voice provider submits the interview request itself, so nothing is
/// evaluated here.
pub struct GenerateQuestions {
    user_name: Option<String>,
    user_id: Option<String>,
    prompts: PromptSet,
}

impl GenerateQuestions {
    pub fn new(user_name: Option<String>, user_id: Option<String>, prompts: PromptSet) -> Self {
        Self {
            user_name,
            user_id,
            prompts,
        }
    }
}

#[async_trait]
impl SessionPurpose for GenerateQuestions {
    fn call_config(&self) -> Result<CallConfig, SessionError> {
        let username = self
            .user_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_USER_NAME);

        Ok(CallConfig {
            assistant_name: "Interview Planner".to_string(),
            instructions: render(&self.prompts.generator, &[("username", username)]),
            ..CallConfig::default()
        }
        .with_variable("username", username)
        .with_variable("userid", self.user_id.clone().unwrap_or_default()))
    }

    async fn complete(
        &mut self,
        transcript: Transcript,
        reason: FinishReason,
        _commands: &mpsc::Sender<Command>,
    ) -> Destination {
        tracing::info!(
            "Question gathering call finished ({:?}) after {} utterances",
            reason,
            transcript.len()
        );
        Destination::Home
    }
}

async fn emit(commands: &mpsc::Sender<Command>, command: Command) {
    if let Err(e) = commands.send(command).await {
        tracing::debug!("No listener for session command {:?}", e.0);
    }
}

/// Sends control requests to a running [`CallSession`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    control_tx: mpsc::Sender<SessionControl>,
}

impl SessionHandle {
    /// Asks the session to hang up. Ignored unless the call is active.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.control_tx
            .send(SessionControl::Stop)
            .await
            .map_err(|_| anyhow::anyhow!("Session has already ended"))
    }
}

/// A single-use call session. `run` consumes it, so completion can happen at
/// most once per instance.
pub struct CallSession<P: SessionPurpose> {
    purpose: P,
    transport: Box<dyn VoiceTransport>,
    commands: mpsc::Sender<Command>,
    control_rx: mpsc::Receiver<SessionControl>,
}

impl<P: SessionPurpose> CallSession<P> {
    pub fn new(
        purpose: P,
        transport: Box<dyn VoiceTransport>,
        commands: mpsc::Sender<Command>,
    ) -> (Self, SessionHandle) {
        let (control_tx, control_rx) = mpsc::channel(8);
        let session = Self {
            purpose,
            transport,
            commands,
            control_rx,
        };
        (session, SessionHandle { control_tx })
    }

    /// Places the call, follows it until it finishes and returns where the user
    /// should go next. A `Navigate` command with the same destination is sent
    /// before returning.
    pub async fn run(self) -> Result<Destination, SessionError> {
        let CallSession {
            mut purpose,
            mut transport,
            commands,
            mut control_rx,
        } = self;

        let config = match purpose.call_config() {
            Ok(config) => config,
            Err(e) => {
                emit(&commands, Command::Notify(e.to_string())).await;
                return Err(e);
            }
        };
        let mut subscription = match transport.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                emit(&commands, Command::Notify(TRANSPORT_ERROR_NOTICE.to_string())).await;
                return Err(SessionError::Transport(e));
            }
        };

        let mut lifecycle = CallLifecycle::new();
        let mut transcript = Transcript::new();

        lifecycle.start();
        if let Err(e) = transport.start(config).await {
            tracing::error!("Failed to start call: {:#}", e);
            lifecycle.start_failed();
        }

        let mut control_open = true;
        while !lifecycle.phase().is_terminal() {
            tokio::select! {
                biased;
                event = subscription.recv() => match event {
                    Some(event) => on_event(event, &mut lifecycle, &mut transcript, &commands).await,
                    None => {
                        tracing::warn!("Voice transport closed its event stream");
                        lifecycle.ended();
                    }
                },
                control = control_rx.recv(), if control_open => match control {
                    Some(SessionControl::Stop) => {
                        if lifecycle.stop().is_some() {
                            if let Err(e) = transport.stop().await {
                                tracing::warn!("Failed to stop call: {:#}", e);
                            }
                        }
                    }
                    None => control_open = false,
                },
            }
        }
        drop(subscription);

        let destination = match lifecycle.finish_reason() {
            Some(FinishReason::StartFailed) => {
                emit(&commands, Command::Notify(START_FAILED_NOTICE.to_string())).await;
                Destination::Home
            }
            reason => {
                let reason = reason.unwrap_or(FinishReason::Ended);
                purpose.complete(transcript, reason, &commands).await
            }
        };

        tracing::info!("Session complete, navigating to {}", destination);
        emit(&commands, Command::Navigate(destination.clone())).await;
        Ok(destination)
    }
}

async fn on_event(
    event: VoiceEvent,
    lifecycle: &mut CallLifecycle,
    transcript: &mut Transcript,
    commands: &mpsc::Sender<Command>,
) {
    match event {
        VoiceEvent::CallStart => {
            lifecycle.established();
        }
        VoiceEvent::CallEnd => {
            lifecycle.ended();
        }
        VoiceEvent::Message(message) => {
            if lifecycle.phase() != CallPhase::Active {
                tracing::debug!("Dropping message received while {}", lifecycle.phase());
                return;
            }
            if transcript.accept(message) {
                if let Some(text) = transcript.last_text() {
                    emit(commands, Command::Caption(text.to_string())).await;
                }
            }
        }
        VoiceEvent::SpeechStart => emit(commands, Command::Speaking(true)).await,
        VoiceEvent::SpeechEnd => emit(commands, Command::Speaking(false)).await,
        VoiceEvent::Error(e) => {
            tracing::error!("Voice transport error: {}", e);
            emit(commands, Command::Notify(TRANSPORT_ERROR_NOTICE.to_string())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::MockEvaluator;
    use crate::feedback::{FEEDBACK_COLLECTION, sample_result};
    use crate::repository::InterviewRepository;
    use crate::store::MemoryStore;
    use crate::transcript::{Finality, Speaker, TranscriptMessage};
    use crate::voice::Subscription;
    use anyhow::{Result, anyhow};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Record {
        subscribed: usize,
        started: Vec<CallConfig>,
        stopped: usize,
    }

    /// Replays a fixed list of events once the call is started.
    struct ScriptedTransport {
        script: Vec<VoiceEvent>,
        fail_subscribe: bool,
        fail_start: bool,
        tx: Option<mpsc::Sender<VoiceEvent>>,
        record: Arc<Mutex<Record>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<VoiceEvent>) -> (Self, Arc<Mutex<Record>>) {
            let record = Arc::new(Mutex::new(Record::default()));
            let transport = Self {
                script,
                fail_subscribe: false,
                fail_start: false,
                tx: None,
                record: record.clone(),
            };
            (transport, record)
        }
    }

    #[async_trait]
    impl VoiceTransport for ScriptedTransport {
        async fn subscribe(&mut self) -> Result<Subscription> {
            if self.fail_subscribe {
                return Err(anyhow!("gateway unreachable"));
            }
            let (tx, rx) = mpsc::channel(64);
            self.tx = Some(tx);
            self.record.lock().unwrap().subscribed += 1;
            Ok(Subscription::new(rx))
        }

        async fn start(&mut self, config: CallConfig) -> Result<()> {
            self.record.lock().unwrap().started.push(config);
            if self.fail_start {
                return Err(anyhow!("assistant not found"));
            }
            let tx = self.tx.as_ref().ok_or_else(|| anyhow!("not subscribed"))?;
            for event in self.script.drain(..) {
                tx.send(event).await?;
            }
            Ok(())
        }

        async fn stop(&mut self) -> Result<()> {
            self.record.lock().unwrap().stopped += 1;
            Ok(())
        }
    }

    fn user(text: &str, finality: Finality) -> VoiceEvent {
        VoiceEvent::Message(TranscriptMessage::new(Speaker::User, text, finality))
    }

    fn assistant(text: &str) -> VoiceEvent {
        VoiceEvent::Message(TranscriptMessage::new(Speaker::Assistant, text, Finality::Partial))
    }

    fn context() -> InterviewContext {
        InterviewContext {
            interview_id: Some("i1".to_string()),
            user_id: Some("u1".to_string()),
            user_name: Some("Ada".to_string()),
            feedback_id: None,
            questions: vec!["What is ownership?".to_string(), "Why async?".to_string()],
        }
    }

    fn interview(evaluator: MockEvaluator, store: Arc<MemoryStore>) -> ConductInterview {
        let orchestrator =
            FeedbackOrchestrator::new(Arc::new(evaluator), InterviewRepository::new(store));
        ConductInterview::new(context(), orchestrator, PromptSet::default())
    }

    fn drain(rx: &mut mpsc::Receiver<Command>) -> Vec<Command> {
        let mut out = Vec::new();
        while let Ok(command) = rx.try_recv() {
            out.push(command);
        }
        out
    }

    #[tokio::test]
    async fn test_interview_evaluates_once_despite_repeated_call_end() {
        let mut evaluator = MockEvaluator::new();
        evaluator.expect_evaluate().times(1).returning(|formatted| {
            assert_eq!(formatted, "- assistant: Tell me about yourself.\n- user: I write Rust.\n");
            Ok(serde_json::to_string(&sample_result()).unwrap())
        });
        let store = Arc::new(MemoryStore::new());

        let (transport, record) = ScriptedTransport::new(vec![
            assistant("too early"),
            VoiceEvent::CallStart,
            assistant("Tell me about yourself."),
            user("I write", Finality::Partial),
            user("I write Rust.", Finality::Final),
            VoiceEvent::CallEnd,
            VoiceEvent::CallEnd,
        ]);
        let (commands_tx, mut commands_rx) = mpsc::channel(64);
        let (session, _handle) = CallSession::new(
            interview(evaluator, store.clone()),
            Box::new(transport),
            commands_tx,
        );

        let destination = session.run().await.unwrap();
        assert_eq!(
            destination,
            Destination::Feedback {
                interview_id: "i1".to_string()
            }
        );
        assert_eq!(store.count(FEEDBACK_COLLECTION), 1);

        let record = record.lock().unwrap();
        let started = &record.started;
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].variable_values["username"], "Ada");
        assert_eq!(
            started[0].variable_values["questions"],
            "- What is ownership?\n- Why async?"
        );

        let commands = drain(&mut commands_rx);
        assert!(commands.contains(&Command::Caption("I write Rust.".to_string())));
        assert!(!commands.contains(&Command::Caption("I write".to_string())));
        assert_eq!(commands.last(), Some(&Command::Navigate(destination)));
    }

    #[tokio::test]
    async fn test_stop_evaluates_partial_transcript() {
        let mut evaluator = MockEvaluator::new();
        evaluator.expect_evaluate().times(1).returning(|formatted| {
            assert_eq!(formatted, "- assistant: First question.\n");
            Ok(serde_json::to_string(&sample_result()).unwrap())
        });
        let store = Arc::new(MemoryStore::new());

        let (transport, record) =
            ScriptedTransport::new(vec![VoiceEvent::CallStart, assistant("First question.")]);
        let (commands_tx, _commands_rx) = mpsc::channel(64);
        let (session, handle) = CallSession::new(
            interview(evaluator, store.clone()),
            Box::new(transport),
            commands_tx,
        );
        handle.stop().await.unwrap();

        let destination = session.run().await.unwrap();
        assert!(matches!(destination, Destination::Feedback { .. }));
        assert_eq!(record.lock().unwrap().stopped, 1);
        assert_eq!(store.count(FEEDBACK_COLLECTION), 1);
    }

    #[tokio::test]
    async fn test_failed_start_skips_evaluation() {
        let mut evaluator = MockEvaluator::new();
        evaluator.expect_evaluate().never();

        let (mut transport, record) = ScriptedTransport::new(vec![]);
        transport.fail_start = true;
        let (commands_tx, mut commands_rx) = mpsc::channel(64);
        let (session, _handle) = CallSession::new(
            interview(evaluator, Arc::new(MemoryStore::new())),
            Box::new(transport),
            commands_tx,
        );

        assert_eq!(session.run().await.unwrap(), Destination::Home);
        assert_eq!(record.lock().unwrap().stopped, 0);
        let commands = drain(&mut commands_rx);
        assert!(commands.contains(&Command::Notify(START_FAILED_NOTICE.to_string())));
    }

    #[tokio::test]
    async fn test_failed_subscribe_notifies() {
        let mut evaluator = MockEvaluator::new();
        evaluator.expect_evaluate().never();

        let (mut transport, record) = ScriptedTransport::new(vec![VoiceEvent::CallStart]);
        transport.fail_subscribe = true;
        let (commands_tx, mut commands_rx) = mpsc::channel(64);
        let (session, _handle) = CallSession::new(
            interview(evaluator, Arc::new(MemoryStore::new())),
            Box::new(transport),
            commands_tx,
        );

        assert!(matches!(session.run().await, Err(SessionError::Transport(_))));
        assert!(record.lock().unwrap().started.is_empty());
        assert_eq!(
            drain(&mut commands_rx),
            vec![Command::Notify(TRANSPORT_ERROR_NOTICE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_interview_without_questions_never_starts() {
        let mut evaluator = MockEvaluator::new();
        evaluator.expect_evaluate().never();
        let orchestrator = FeedbackOrchestrator::new(
            Arc::new(evaluator),
            InterviewRepository::new(Arc::new(MemoryStore::new())),
        );
        let purpose = ConductInterview::new(
            InterviewContext {
                questions: vec![],
                ..context()
            },
            orchestrator,
            PromptSet::default(),
        );

        let (transport, record) = ScriptedTransport::new(vec![VoiceEvent::CallStart]);
        let (commands_tx, mut commands_rx) = mpsc::channel(64);
        let (session, _handle) = CallSession::new(purpose, Box::new(transport), commands_tx);

        assert!(matches!(session.run().await, Err(SessionError::NoQuestions)));
        assert_eq!(record.lock().unwrap().subscribed, 0);
        assert_eq!(
            drain(&mut commands_rx),
            vec![Command::Notify(NO_QUESTIONS_NOTICE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_context_routes_home_with_notice() {
        let mut evaluator = MockEvaluator::new();
        evaluator.expect_evaluate().never();
        let orchestrator = FeedbackOrchestrator::new(
            Arc::new(evaluator),
            InterviewRepository::new(Arc::new(MemoryStore::new())),
        );
        let purpose = ConductInterview::new(
            InterviewContext {
                interview_id: None,
                ..context()
            },
            orchestrator,
            PromptSet::default(),
        );

        let (transport, _record) =
            ScriptedTransport::new(vec![VoiceEvent::CallStart, VoiceEvent::CallEnd]);
        let (commands_tx, mut commands_rx) = mpsc::channel(64);
        let (session, _handle) = CallSession::new(purpose, Box::new(transport), commands_tx);

        assert_eq!(session.run().await.unwrap(), Destination::Home);
        let commands = drain(&mut commands_rx);
        assert!(commands.contains(&Command::Notify(FEEDBACK_FAILED_NOTICE.to_string())));
    }

    #[tokio::test]
    async fn test_generate_session_routes_home() {
        let (transport, record) = ScriptedTransport::new(vec![
            VoiceEvent::CallStart,
            VoiceEvent::SpeechStart,
            assistant("What role are you preparing for?"),
            VoiceEvent::SpeechEnd,
            VoiceEvent::Error("jitter".to_string()),
            VoiceEvent::CallEnd,
        ]);
        let (commands_tx, mut commands_rx) = mpsc::channel(64);
        let purpose = GenerateQuestions::new(None, Some("u1".to_string()), PromptSet::default());
        let (session, _handle) = CallSession::new(purpose, Box::new(transport), commands_tx);

        assert_eq!(session.run().await.unwrap(), Destination::Home);

        let record = record.lock().unwrap();
        let started = &record.started;
        assert_eq!(started[0].variable_values["username"], DEFAULT_USER_NAME);
        assert_eq!(started[0].variable_values["userid"], "u1");

        let commands = drain(&mut commands_rx);
        assert!(commands.contains(&Command::Speaking(true)));
        assert!(commands.contains(&Command::Notify(TRANSPORT_ERROR_NOTICE.to_string())));
        assert!(!commands.contains(&Command::Processing(true)));
    }
}
