//! Turns a finished interview transcript into stored feedback.

use crate::evaluator::Evaluator;
use crate::feedback::{Feedback, FeedbackResult};
use crate::repository::InterviewRepository;
use crate::transcript::Transcript;
use std::sync::Arc;

/// Everything needed to evaluate one interview.
#[derive(Debug, Clone, Default)]
pub struct FeedbackRequest {
    pub interview_id: Option<String>,
    pub user_id: Option<String>,
    /// An existing feedback document to overwrite instead of inserting a new one.
    pub feedback_id: Option<String>,
    pub transcript: Transcript,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("interview id or user id is missing")]
    MissingContext,
    #[error("evaluation failed: {0:#}")]
    EvaluationFailed(#[source] anyhow::Error),
    #[error("saving feedback failed: {0:#}")]
    PersistenceFailed(#[source] anyhow::Error),
}

/// What the caller sees once the orchestrator is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Saved {
        interview_id: String,
        feedback_id: String,
    },
    MissingContext,
    EvaluationFailed,
}

impl FeedbackOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, FeedbackOutcome::Saved { .. })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Clone)]
pub struct FeedbackOrchestrator {
    evaluator: Arc<dyn Evaluator>,
    repository: InterviewRepository,
}

impl FeedbackOrchestrator {
    pub fn new(evaluator: Arc<dyn Evaluator>, repository: InterviewRepository) -> Self {
        Self {
            evaluator,
            repository,
        }
    }

    /// Evaluates the transcript and stores the result. Never retries.
    pub async fn create_feedback(&self, request: &FeedbackRequest) -> FeedbackOutcome {
        match self.try_create_feedback(request).await {
            Ok((interview_id, feedback_id)) => {
                tracing::info!("Saved feedback {} for interview {}", feedback_id, interview_id);
                FeedbackOutcome::Saved {
                    interview_id,
                    feedback_id,
                }
            }
            Err(FeedbackError::MissingContext) => {
                tracing::warn!("Not requesting feedback: {}", FeedbackError::MissingContext);
                FeedbackOutcome::MissingContext
            }
            Err(e) => {
                tracing::error!("Error saving feedback: {}", e);
                FeedbackOutcome::EvaluationFailed
            }
        }
    }

    /// The same flow as [`create_feedback`](Self::create_feedback), keeping the
    /// failure kind. Returns `(interview_id, feedback_id)`.
    pub async fn try_create_feedback(
        &self,
        request: &FeedbackRequest,
    ) -> Result<(String, String), FeedbackError> {
        let (Some(interview_id), Some(user_id)) = (
            present(request.interview_id.as_deref()),
            present(request.user_id.as_deref()),
        ) else {
            return Err(FeedbackError::MissingContext);
        };

        tracing::debug!(
            "Requesting feedback for interview {} ({} utterances)",
            interview_id,
            request.transcript.len()
        );
        let raw = self
            .evaluator
            .evaluate(&request.transcript.format_for_evaluation())
            .await
            .map_err(FeedbackError::EvaluationFailed)?;
        let result = FeedbackResult::parse(&raw).map_err(FeedbackError::EvaluationFailed)?;

        let feedback = Feedback::new(interview_id, user_id, result);
        let feedback_id = self
            .repository
            .save_feedback(&feedback, present(request.feedback_id.as_deref()))
            .await
            .map_err(FeedbackError::PersistenceFailed)?;

        Ok((interview_id.to_string(), feedback_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::MockEvaluator;
    use crate::feedback::{FEEDBACK_COLLECTION, sample_result};
    use crate::store::MockDocumentStore;
    use crate::transcript::{Speaker, Utterance};
    use anyhow::anyhow;

    fn transcript() -> Transcript {
        Transcript::from(vec![
            Utterance::new(Speaker::User, "hi"),
            Utterance::new(Speaker::Assistant, "hello, tell me about yourself"),
        ])
    }

    fn request(interview_id: Option<&str>, feedback_id: Option<&str>) -> FeedbackRequest {
        FeedbackRequest {
            interview_id: interview_id.map(str::to_string),
            user_id: Some("u1".to_string()),
            feedback_id: feedback_id.map(str::to_string),
            transcript: transcript(),
        }
    }

    fn stub_evaluator() -> MockEvaluator {
        let mut evaluator = MockEvaluator::new();
        evaluator.expect_evaluate().times(1).returning(|formatted| {
            assert_eq!(
                formatted,
                "- user: hi\n- assistant: hello, tell me about yourself\n"
            );
            Ok(serde_json::to_string(&sample_result()).unwrap())
        });
        evaluator
    }

    fn orchestrator(evaluator: MockEvaluator, store: MockDocumentStore) -> FeedbackOrchestrator {
        FeedbackOrchestrator::new(
            Arc::new(evaluator),
            InterviewRepository::new(Arc::new(store)),
        )
    }

    #[tokio::test]
    async fn test_inserts_when_no_feedback_id() {
        let mut store = MockDocumentStore::new();
        store.expect_add().times(1).returning(|collection, data| {
            assert_eq!(collection, FEEDBACK_COLLECTION);
            assert_eq!(data["interviewId"], "i1");
            assert_eq!(data["userId"], "u1");
            assert_eq!(data["totalScore"], 72.0);
            Ok("new-id".to_string())
        });
        store.expect_set().never();

        let outcome = orchestrator(stub_evaluator(), store)
            .create_feedback(&request(Some("i1"), None))
            .await;

        assert_eq!(
            outcome,
            FeedbackOutcome::Saved {
                interview_id: "i1".to_string(),
                feedback_id: "new-id".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_overwrites_existing_feedback_id() {
        let mut store = MockDocumentStore::new();
        store.expect_add().never();
        store.expect_set().times(1).returning(|collection, id, _| {
            assert_eq!(collection, FEEDBACK_COLLECTION);
            assert_eq!(id, "f1");
            Ok(())
        });

        let outcome = orchestrator(stub_evaluator(), store)
            .create_feedback(&request(Some("i1"), Some("f1")))
            .await;

        assert_eq!(
            outcome,
            FeedbackOutcome::Saved {
                interview_id: "i1".to_string(),
                feedback_id: "f1".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_interview_id_short_circuits() {
        let mut evaluator = MockEvaluator::new();
        evaluator.expect_evaluate().never();
        let mut store = MockDocumentStore::new();
        store.expect_add().never();
        store.expect_set().never();

        let orchestrator = orchestrator(evaluator, store);
        assert_eq!(
            orchestrator.create_feedback(&request(None, None)).await,
            FeedbackOutcome::MissingContext
        );
        assert_eq!(
            orchestrator.create_feedback(&request(Some(""), None)).await,
            FeedbackOutcome::MissingContext
        );
    }

    #[tokio::test]
    async fn test_evaluator_error_writes_nothing() {
        let mut evaluator = MockEvaluator::new();
        evaluator
            .expect_evaluate()
            .times(1)
            .returning(|_| Err(anyhow!("connection reset")));
        let mut store = MockDocumentStore::new();
        store.expect_add().never();
        store.expect_set().never();

        let orchestrator = orchestrator(evaluator, store);
        let err = orchestrator
            .try_create_feedback(&request(Some("i1"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedbackError::EvaluationFailed(_)));
    }

    #[tokio::test]
    async fn test_malformed_result_is_evaluation_failure() {
        let mut evaluator = MockEvaluator::new();
        evaluator
            .expect_evaluate()
            .returning(|_| Ok(r#"{"totalScore": "great"}"#.to_string()));
        let mut store = MockDocumentStore::new();
        store.expect_add().never();

        let outcome = orchestrator(evaluator, store)
            .create_feedback(&request(Some("i1"), None))
            .await;
        assert_eq!(outcome, FeedbackOutcome::EvaluationFailed);
    }

    #[tokio::test]
    async fn test_persistence_failure_collapses_to_evaluation_failure() {
        let mut store = MockDocumentStore::new();
        store
            .expect_add()
            .times(1)
            .returning(|_, _| Err(anyhow!("disk full")));

        let orchestrator = orchestrator(stub_evaluator(), store);
        let outcome = orchestrator.create_feedback(&request(Some("i1"), None)).await;
        assert_eq!(outcome, FeedbackOutcome::EvaluationFailed);
    }
}
