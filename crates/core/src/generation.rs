//! Turning an interview request into stored, ready-to-run questions.

use crate::evaluator::{Evaluator, QuestionSpec};
use crate::feedback::strip_code_fence;
use crate::interview::{Interview, InterviewType, Level, split_techstack};
use crate::repository::InterviewRepository;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Invalid interview type")]
    InvalidType,
    #[error("Invalid experience level")]
    InvalidLevel,
    #[error("Invalid questions format")]
    InvalidQuestions(#[source] anyhow::Error),
    #[error("Failed to generate questions: {0:#}")]
    Evaluation(#[source] anyhow::Error),
    #[error("Failed to save interview: {0:#}")]
    Persistence(#[source] anyhow::Error),
}

impl GenerationError {
    /// Whether the request itself was at fault, as opposed to a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GenerationError::MissingFields
                | GenerationError::InvalidType
                | GenerationError::InvalidLevel
        )
    }
}

/// An interview request as submitted by the client. Every field is optional so
/// that missing values surface as `MissingFields` rather than a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationRequest {
    #[serde(rename = "type")]
    pub interview_type: Option<String>,
    pub role: Option<String>,
    pub level: Option<String>,
    pub techstack: Option<String>,
    pub amount: Option<u32>,
    #[serde(rename = "userid", alias = "userId")]
    pub user_id: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl GenerationRequest {
    /// Checks the request and returns what to generate and for whom.
    pub fn validate(&self) -> Result<(QuestionSpec, String), GenerationError> {
        let (Some(kind), Some(role), Some(level), Some(techstack), Some(amount), Some(user_id)) = (
            present(&self.interview_type),
            present(&self.role),
            present(&self.level),
            present(&self.techstack),
            self.amount.filter(|a| *a > 0),
            present(&self.user_id),
        ) else {
            return Err(GenerationError::MissingFields);
        };

        let interview_type: InterviewType =
            kind.parse().map_err(|_| GenerationError::InvalidType)?;
        let level: Level = level.parse().map_err(|_| GenerationError::InvalidLevel)?;

        let spec = QuestionSpec {
            role: role.to_string(),
            level,
            techstack: split_techstack(techstack),
            interview_type,
            amount,
        };
        Ok((spec, user_id.to_string()))
    }
}

/// Reads model output that should be a JSON array of question strings.
pub fn parse_questions(raw: &str) -> Result<Vec<String>> {
    let questions: Vec<String> = serde_json::from_str(strip_code_fence(raw))
        .context("Questions must be a JSON array of strings")?;
    Ok(questions)
}

/// Generates questions for `request` and stores them as a finalized interview.
/// Returns the new interview id.
pub async fn generate_interview(
    evaluator: &dyn Evaluator,
    repository: &InterviewRepository,
    request: &GenerationRequest,
) -> Result<String, GenerationError> {
    let (spec, user_id) = request.validate()?;
    tracing::info!(
        "Generating {} {} questions for a {} {} role",
        spec.amount,
        spec.interview_type,
        spec.level,
        spec.role
    );

    let raw = evaluator
        .generate_questions(&spec)
        .await
        .map_err(GenerationError::Evaluation)?;
    let questions = parse_questions(&raw).map_err(GenerationError::InvalidQuestions)?;

    let interview = Interview {
        id: None,
        role: spec.role,
        interview_type: spec.interview_type,
        level: spec.level,
        techstack: spec.techstack,
        questions,
        user_id,
        finalized: true,
        created_at: Utc::now(),
    };

    repository
        .create_interview(&interview)
        .await
        .map_err(GenerationError::Persistence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::MockEvaluator;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn request() -> GenerationRequest {
        GenerationRequest {
            interview_type: Some("Mixed".to_string()),
            role: Some("Frontend Developer".to_string()),
            level: Some("Senior".to_string()),
            techstack: Some("React, TypeScript".to_string()),
            amount: Some(2),
            user_id: Some("u1".to_string()),
        }
    }

    #[test]
    fn test_validate_accepts_complete_request() {
        let (spec, user_id) = request().validate().unwrap();
        assert_eq!(user_id, "u1");
        assert_eq!(spec.interview_type, InterviewType::Mixed);
        assert_eq!(spec.level, Level::Senior);
        assert_eq!(spec.techstack, vec!["React", "TypeScript"]);
    }

    #[test]
    fn test_validate_rejects_bad_requests() {
        let mut missing = request();
        missing.role = Some("  ".to_string());
        assert!(matches!(missing.validate(), Err(GenerationError::MissingFields)));

        let mut zero = request();
        zero.amount = Some(0);
        assert!(matches!(zero.validate(), Err(GenerationError::MissingFields)));

        let mut bad_type = request();
        bad_type.interview_type = Some("Panel".to_string());
        assert!(matches!(bad_type.validate(), Err(GenerationError::InvalidType)));

        let mut bad_level = request();
        bad_level.level = Some("Principal".to_string());
        let err = bad_level.validate().unwrap_err();
        assert!(matches!(err, GenerationError::InvalidLevel));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_request_decodes_wire_names() {
        let request: GenerationRequest = serde_json::from_str(
            r#"{"type":"Technical","role":"SRE","level":"Junior","techstack":"Go","amount":5,"userid":"u9"}"#,
        )
        .unwrap();
        assert_eq!(request.user_id.as_deref(), Some("u9"));
        assert_eq!(request.interview_type.as_deref(), Some("Technical"));
    }

    #[test]
    fn test_parse_questions() {
        assert_eq!(
            parse_questions(r#"["One?", "Two?"]"#).unwrap(),
            vec!["One?", "Two?"]
        );
        assert!(parse_questions(r#"{"questions": ["One?"]}"#).is_err());
        assert!(parse_questions("1. One?\n2. Two?").is_err());
    }

    #[tokio::test]
    async fn test_generate_interview_stores_questions() {
        let mut evaluator = MockEvaluator::new();
        evaluator
            .expect_generate_questions()
            .times(1)
            .returning(|spec| {
                assert_eq!(spec.amount, 2);
                Ok(r#"["Explain hooks.", "Describe a conflict you resolved."]"#.to_string())
            });

        let repository = InterviewRepository::new(Arc::new(MemoryStore::new()));
        let id = generate_interview(&evaluator, &repository, &request())
            .await
            .unwrap();

        let stored = repository.get_interview_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.questions.len(), 2);
        assert_eq!(stored.interview_type, InterviewType::Mixed);
        assert!(stored.finalized);
        assert_eq!(stored.user_id, "u1");
    }

    #[tokio::test]
    async fn test_generate_interview_rejects_non_array_output() {
        let mut evaluator = MockEvaluator::new();
        evaluator
            .expect_generate_questions()
            .returning(|_| Ok("Here are some questions: ...".to_string()));

        let store = Arc::new(MemoryStore::new());
        let repository = InterviewRepository::new(store.clone());
        let err = generate_interview(&evaluator, &repository, &request())
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::InvalidQuestions(_)));
        assert!(!err.is_client_error());
        assert_eq!(store.count(crate::interview::INTERVIEW_COLLECTION), 0);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_model() {
        let mut evaluator = MockEvaluator::new();
        evaluator.expect_generate_questions().never();

        let repository = InterviewRepository::new(Arc::new(MemoryStore::new()));
        let err = generate_interview(&evaluator, &repository, &GenerationRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingFields));
    }
}
