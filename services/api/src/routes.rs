use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use interview_core::evaluator::Evaluator;
use interview_core::feedback::Feedback;
use interview_core::generation::{GenerationRequest, generate_interview};
use interview_core::interview::{Interview, InterviewWithFeedback};
use interview_core::orchestrator::{FeedbackOrchestrator, FeedbackOutcome, FeedbackRequest};
use interview_core::repository::{DEFAULT_LATEST_LIMIT, InterviewRepository};
use interview_core::router::route;
use interview_core::transcript::{Transcript, Utterance};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Shared handles for every request.
#[derive(Clone)]
pub struct AppState {
    pub repository: InterviewRepository,
    pub orchestrator: FeedbackOrchestrator,
    pub evaluator: Arc<dyn Evaluator>,
}

impl AppState {
    pub fn new(repository: InterviewRepository, evaluator: Arc<dyn Evaluator>) -> Self {
        let orchestrator = FeedbackOrchestrator::new(evaluator.clone(), repository.clone());
        Self {
            repository,
            orchestrator,
            evaluator,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(e) => {
                tracing::error!("{:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({ "success": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestQuery {
    pub user_id: String,
    pub limit: Option<usize>,
}

/// Body of `POST /api/feedback`, posted by a client once its call has ended.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateFeedbackBody {
    pub interview_id: Option<String>,
    pub user_id: Option<String>,
    pub feedback_id: Option<String>,
    pub transcript: Vec<Utterance>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/interviews/generate",
            get(generation_status).post(create_interview),
        )
        .route("/api/interviews/latest", get(latest_interviews))
        .route("/api/interviews/{id}", get(interview_by_id))
        .route("/api/interviews/{id}/feedback", get(feedback_for_interview))
        .route("/api/users/{user_id}/interviews", get(interviews_for_user))
        .route("/api/feedback", post(create_feedback))
        .with_state(state)
}

pub async fn generation_status() -> Json<Value> {
    Json(json!({ "success": true, "message": "Interview generation API is running" }))
}

pub async fn create_interview(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<Value>, ApiError> {
    match generate_interview(state.evaluator.as_ref(), &state.repository, &request).await {
        Ok(id) => Ok(Json(json!({ "success": true, "interviewId": id }))),
        Err(e) if e.is_client_error() => Err(ApiError::BadRequest(e.to_string())),
        Err(e) => Err(ApiError::Internal(e.into())),
    }
}

pub async fn interview_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Interview>, ApiError> {
    state
        .repository
        .get_interview_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Interview '{id}'")))
}

pub async fn feedback_for_interview(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Feedback>, ApiError> {
    state
        .repository
        .get_feedback_by_interview_id(&id, &query.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Feedback for interview '{id}'")))
}

pub async fn latest_interviews(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Vec<Interview>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LATEST_LIMIT);
    let interviews = state
        .repository
        .get_latest_interviews(&query.user_id, limit)
        .await?;
    Ok(Json(interviews))
}

pub async fn interviews_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<InterviewWithFeedback>>, ApiError> {
    let interviews = state.repository.get_interviews_by_user_id(&user_id).await?;
    Ok(Json(interviews))
}

/// Evaluates a finished call. Failures still answer with a redirect so the
/// client always knows where to go next.
pub async fn create_feedback(
    State(state): State<AppState>,
    Json(body): Json<CreateFeedbackBody>,
) -> (StatusCode, Json<Value>) {
    let request = FeedbackRequest {
        interview_id: body.interview_id,
        user_id: body.user_id,
        feedback_id: body.feedback_id,
        transcript: Transcript::from(body.transcript),
    };
    let outcome = state.orchestrator.create_feedback(&request).await;
    let redirect = route(&outcome).path();

    match outcome {
        FeedbackOutcome::Saved { feedback_id, .. } => (
            StatusCode::OK,
            Json(json!({ "success": true, "feedbackId": feedback_id, "redirect": redirect })),
        ),
        FeedbackOutcome::MissingContext => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "redirect": redirect })),
        ),
        FeedbackOutcome::EvaluationFailed => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "success": false, "redirect": redirect })),
        ),
    }
}
