use crate::feedback::{FEEDBACK_COLLECTION, Feedback};
use crate::interview::{INTERVIEW_COLLECTION, Interview, InterviewWithFeedback};
use crate::store::{Direction, Document, DocumentStore, Query};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub const DEFAULT_LATEST_LIMIT: usize = 20;

/// Typed access to the interview and feedback collections.
#[derive(Clone)]
pub struct InterviewRepository {
    store: Arc<dyn DocumentStore>,
}

fn decode<T: DeserializeOwned>(doc: Document) -> Result<T> {
    let id = doc.id.clone();
    serde_json::from_value(doc.into_value())
        .with_context(|| format!("Stored document '{id}' has an unexpected shape"))
}

/// Decodes every document, logging and skipping the ones that do not fit.
fn decode_all<T: DeserializeOwned>(docs: Vec<Document>) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match decode(doc) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("{:#}", e);
                None
            }
        })
        .collect()
}

impl InterviewRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create_interview(&self, interview: &Interview) -> Result<String> {
        let data = serde_json::to_value(interview)?;
        let id = self
            .store
            .add(INTERVIEW_COLLECTION, data)
            .await
            .context("Failed to save interview")?;
        tracing::info!("Saved interview {} for user {}", id, interview.user_id);
        Ok(id)
    }

    pub async fn get_interview_by_id(&self, id: &str) -> Result<Option<Interview>> {
        self.store
            .get(INTERVIEW_COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Writes feedback at `feedback_id` when given, otherwise inserts it under a
    /// new id. Returns the id the document was stored under.
    pub async fn save_feedback(&self, feedback: &Feedback, feedback_id: Option<&str>) -> Result<String> {
        let mut data = serde_json::to_value(feedback)?;
        if let Some(map) = data.as_object_mut() {
            map.remove("id");
        }

        match feedback_id {
            Some(id) => {
                self.store.set(FEEDBACK_COLLECTION, id, data).await?;
                Ok(id.to_string())
            }
            None => self.store.add(FEEDBACK_COLLECTION, data).await,
        }
    }

    pub async fn get_feedback_by_interview_id(
        &self,
        interview_id: &str,
        user_id: &str,
    ) -> Result<Option<Feedback>> {
        let query = Query::new()
            .where_eq("interviewId", interview_id)
            .where_eq("userId", user_id)
            .limit(1);
        let docs = self.store.query(FEEDBACK_COLLECTION, query).await?;
        docs.into_iter().next().map(decode).transpose()
    }

    /// Finalized interviews created by anyone except `user_id`, newest first.
    pub async fn get_latest_interviews(&self, user_id: &str, limit: usize) -> Result<Vec<Interview>> {
        let query = Query::new()
            .where_eq("finalized", true)
            .where_ne("userId", user_id)
            .order_by("createdAt", Direction::Desc)
            .limit(limit);
        let docs = self.store.query(INTERVIEW_COLLECTION, query).await?;
        Ok(decode_all(docs))
    }

    /// A user's interviews, newest first, each with its feedback summary.
    pub async fn get_interviews_by_user_id(&self, user_id: &str) -> Result<Vec<InterviewWithFeedback>> {
        let query = Query::new()
            .where_eq("userId", user_id)
            .order_by("createdAt", Direction::Desc);
        let docs = self.store.query(INTERVIEW_COLLECTION, query).await?;

        let mut listed = Vec::with_capacity(docs.len());
        for interview in decode_all::<Interview>(docs) {
            let feedback = match interview.id.as_deref() {
                Some(id) => self
                    .get_feedback_by_interview_id(id, user_id)
                    .await?
                    .map(|f| f.summary()),
                None => None,
            };
            listed.push(InterviewWithFeedback {
                interview,
                feedback,
            });
        }
        Ok(listed)
    }
}
