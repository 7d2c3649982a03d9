use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FEEDBACK_COLLECTION: &str = "feedback";

/// Category names the evaluation prompt asks the model to score, in order.
pub const FEEDBACK_CATEGORIES: [&str; 5] = [
    "Communication Skills",
    "Technical Knowledge",
    "Problem Solving",
    "Cultural Fit",
    "Interview Presence",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub name: String,
    pub score: f64,
    pub comment: String,
}

/// The structured evaluation returned by the model, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResult {
    pub total_score: f64,
    pub category_scores: Vec<CategoryScore>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub final_assessment: String,
}

impl FeedbackResult {
    /// Parses model output. Anything that does not match the schema, or holds a
    /// score outside 0..=100, is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let result: FeedbackResult = serde_json::from_str(strip_code_fence(raw))
            .context("Evaluation output does not match the feedback schema")?;
        result.validate()?;
        Ok(result)
    }

    fn validate(&self) -> Result<()> {
        if !is_score(self.total_score) {
            bail!("totalScore {} is outside 0..=100", self.total_score);
        }
        for category in &self.category_scores {
            if !is_score(category.score) {
                bail!(
                    "score {} for '{}' is outside 0..=100",
                    category.score,
                    category.name
                );
            }
        }
        Ok(())
    }
}

fn is_score(value: f64) -> bool {
    (0.0..=100.0).contains(&value)
}

/// Models often wrap JSON in a markdown fence even when asked not to.
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// A stored feedback document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub interview_id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub result: FeedbackResult,
    pub created_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(interview_id: &str, user_id: &str, result: FeedbackResult) -> Self {
        Self {
            id: None,
            interview_id: interview_id.to_string(),
            user_id: user_id.to_string(),
            result,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> FeedbackSummary {
        FeedbackSummary {
            total_score: self.result.total_score,
            final_assessment: self.result.final_assessment.clone(),
            created_at: self.created_at,
        }
    }
}

/// The slice of a feedback document shown next to an interview in a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub total_score: f64,
    pub final_assessment: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
pub(crate) fn sample_result() -> FeedbackResult {
    FeedbackResult {
        total_score: 72.0,
        category_scores: FEEDBACK_CATEGORIES
            .iter()
            .map(|name| CategoryScore {
                name: name.to_string(),
                score: 70.0,
                comment: "Solid".to_string(),
            })
            .collect(),
        strengths: vec!["Clear answers".to_string()],
        areas_for_improvement: vec!["Use more examples".to_string()],
        final_assessment: "A good first attempt.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = r#"{
        "totalScore": 81,
        "categoryScores": [
            {"name": "Communication Skills", "score": 85, "comment": "Clear"},
            {"name": "Technical Knowledge", "score": 78.5, "comment": "Good grasp"}
        ],
        "strengths": ["Structured answers"],
        "areasForImprovement": ["Quantify impact"],
        "finalAssessment": "Strong candidate."
    }"#;

    #[test]
    fn test_parse_valid_result() {
        let result = FeedbackResult::parse(RAW).unwrap();
        assert_eq!(result.total_score, 81.0);
        assert_eq!(result.category_scores.len(), 2);
        assert_eq!(result.category_scores[1].score, 78.5);
        assert_eq!(result.final_assessment, "Strong candidate.");
    }

    #[test]
    fn test_parse_accepts_fenced_json() {
        let fenced = format!("```json\n{RAW}\n```");
        assert!(FeedbackResult::parse(&fenced).is_ok());
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = FeedbackResult::parse(r#"{"totalScore": 50}"#).unwrap_err();
        assert!(err.to_string().contains("feedback schema"));
    }

    #[test]
    fn test_parse_rejects_out_of_range_scores() {
        let raw = RAW.replace("\"totalScore\": 81", "\"totalScore\": 140");
        assert!(FeedbackResult::parse(&raw).is_err());

        let raw = RAW.replace("\"score\": 85", "\"score\": -3");
        assert!(FeedbackResult::parse(&raw).is_err());
    }

    #[test]
    fn test_stored_document_is_flat() {
        let feedback = Feedback::new("i1", "u1", sample_result());
        let json = serde_json::to_value(&feedback).unwrap();

        assert_eq!(json["interviewId"], "i1");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["totalScore"], 72.0);
        assert!(json["createdAt"].is_string());
        assert!(json.get("id").is_none());

        let back: Feedback = serde_json::from_value(json).unwrap();
        assert_eq!(back.result, feedback.result);
    }
}
