use crate::orchestrator::FeedbackOutcome;
use std::fmt;

/// Where the client should go once a session is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Feedback { interview_id: String },
    Home,
}

impl Destination {
    pub fn path(&self) -> String {
        match self {
            Destination::Feedback { interview_id } => format!("/interview/{interview_id}/feedback"),
            Destination::Home => "/".to_string(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Maps a feedback outcome to a destination. Every failure falls back to home.
pub fn route(outcome: &FeedbackOutcome) -> Destination {
    match outcome {
        FeedbackOutcome::Saved { interview_id, .. } => Destination::Feedback {
            interview_id: interview_id.clone(),
        },
        FeedbackOutcome::MissingContext | FeedbackOutcome::EvaluationFailed => Destination::Home,
    }
}
