use crate::feedback::FeedbackSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub const INTERVIEW_COLLECTION: &str = "interviews";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InterviewType {
    Technical,
    Behavioral,
    Mixed,
}

impl InterviewType {
    /// Lenient reading used for stored records, where any label mentioning
    /// "mix" counts as [`InterviewType::Mixed`].
    pub fn normalize(label: &str) -> Option<Self> {
        let lower = label.trim().to_lowercase();
        if lower.contains("mix") {
            return Some(InterviewType::Mixed);
        }
        match lower.as_str() {
            "technical" => Some(InterviewType::Technical),
            "behavioral" | "behavioural" => Some(InterviewType::Behavioral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewType::Technical => "Technical",
            InterviewType::Behavioral => "Behavioral",
            InterviewType::Mixed => "Mixed",
        }
    }
}

impl fmt::Display for InterviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parsing for new requests: only the three canonical labels.
impl FromStr for InterviewType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Technical" => Ok(InterviewType::Technical),
            "Behavioral" => Ok(InterviewType::Behavioral),
            "Mixed" => Ok(InterviewType::Mixed),
            _ => Err(()),
        }
    }
}

impl<'de> Deserialize<'de> for InterviewType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        InterviewType::normalize(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown interview type '{label}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Junior,
    #[serde(rename = "Mid-Level")]
    MidLevel,
    Senior,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Junior => "Junior",
            Level::MidLevel => "Mid-Level",
            Level::Senior => "Senior",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Junior" => Ok(Level::Junior),
            "Mid-Level" => Ok(Level::MidLevel),
            "Senior" => Ok(Level::Senior),
            _ => Err(()),
        }
    }
}

/// A stored interview: the generated questions plus what they were generated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: String,
    #[serde(rename = "type")]
    pub interview_type: InterviewType,
    pub level: Level,
    pub techstack: Vec<String>,
    pub questions: Vec<String>,
    pub user_id: String,
    pub finalized: bool,
    pub created_at: DateTime<Utc>,
}

/// An interview as listed for its owner, with the feedback it received if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewWithFeedback {
    #[serde(flatten)]
    pub interview: Interview,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackSummary>,
}

/// Splits a comma-separated tech stack, trimming and dropping empty entries.
pub fn split_techstack(techstack: &str) -> Vec<String> {
    techstack
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Renders questions as the `- question` lines handed to the voice assistant.
pub fn format_questions(questions: &[String]) -> String {
    questions
        .iter()
        .map(|q| format!("- {q}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Two-letter badge for a role: the first two letters of a single word, or
/// the first letters of the first two words.
pub fn initials_from_role(role: &str) -> String {
    let words: Vec<&str> = role.split(' ').collect();
    if words.len() == 1 {
        return role.chars().take(2).collect::<String>().to_uppercase();
    }
    words
        .iter()
        .take(2)
        .filter_map(|w| w.chars().next())
        .collect::<String>()
        .to_uppercase()
}

const TECH_ALIASES: &[(&str, &str)] = &[
    ("vue", "vuejs"),
    ("angular", "angularjs"),
    ("aws", "amazonwebservices"),
    ("gcp", "googlecloud"),
    ("html", "html5"),
    ("css", "css3"),
    ("tailwind", "tailwindcss"),
    ("adobexd", "xd"),
];

/// Canonical icon key for a technology name.
pub fn normalize_tech_name(tech: &str) -> String {
    let lower = tech.to_lowercase();
    let key: String = lower
        .strip_suffix(".js")
        .unwrap_or(&lower)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    TECH_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(key)
}
