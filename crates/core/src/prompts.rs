use std::collections::HashMap;

pub const FEEDBACK_SYSTEM: &str = "You are an experienced interviewer providing constructive feedback to help candidates improve their interview performance.";

pub const FEEDBACK_PROMPT: &str = r#"As an experienced interviewer, provide constructive feedback on this practice interview to help the candidate improve.

Interview Transcript:
{transcript}

Score each of these categories from 0 to 100, in this order, with a short comment:
1. Communication Skills: clarity, answer structure, active listening, professional tone.
2. Technical Knowledge: core concepts, practical application, vocabulary, best practices.
3. Problem Solving: analytical thinking, approach, edge cases, debugging strategy.
4. Cultural Fit: collaboration, work style, learning attitude, adaptability.
5. Interview Presence: confidence, question understanding, response quality, composure.

Give specific examples from the answers, highlight strengths, and suggest practical next steps.

Respond STRICTLY as a JSON object:
{
  "totalScore": <0-100>,
  "categoryScores": [{"name": "<category>", "score": <0-100>, "comment": "<text>"}, ...],
  "strengths": ["<text>", ...],
  "areasForImprovement": ["<text>", ...],
  "finalAssessment": "<text>"
}"#;

pub const QUESTIONS_PROMPT: &str = r#"Generate realistic interview questions that will help a candidate practice.

Interview Parameters:
- Role: {role}
- Level: {level}
- Tech Stack: {techstack}
- Interview Type: {type}
- Number of Questions: {amount}

Guidelines:
- Junior: core concepts and basic implementations. Mid-Level: architecture and optimization. Senior: system design and leadership.
- Technical: real coding scenarios. Behavioral: real workplace situations. Mixed: both.
- Cover practical usage and common challenges of {techstack}.

Return ONLY a JSON array of strings: ["Question 1", "Question 2", "Question 3"]
Keep questions clear and concise and avoid special characters that affect voice synthesis."#;

pub const INTERVIEWER_INSTRUCTIONS: &str = r#"You are a professional job interviewer conducting a real-time voice interview with {username}.

Ask these questions, one at a time, in order:
{questions}

- Listen to each answer and acknowledge it briefly before moving on.
- Ask a short follow-up only when an answer is vague.
- Keep responses short and conversational; this is a voice call.
- Stay professional and polite. When all questions are done, thank the candidate and end the call."#;

pub const INTERVIEWER_FIRST_MESSAGE: &str = "Hello {username}! Thank you for taking the time to speak with me today. Shall we begin?";

pub const GENERATOR_INSTRUCTIONS: &str = r#"You are helping {username} set up a mock job interview over a voice call.

Collect, one at a time:
- the role they are preparing for;
- the experience level (Junior, Mid-Level or Senior);
- the interview type (Technical, Behavioral or Mixed);
- the technologies to cover;
- how many questions they want.

Confirm the answers, tell them the interview is being prepared and end the call.
Keep every response short; this is a voice call."#;

/// Prompt templates, with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub feedback_system: String,
    pub feedback: String,
    pub questions: String,
    pub interviewer: String,
    pub interviewer_first_message: String,
    pub generator: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            feedback_system: FEEDBACK_SYSTEM.to_string(),
            feedback: FEEDBACK_PROMPT.to_string(),
            questions: QUESTIONS_PROMPT.to_string(),
            interviewer: INTERVIEWER_INSTRUCTIONS.to_string(),
            interviewer_first_message: INTERVIEWER_FIRST_MESSAGE.to_string(),
            generator: GENERATOR_INSTRUCTIONS.to_string(),
        }
    }
}

impl PromptSet {
    /// Built-in prompts overridden by any entry of `overrides` keyed by
    /// `feedback_system`, `feedback`, `questions`, `interviewer`,
    /// `interviewer_first_message` or `generator`.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut prompts = Self::default();
        for (key, value) in overrides {
            let slot = match key.as_str() {
                "feedback_system" => &mut prompts.feedback_system,
                "feedback" => &mut prompts.feedback,
                "questions" => &mut prompts.questions,
                "interviewer" => &mut prompts.interviewer,
                "interviewer_first_message" => &mut prompts.interviewer_first_message,
                "generator" => &mut prompts.generator,
                other => {
                    tracing::warn!("Ignoring unknown prompt '{}'", other);
                    continue;
                }
            };
            *slot = value.trim().to_string();
        }
        prompts
    }
}

/// Replaces each `{key}` in `template` with its value.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{key}}}"), value)
        })
}
