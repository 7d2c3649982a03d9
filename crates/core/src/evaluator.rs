use crate::gemini_evaluator::GeminiEvaluator;
use crate::interview::{InterviewType, Level};
use crate::prompts::{PromptSet, render};
use anyhow::{Context, Result};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Upper bound on a single model call, owned by the HTTP client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: String,
}

/// What a set of practice questions should be generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSpec {
    pub role: String,
    pub level: Level,
    pub techstack: Vec<String>,
    pub interview_type: InterviewType,
    pub amount: u32,
}

/// The text-generation service that scores interviews and writes questions.
///
/// Both methods return the model's raw text; callers own parsing, so a
/// malformed answer is handled exactly like a failed request.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Scores a transcript rendered by `Transcript::format_for_evaluation`.
    /// The answer should be a JSON `FeedbackResult`.
    async fn evaluate(&self, transcript: &str) -> Result<String>;

    /// The answer should be a JSON array of question strings.
    async fn generate_questions(&self, spec: &QuestionSpec) -> Result<String>;
}

pub(crate) fn questions_prompt(prompts: &PromptSet, spec: &QuestionSpec) -> String {
    let techstack = spec.techstack.join(", ");
    let amount = spec.amount.to_string();
    render(
        &prompts.questions,
        &[
            ("role", spec.role.as_str()),
            ("level", spec.level.as_str()),
            ("techstack", techstack.as_str()),
            ("type", spec.interview_type.as_str()),
            ("amount", amount.as_str()),
        ],
    )
}

pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
}

/// Calls an OpenAI-compatible chat completions endpoint.
pub struct EvaluatorClient {
    client: Client,
    api_key: String,
    model: String,
    url: String,
    prompts: PromptSet,
}

impl EvaluatorClient {
    pub fn new(api_key: String, model: String, prompts: PromptSet) -> Self {
        Self {
            client: http_client(),
            api_key,
            model,
            url: OPENAI_CHAT_URL.to_string(),
            prompts,
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    fn chat_body(&self, system: Option<&str>, prompt: &str, json: bool, temperature: f32) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": prompt }));

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": temperature,
        });
        if json {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        body
    }

    async fn chat(&self, body: serde_json::Value) -> Result<String> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<LlmResponse>()
            .await?;

        let answer = &resp
            .choices
            .first()
            .ok_or_else(|| anyhow::anyhow!("No response from LLM"))?
            .message
            .content;
        Ok(answer.trim().to_string())
    }
}

#[async_trait]
impl Evaluator for EvaluatorClient {
    async fn evaluate(&self, transcript: &str) -> Result<String> {
        let prompt = render(&self.prompts.feedback, &[("transcript", transcript)]);
        let body = self.chat_body(Some(&self.prompts.feedback_system), &prompt, true, 0.2);
        self.chat(body)
            .await
            .context("Evaluation request to chat completions failed")
    }

    async fn generate_questions(&self, spec: &QuestionSpec) -> Result<String> {
        let prompt = questions_prompt(&self.prompts, spec);
        // json_object mode only allows objects, so the array is requested as plain text.
        let body = self.chat_body(None, &prompt, false, 0.7);
        self.chat(body)
            .await
            .context("Question generation request to chat completions failed")
    }
}

/// Which text-generation backend scores interviews and writes questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    /// Anything other than "gemini" (in any case) selects OpenAI.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            _ => Provider::OpenAI,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o",
            Provider::Gemini => "gemini-2.0-flash-001",
        }
    }
}

pub fn build_evaluator(
    provider: Provider,
    api_key: String,
    model: String,
    prompts: PromptSet,
) -> Arc<dyn Evaluator> {
    tracing::info!("Using {:?} evaluator with model {}", provider, model);
    match provider {
        Provider::OpenAI => Arc::new(EvaluatorClient::new(api_key, model, prompts)),
        Provider::Gemini => Arc::new(GeminiEvaluator::new(api_key, model, prompts)),
    }
}
