use crate::evaluator::{Evaluator, QuestionSpec, http_client, questions_prompt};
use crate::prompts::{PromptSet, render};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// An `Evaluator` backed by the Gemini `generateContent` endpoint.
pub struct GeminiEvaluator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    prompts: PromptSet,
}

impl GeminiEvaluator {
    pub fn new(api_key: String, model: String, prompts: PromptSet) -> Self {
        Self {
            client: http_client(),
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
            prompts,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn request_body(system: Option<&str>, prompt: &str, json: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        if let Some(system) = system {
            body["systemInstruction"] = serde_json::json!({ "parts": [{ "text": system }] });
        }
        if json {
            body["generationConfig"] = serde_json::json!({ "responseMimeType": "application/json" });
        }
        body
    }

    async fn generate(&self, body: serde_json::Value) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateContentResponse>()
            .await?;

        let text: String = resp
            .candidates
            .first()
            .ok_or_else(|| anyhow::anyhow!("No candidates in Gemini response"))?
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl Evaluator for GeminiEvaluator {
    async fn evaluate(&self, transcript: &str) -> Result<String> {
        let prompt = render(&self.prompts.feedback, &[("transcript", transcript)]);
        let body = Self::request_body(Some(&self.prompts.feedback_system), &prompt, true);
        self.generate(body)
            .await
            .context("Evaluation request to Gemini failed")
    }

    async fn generate_questions(&self, spec: &QuestionSpec) -> Result<String> {
        let prompt = questions_prompt(&self.prompts, spec);
        let body = Self::request_body(None, &prompt, true);
        self.generate(body)
            .await
            .context("Question generation request to Gemini failed")
    }
}
