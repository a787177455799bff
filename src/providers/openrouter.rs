use async_trait::async_trait;

use super::{client, ensure_success, TextImprover};
use crate::error::AppError;

const ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: Option<u32>,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChoiceMessage {
    content: String,
}

pub struct OpenRouterClient {
    api_key: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }
}

#[async_trait]
impl TextImprover for OpenRouterClient {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, AppError> {
        let req = ChatRequest {
            model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: 0.7,
            max_tokens: Some(4000),
        };

        let resp = client()
            .post(ENDPOINT)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "http://localhost:3000")
            .header("X-Title", "AI Writing Assistant")
            .json(&req)
            .send()
            .await?;
        let resp = ensure_success("OpenRouter", resp).await?;

        let body = resp.text().await?;
        parse_completion(&body)
    }
}

fn parse_completion(body: &str) -> Result<String, AppError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Provider(format!("OpenRouter: malformed response: {}", e)))?;
    parsed
        .choices
        .first()
        .map(|c| c.message.content.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Provider("Couldn't get a proper response from AI".to_string()))
}
