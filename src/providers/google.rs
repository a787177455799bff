use async_trait::async_trait;
use serde_json::Value;

use super::{client, ensure_success, Translator};
use crate::error::AppError;

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Keyless Google Translate web endpoint.
pub struct GoogleTranslator {
    endpoint: String,
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleTranslator {
    pub fn new() -> Self {
        Self { endpoint: ENDPOINT.to_string() }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &'static str {
        "Google"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, AppError> {
        let resp = client()
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;
        let resp = ensure_success("Google", resp).await?;
        let body: Value = resp.json().await?;
        parse_response(&body)
    }
}

/// The body is `[[["translated", "source", ...], ...], ...]`; sentences are
/// split across the inner arrays.
fn parse_response(body: &Value) -> Result<String, AppError> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::Provider("Google: unexpected response shape".to_string()))?;
    let out: String = sentences
        .iter()
        .filter_map(|s| s.get(0).and_then(Value::as_str))
        .collect();
    if out.trim().is_empty() {
        return Err(AppError::Provider("Google: empty translation".to_string()));
    }
    Ok(out)
}
