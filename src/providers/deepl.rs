use async_trait::async_trait;
use serde::Deserialize;

use super::{client, ensure_success, Translator};
use crate::error::AppError;

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

pub struct DeepLTranslator {
    api_key: String,
}

impl DeepLTranslator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }

    /// Free-plan keys end in ":fx" and only work against the free host.
    fn endpoint(&self) -> &'static str {
        if self.api_key.ends_with(":fx") {
            "https://api-free.deepl.com/v2/translate"
        } else {
            "https://api.deepl.com/v2/translate"
        }
    }
}

/// DeepL wants upper-case codes and has no plain "ZH"-with-region form.
fn deepl_target(target: &str) -> String {
    let upper = target.to_ascii_uppercase();
    match upper.as_str() {
        "ZH-CN" => "ZH".to_string(),
        _ => upper,
    }
}

#[async_trait]
impl Translator for DeepLTranslator {
    fn name(&self) -> &'static str {
        "DeepL"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, AppError> {
        let mut params = vec![("text", text.to_string()), ("target_lang", deepl_target(target))];
        if source != "auto" {
            params.push(("source_lang", source.to_ascii_uppercase()));
        }

        let resp = client()
            .post(self.endpoint())
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .form(&params)
            .send()
            .await?;
        let resp = ensure_success("DeepL", resp).await?;

        let parsed: DeepLResponse = resp.json().await?;
        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| AppError::Provider("DeepL: no translation returned".to_string()))
    }
}
