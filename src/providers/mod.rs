use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;
use crate::settings::Settings;

mod deepl;
mod google;
mod openrouter;

pub use deepl::DeepLTranslator;
pub use google::GoogleTranslator;
pub use openrouter::OpenRouterClient;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::error!("failed to build HTTP client with timeout, using defaults: {}", e);
            reqwest::Client::new()
        })
});

pub(crate) fn client() -> reqwest::Client {
    CLIENT.clone()
}

/// Turns a non-2xx response into a [`AppError::Provider`] carrying the body.
pub(crate) async fn ensure_success(provider: &str, resp: reqwest::Response) -> Result<reqwest::Response, AppError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    Err(AppError::Provider(format!("{} error {}: {}", provider, status, text)))
}

#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;

    /// `source` is a language code or `"auto"`.
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, AppError>;
}

/// Chat-completion style text generation.
#[async_trait]
pub trait TextImprover: Send + Sync {
    async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String, AppError>;
}

/// Tries `primary`, and on a network/provider failure retries on `secondary`.
/// Configuration errors pass straight through.
pub struct FallbackTranslator {
    primary: Arc<dyn Translator>,
    secondary: Arc<dyn Translator>,
}

impl FallbackTranslator {
    pub fn new(primary: Arc<dyn Translator>, secondary: Arc<dyn Translator>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Translator for FallbackTranslator {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, AppError> {
        match self.primary.translate(text, source, target).await {
            Err(e) if e.is_provider_failure() => {
                tracing::warn!(
                    "{} failed ({}), falling back to {}",
                    self.primary.name(),
                    e,
                    self.secondary.name()
                );
                self.secondary.translate(text, source, target).await
            }
            other => other,
        }
    }
}

/// Builds providers from the current settings. The controller asks again
/// for every request so key changes apply without a restart.
pub trait ProviderFactory {
    fn translator(&self, settings: &Settings) -> Result<Arc<dyn Translator>, AppError>;
    fn improver(&self, settings: &Settings) -> Result<Arc<dyn TextImprover>, AppError>;
}

#[derive(Debug, Default)]
pub struct HttpProviders;

impl ProviderFactory for HttpProviders {
    fn translator(&self, settings: &Settings) -> Result<Arc<dyn Translator>, AppError> {
        if !settings.use_deepl {
            return Ok(Arc::new(GoogleTranslator::new()));
        }
        let key = settings.deepl_api_key.trim();
        if key.is_empty() {
            return Err(AppError::Configuration(
                "DeepL is enabled but no DeepL API key is set. Please add it in settings.".to_string(),
            ));
        }
        let deepl: Arc<dyn Translator> = Arc::new(DeepLTranslator::new(key));
        if settings.deepl_fallback {
            Ok(Arc::new(FallbackTranslator::new(deepl, Arc::new(GoogleTranslator::new()))))
        } else {
            Ok(deepl)
        }
    }

    fn improver(&self, settings: &Settings) -> Result<Arc<dyn TextImprover>, AppError> {
        let key = settings.openrouter_api_key.trim();
        if key.is_empty() {
            return Err(AppError::Configuration(
                "OpenRouter API key is not set. Please add it in settings.".to_string(),
            ));
        }
        Ok(Arc::new(OpenRouterClient::new(key)))
    }
}
