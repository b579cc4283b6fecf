//! Vision-model access through `edgequake_llm`.
//!
//! The pipeline only sees [`VisionModel`]. [`ProviderModel`] adapts any
//! `LLMProvider` to it (system prompt + one page image per call), and
//! [`openrouter_provider`] builds the OpenRouter provider keyed with the
//! caller's credential rather than whatever the environment holds.

use crate::config::{ApiKey, ConversionConfig};
use crate::error::PaperShiftError;
use async_trait::async_trait;
use edgequake_llm::{
    ChatMessage, CompletionOptions, ImageData, LLMProvider, LlmError, OpenRouterProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// User turn sent alongside each page image.
const PAGE_INSTRUCTION: &str = "Convert this page to Markdown.";

/// One model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionReply {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Anything that can turn a page image into Markdown text.
///
/// [`ProviderModel`] is the production implementation; tests substitute
/// scripted models.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn transcribe(
        &self,
        system_prompt: &str,
        image: &ImageData,
    ) -> Result<VisionReply, PaperShiftError>;
}

/// OpenRouter provider for `config.api_model()`, authenticated with
/// `api_key`.
pub fn openrouter_provider(api_key: &ApiKey, config: &ConversionConfig) -> Arc<dyn LLMProvider> {
    let provider = OpenRouterProvider::new(api_key.expose())
        .with_model(config.api_model())
        .with_base_url(config.base_url.trim_end_matches('/'))
        .with_max_tokens(u32::try_from(config.max_tokens).unwrap_or(u32::MAX));
    Arc::new(provider)
}

/// [`VisionModel`] over an `edgequake_llm` provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ConversionConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.provider
    }
}

#[async_trait]
impl VisionModel for ProviderModel {
    async fn transcribe(
        &self,
        system_prompt: &str,
        image: &ImageData,
    ) -> Result<VisionReply, PaperShiftError> {
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user_with_images(PAGE_INSTRUCTION, vec![image.clone()]),
        ];

        let response = tokio::time::timeout(
            self.timeout,
            self.provider.chat(&messages, Some(&self.options)),
        )
        .await
        .map_err(|_| PaperShiftError::LlmApiError {
            message: format!("request timed out after {:?}", self.timeout),
        })?
        .map_err(|e| map_llm_error(&e, self.provider.model()))?;

        debug!(
            "{} reply: {} prompt tokens, {} completion tokens",
            self.provider.name(),
            response.prompt_tokens,
            response.completion_tokens
        );

        Ok(VisionReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
        })
    }
}

/// Build `CompletionOptions` from the conversion config.
fn build_options(config: &ConversionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Sort provider errors into what the page retry loop can act on.
pub(crate) fn map_llm_error(err: &LlmError, model: &str) -> PaperShiftError {
    match err {
        LlmError::AuthError(detail) => PaperShiftError::AuthError {
            detail: detail.clone(),
        },
        LlmError::RateLimited(_) => PaperShiftError::RateLimitExceeded {
            model: model.to_string(),
            retry_after_secs: None,
        },
        LlmError::InvalidRequest(_)
        | LlmError::ModelNotFound(_)
        | LlmError::ConfigError(_)
        | LlmError::NotSupported(_)
        | LlmError::TokenLimitExceeded { .. } => PaperShiftError::ModelRejected {
            message: err.to_string(),
        },
        _ => PaperShiftError::LlmApiError {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::{LLMResponse, MockProvider};

    fn image() -> ImageData {
        ImageData::new("AAAA", "image/png").with_detail("high")
    }

    /// Provider that waits, then answers with a fixed outcome.
    struct StubProvider {
        delay: Duration,
        outcome: fn() -> edgequake_llm::Result<LLMResponse>,
    }

    #[async_trait]
    impl LLMProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub/model"
        }

        fn max_context_length(&self) -> usize {
            8192
        }

        async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            tokio::time::sleep(self.delay).await;
            (self.outcome)()
        }

        async fn complete_with_options(
            &self,
            prompt: &str,
            _options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.complete(prompt).await
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.complete("").await
        }
    }

    fn stub_model(delay: Duration, outcome: fn() -> edgequake_llm::Result<LLMResponse>) -> ProviderModel {
        ProviderModel {
            provider: Arc::new(StubProvider { delay, outcome }),
            options: build_options(&ConversionConfig::default()),
            timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&ConversionConfig::default());
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn openrouter_provider_uses_api_model() {
        let key = ApiKey::new("sk-or-test").unwrap();
        let provider = openrouter_provider(&key, &ConversionConfig::default());
        assert_eq!(provider.name(), "openrouter");
        assert_eq!(provider.model(), "google/gemini-2.0-flash-001");
    }

    #[tokio::test]
    async fn reply_carries_provider_content() {
        let mock = MockProvider::new();
        mock.add_response("# Scanned page").await;
        let model = ProviderModel::new(Arc::new(mock), &ConversionConfig::default());

        let reply = model.transcribe("be precise", &image()).await.unwrap();
        assert_eq!(reply.content, "# Scanned page");
    }

    #[tokio::test]
    async fn provider_auth_failure_is_not_retryable() {
        let model = stub_model(Duration::ZERO, || {
            Err(LlmError::AuthError("No auth credentials found".into()))
        });
        let err = model.transcribe("p", &image()).await.unwrap_err();
        assert!(matches!(err, PaperShiftError::AuthError { ref detail } if detail == "No auth credentials found"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let model = stub_model(Duration::from_secs(5), || Ok(LLMResponse::new("late", "stub/model")));
        let err = model.transcribe("p", &image()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "got: {err}");
        assert!(err.is_retryable());
    }

    #[test]
    fn throttling_maps_to_rate_limit() {
        match map_llm_error(&LlmError::RateLimited("slow down".into()), "m/x") {
            PaperShiftError::RateLimitExceeded { model, .. } => assert_eq!(model, "m/x"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn unknown_model_is_rejected() {
        let e = map_llm_error(&LlmError::ModelNotFound("nope/nope".into()), "nope/nope");
        assert!(matches!(e, PaperShiftError::ModelRejected { .. }));
        assert!(!e.is_retryable());
    }

    #[test]
    fn server_and_network_errors_are_retryable() {
        let e = map_llm_error(&LlmError::ApiError("502 Bad Gateway: upstream".into()), "m");
        assert!(e.to_string().contains("502"));
        assert!(e.is_retryable());
        assert!(map_llm_error(&LlmError::NetworkError("reset".into()), "m").is_retryable());
    }
}
