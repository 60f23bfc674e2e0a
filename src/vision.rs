//! Vision-LLM fallback text source (feature `vision`).
//!
//! Scanned pages have no text layer for the extractor to read. This module
//! hands the rasterised page to a vision model and returns its transcript,
//! so a scanned lecture still gets headers and paragraphs instead of a
//! single page of images.
//!
//! ## Why a private runtime?
//!
//! `edgequake-llm` providers are async, the extraction pipeline is not.
//! [`VisionTextSource`] owns a current-thread tokio runtime and blocks on
//! each request, keeping async out of every other module.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient. Exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`): with 500 ms base and 3 retries the
//! wait sequence is 500 ms → 1 s → 2 s.

use crate::error::{ConvertError, PageError};
use crate::pipeline::encode::encode_image_data;
use crate::pipeline::extract::FallbackTextSource;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::DynamicImage;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Model used when none is named.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Settings of the vision fallback.
#[derive(Clone)]
pub struct VisionConfig {
    /// Model name, e.g. `"gpt-4.1-nano"`. Default: provider's choice, or
    /// [`DEFAULT_MODEL`] for named providers.
    pub model: Option<String>,

    /// Provider name (`"openai"`, `"anthropic"`, `"gemini"`, …).
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1; transcription wants determinism.
    pub temperature: f32,

    /// Maximum output tokens per page. Default: 4096.
    pub max_tokens: usize,

    /// Retries per page after the first attempt. Default: 3.
    pub max_retries: u32,

    /// Base delay of the exponential backoff. Default: 500 ms.
    pub retry_backoff_ms: u64,

    /// Replaces [`DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for VisionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

/// [`FallbackTextSource`] that asks a vision LLM to transcribe the page.
pub struct VisionTextSource {
    provider: Arc<dyn LLMProvider>,
    config: VisionConfig,
    name: String,
    runtime: tokio::runtime::Runtime,
}

impl VisionTextSource {
    /// Resolve the provider and start the private runtime.
    ///
    /// # Errors
    ///
    /// [`ConvertError::ProviderNotConfigured`] when no provider can be found.
    pub fn new(config: VisionConfig) -> Result<Self, ConvertError> {
        let provider = resolve_provider(&config)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {e}")))?;
        let name = format!(
            "vision:{}",
            config
                .model
                .as_deref()
                .or(config.provider_name.as_deref())
                .unwrap_or("auto")
        );
        Ok(Self {
            provider,
            config,
            name,
            runtime,
        })
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            ..Default::default()
        }
    }
}

impl fmt::Debug for VisionTextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionTextSource")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FallbackTextSource for VisionTextSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_text(&self, page_num: usize, image: &DynamicImage) -> Result<String, PageError> {
        let image_data = encode_image_data(image).map_err(|e| PageError::RenderFailed {
            page: page_num,
            detail: format!("Image encoding failed: {e}"),
        })?;
        let system_prompt = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user_with_images("", vec![image_data]),
        ];
        let options = self.options();
        let max_retries = self.config.max_retries;

        self.runtime.block_on(async {
            let mut last_err: Option<String> = None;

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    let backoff = self.config.retry_backoff_ms * 2u64.pow(attempt - 1);
                    warn!(
                        "Page {}: retry {}/{} after {}ms",
                        page_num, attempt, max_retries, backoff
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }

                match self.provider.chat(&messages, Some(&options)).await {
                    Ok(response) => {
                        debug!(
                            "Page {}: {} input tokens, {} output tokens",
                            page_num, response.prompt_tokens, response.completion_tokens
                        );
                        return Ok(response.content);
                    }
                    Err(e) => {
                        warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, e);
                        last_err = Some(e.to_string());
                    }
                }
            }

            Err(PageError::FallbackFailed {
                page: page_num,
                retries: max_retries.min(u8::MAX as u32) as u8,
                detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
            })
        })
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ConvertError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ConvertError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **OpenAI** whenever `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
fn resolve_provider(config: &VisionConfig) -> Result<Arc<dyn LLMProvider>, ConvertError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_vision_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ConvertError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = VisionConfig::default();
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.retry_backoff_ms, 500);
    }

    #[test]
    fn debug_hides_provider_and_prompt() {
        let c = VisionConfig {
            system_prompt: Some("secret instructions".into()),
            ..VisionConfig::default()
        };
        let dbg = format!("{c:?}");
        assert!(dbg.contains("<custom>"));
        assert!(!dbg.contains("secret instructions"));
    }
}
