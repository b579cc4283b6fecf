//! Configuration types for PDF-to-Markdown conversion.
//!
//! Tuning knobs live in [`ConversionConfig`], built through
//! [`ConversionConfigBuilder`]. The per-run bundle handed to a converter is
//! [`ConversionRequest`]: the input path, the optional output directory, the
//! credential and a config.

use crate::error::PaperShiftError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default rendering DPI.
pub const DEFAULT_DPI: u32 = 300;

/// Default cap on the rendered page height, in pixels.
pub const DEFAULT_TARGET_HEIGHT_PX: u32 = 2048;

/// Default vision model. The `openrouter/` prefix is a routing hint and is
/// stripped before the request goes out.
pub const DEFAULT_MODEL: &str = "openrouter/google/gemini-2.0-flash-001";

/// Default number of concurrent model calls.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Default number of pages rendered per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default OpenRouter API root.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// DPI ceiling applied in fast mode.
pub const FAST_MODE_MAX_DPI: u32 = 150;

/// Upper bound accepted for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Configuration for a PDF-to-Markdown conversion.
///
/// # Example
/// ```rust
/// use papershift::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .dpi(200)
///     .max_workers(8)
///     .fast_mode(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.effective_dpi(), 150);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// Maximum rendered page height in pixels. Default: 2048.
    ///
    /// Pages taller than this at the requested DPI are scaled down
    /// proportionally, which keeps image uploads within provider limits.
    pub target_height_px: u32,

    /// Vision model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Concurrent model calls within a batch. Default: 4.
    pub max_workers: usize,

    /// Pages rendered and dispatched together. Default: 5.
    ///
    /// Only one batch of decoded page images is held in memory at a time.
    pub batch_size: usize,

    /// Trade fidelity for speed: compact prompt, JPEG images and DPI capped
    /// at [`FAST_MODE_MAX_DPI`]. Default: false.
    pub fast_mode: bool,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per page. Default: 4096.
    pub max_tokens: usize,

    /// Retry attempts per page on a transient model failure. Range:
    /// 0–[`MAX_RETRIES_LIMIT`]. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-request model timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// OpenRouter API root. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Explicit pdfium shared library. If None, the system library is used.
    pub pdfium_library: Option<PathBuf>,

    /// Pre-built LLM provider. When set, converters use it as-is and the
    /// request's API key is not consulted.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            target_height_px: DEFAULT_TARGET_HEIGHT_PX,
            model: DEFAULT_MODEL.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            fast_mode: false,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            base_url: DEFAULT_BASE_URL.to_string(),
            pdfium_library: None,
            provider: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("target_height_px", &self.target_height_px)
            .field("model", &self.model)
            .field("max_workers", &self.max_workers)
            .field("batch_size", &self.batch_size)
            .field("fast_mode", &self.fast_mode)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("base_url", &self.base_url)
            .field("pdfium_library", &self.pdfium_library)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// DPI actually used for rendering, after the fast-mode cap.
    pub fn effective_dpi(&self) -> u32 {
        if self.fast_mode {
            self.dpi.min(FAST_MODE_MAX_DPI)
        } else {
            self.dpi
        }
    }

    /// Model id as OpenRouter expects it, without the `openrouter/` prefix.
    pub fn api_model(&self) -> &str {
        self.model
            .strip_prefix("openrouter/")
            .unwrap_or(&self.model)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn target_height_px(mut self, px: u32) -> Self {
        self.config.target_height_px = px;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = n;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.batch_size = n;
        self
    }

    pub fn fast_mode(mut self, v: bool) -> Self {
        self.config.fast_mode = v;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, PaperShiftError> {
        let c = &self.config;
        if !(72..=600).contains(&c.dpi) {
            return Err(PaperShiftError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.target_height_px < 100 {
            return Err(PaperShiftError::InvalidConfig(format!(
                "Target height must be ≥ 100 px, got {}",
                c.target_height_px
            )));
        }
        if c.max_workers == 0 {
            return Err(PaperShiftError::InvalidConfig(
                "Max workers must be ≥ 1".into(),
            ));
        }
        if c.batch_size == 0 {
            return Err(PaperShiftError::InvalidConfig(
                "Batch size must be ≥ 1".into(),
            ));
        }
        if c.max_retries > MAX_RETRIES_LIMIT {
            return Err(PaperShiftError::InvalidConfig(format!(
                "Max retries must be ≤ {MAX_RETRIES_LIMIT}, got {}",
                c.max_retries
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(PaperShiftError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(PaperShiftError::InvalidConfig(
                "Model must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Credential ───────────────────────────────────────────────────────────

/// An OpenRouter API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key; blank strings are treated as absent.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

// ── Request ──────────────────────────────────────────────────────────────

/// Everything a [`crate::convert::MarkdownConverter`] needs for one document.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub pdf_path: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub api_key: ApiKey,
    pub config: ConversionConfig,
}

impl ConversionRequest {
    pub fn new(pdf_path: impl Into<PathBuf>, api_key: ApiKey) -> Self {
        Self {
            pdf_path: pdf_path.into(),
            output_dir: None,
            api_key,
            config: ConversionConfig::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_config(mut self, config: ConversionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn pdf_path(&self) -> &Path {
        &self.pdf_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.target_height_px, 2048);
        assert_eq!(c.max_workers, 4);
        assert_eq!(c.batch_size, 5);
        assert!(!c.fast_mode);
        assert_eq!(c.model, "openrouter/google/gemini-2.0-flash-001");
    }

    #[test]
    fn builder_rejects_zero_workers() {
        let err = ConversionConfig::builder().max_workers(0).build().unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn builder_rejects_zero_batch() {
        assert!(ConversionConfig::builder().batch_size(0).build().is_err());
    }

    #[test]
    fn builder_rejects_out_of_range_dpi() {
        assert!(ConversionConfig::builder().dpi(10).build().is_err());
        assert!(ConversionConfig::builder().dpi(1200).build().is_err());
        assert!(ConversionConfig::builder().dpi(72).build().is_ok());
    }

    #[test]
    fn builder_rejects_tiny_target_height() {
        assert!(ConversionConfig::builder()
            .target_height_px(50)
            .build()
            .is_err());
    }

    #[test]
    fn builder_bounds_retries_and_timeout() {
        assert!(ConversionConfig::builder().max_retries(10).build().is_ok());
        assert!(ConversionConfig::builder().max_retries(300).build().is_err());
        assert!(ConversionConfig::builder().api_timeout_secs(0).build().is_err());
    }

    #[test]
    fn debug_hides_provider() {
        let c = ConversionConfig::builder()
            .provider(Arc::new(edgequake_llm::MockProvider::new()))
            .build()
            .unwrap();
        assert!(format!("{c:?}").contains("<dyn LLMProvider>"));
    }

    #[test]
    fn builder_rejects_blank_model() {
        assert!(ConversionConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn fast_mode_caps_dpi() {
        let c = ConversionConfig::builder().fast_mode(true).build().unwrap();
        assert_eq!(c.effective_dpi(), FAST_MODE_MAX_DPI);

        let c = ConversionConfig::builder()
            .dpi(100)
            .fast_mode(true)
            .build()
            .unwrap();
        assert_eq!(c.effective_dpi(), 100);
    }

    #[test]
    fn api_model_strips_routing_prefix() {
        let c = ConversionConfig::default();
        assert_eq!(c.api_model(), "google/gemini-2.0-flash-001");

        let c = ConversionConfig::builder()
            .model("anthropic/claude-3.5-sonnet")
            .build()
            .unwrap();
        assert_eq!(c.api_model(), "anthropic/claude-3.5-sonnet");
    }

    #[test]
    fn api_key_rejects_blank() {
        assert!(ApiKey::new("").is_none());
        assert!(ApiKey::new("   ").is_none());
        assert_eq!(ApiKey::new("sk-or-1").unwrap().expose(), "sk-or-1");
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-or-secret").unwrap();
        assert!(!format!("{key:?}").contains("secret"));
    }
}
