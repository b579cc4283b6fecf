//! Per-page model call with retry and exponential backoff.
//!
//! Throttling (429) and 5xx responses are common under concurrent load.
//! The wait before retry `n` is `retry_backoff_ms * 2^(n-1)`, so the default
//! 500 ms base yields 500 ms → 1 s → 2 s. A server-supplied `Retry-After`
//! takes precedence when it is longer, up to [`MAX_RETRY_AFTER_MS`].
//! Authentication failures and rejected requests are returned on the first
//! attempt.

use crate::config::ConversionConfig;
use crate::error::{PageError, PaperShiftError};
use crate::openrouter::VisionModel;
use crate::output::PageResult;
use crate::prompts::system_prompt;
use edgequake_llm::ImageData;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Ceiling on a server-requested `Retry-After` wait.
pub const MAX_RETRY_AFTER_MS: u64 = 60_000;

/// Transcribe one encoded page.
///
/// Never returns an error: failures are recorded in `PageResult::error` so
/// one bad page does not abort the document.
pub async fn process_page<M: VisionModel + ?Sized>(
    model: &M,
    page_num: usize,
    image: &ImageData,
    config: &ConversionConfig,
) -> PageResult {
    let start = Instant::now();
    let prompt = system_prompt(config.fast_mode);
    let mut last_err: Option<String> = None;
    let mut attempts_made = 0u32;

    for attempt in 0..=config.max_retries {
        attempts_made = attempt;
        match model.transcribe(prompt, image).await {
            Ok(reply) => {
                let duration = start.elapsed();
                debug!(
                    "Page {}: {} input tokens, {} output tokens, {:?}",
                    page_num, reply.prompt_tokens, reply.completion_tokens, duration
                );
                return PageResult {
                    page_num,
                    markdown: reply.content,
                    input_tokens: reply.prompt_tokens,
                    output_tokens: reply.completion_tokens,
                    duration_ms: duration.as_millis() as u64,
                    retries: attempt,
                    error: None,
                };
            }
            Err(e) => {
                warn!("Page {}: attempt {} failed: {}", page_num, attempt.saturating_add(1), e);
                let retryable = e.is_retryable();
                let server_delay = match &e {
                    PaperShiftError::RateLimitExceeded {
                        retry_after_secs: Some(secs),
                        ..
                    } => Some(retry_after_ms(*secs)),
                    _ => None,
                };
                last_err = Some(e.to_string());

                if !retryable || attempt == config.max_retries {
                    break;
                }

                let backoff = backoff_ms(config.retry_backoff_ms, attempt.saturating_add(1))
                    .max(server_delay.unwrap_or(0));
                warn!(
                    "Page {}: retry {}/{} after {}ms",
                    page_num,
                    attempt.saturating_add(1),
                    config.max_retries,
                    backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }
        }
    }

    PageResult {
        page_num,
        markdown: String::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        retries: attempts_made,
        error: Some(PageError::LlmFailed {
            page: page_num,
            retries: attempts_made,
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        }),
    }
}

/// Server-requested wait in milliseconds, capped at [`MAX_RETRY_AFTER_MS`].
fn retry_after_ms(secs: u64) -> u64 {
    secs.saturating_mul(1000).min(MAX_RETRY_AFTER_MS)
}

/// Delay before retry number `retry` (1-based).
fn backoff_ms(base_ms: u64, retry: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(retry.saturating_sub(1)))
}
