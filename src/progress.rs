//! Progress events emitted by [`crate::convert::VisionConverter`].
//!
//! Attach an [`Arc<dyn ConversionProgressCallback>`] through
//! [`crate::config::ConversionConfigBuilder::progress_callback`]. The full
//! CLI uses this to drive its terminal progress bar.
//!
//! Pages inside one batch are sent to the model concurrently, so page events
//! can arrive out of order and from different threads.

use std::sync::Arc;

/// Receives conversion events. Every method defaults to a no-op.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after the page count is known and before rendering.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a batch is rendered. `batch` is 1-indexed.
    fn on_batch_start(&self, batch: usize, total_batches: usize, pages_in_batch: usize) {
        let _ = (batch, total_batches, pages_in_batch);
    }

    /// Called just before the model request for a page (1-indexed).
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page converted; `markdown_len` is in bytes.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, markdown_len: usize) {
        let _ = (page_num, total_pages, markdown_len);
    }

    /// Called when a page failed after all retries.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page was attempted.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }

    /// Called instead of `on_conversion_complete` when the document fails
    /// after `on_conversion_start` (e.g. a page would not render).
    fn on_conversion_aborted(&self, error: &str) {
        let _ = error;
    }
}

/// Callback that ignores every event.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// The shared callback type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_callback_accepts_every_event() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(7);
        cb.on_batch_start(1, 2, 5);
        cb.on_page_start(1, 7);
        cb.on_page_complete(1, 7, 120);
        cb.on_page_error(2, 7, "HTTP 500");
        cb.on_conversion_complete(7, 6);
        cb.on_conversion_aborted("render failed");
    }
}
