//! Result types produced by [`crate::convert::VisionConverter`].

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// Outcome of converting one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Cleaned Markdown; empty when `error` is set.
    pub markdown: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Retries spent before the final attempt.
    pub retries: u32,
    pub error: Option<PageError>,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counters for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    pub batches: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// Full result of a document conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Assembled Markdown of every successful page, in page order.
    pub markdown: String,
    /// Per-page results sorted by page number.
    pub pages: Vec<PageResult>,
    pub stats: ConversionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_page_serialises_its_error() {
        let page = PageResult {
            page_num: 4,
            markdown: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 12,
            retries: 2,
            error: Some(PageError::LlmFailed {
                page: 4,
                retries: 2,
                detail: "HTTP 502".into(),
            }),
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["page_num"], 4);
        assert_eq!(json["error"]["LlmFailed"]["detail"], "HTTP 502");

        let back: PageResult = serde_json::from_value(json).unwrap();
        assert!(!back.is_success());
    }
}
