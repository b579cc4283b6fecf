//! End-to-end tests against real PDFs and the live OpenRouter API.
//!
//! Gated behind `E2E_ENABLED` (plus `OPENROUTER_API_KEY`) so they never run
//! in CI by accident. PDFs live in `./test_cases/`.
//!
//! Run with:
//!   E2E_ENABLED=1 LD_LIBRARY_PATH=. cargo test --test e2e -- --nocapture

use papershift::app::{self, Environment, Invocation};
use papershift::{
    openrouter_provider, ApiKey, ConversionConfig, ConversionRequest, MarkdownConverter,
    OpenRouterConverter, PaperShiftError, ProviderModel, VisionConverter,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip unless E2E_ENABLED and a key are set and the PDF exists.
/// Evaluates to `(path, key)`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let Some(key) = std::env::var("OPENROUTER_API_KEY").ok().and_then(ApiKey::new) else {
            println!("SKIP — OPENROUTER_API_KEY is not set");
            return;
        };
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        (p, key)
    }};
}

fn assert_markdown_quality(md: &str, context: &str) {
    assert!(!md.trim().is_empty(), "[{context}] Markdown is empty");
    assert!(md.ends_with('\n'), "[{context}] Markdown must end with a newline");

    let first_line = md.lines().next().unwrap_or("");
    assert!(
        !first_line.starts_with("```"),
        "[{context}] Output must not start with a code fence, got: {first_line:?}"
    );
    assert!(
        !md.contains("\n\n\n"),
        "[{context}] Output has runs of blank lines"
    );
    for ch in ['\u{200B}', '\u{FEFF}', '\u{200C}', '\u{200D}', '\u{2060}'] {
        assert!(
            !md.contains(ch),
            "[{context}] Output contains invisible char U+{:04X}",
            ch as u32
        );
    }

    println!("[{context}] ✓  {} bytes, quality checks passed", md.len());
}

// ── Library ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_convert_document_reports_every_page() {
    let (path, key) = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let config = ConversionConfig::builder()
        .batch_size(2)
        .max_retries(2)
        .build()
        .expect("valid config");
    let model = ProviderModel::new(openrouter_provider(&key, &config), &config);

    let output = VisionConverter::new(model)
        .convert_document(&path, &config)
        .await
        .expect("conversion should succeed");

    assert_eq!(output.pages.len(), output.stats.total_pages);
    assert_eq!(
        output.stats.processed_pages + output.stats.failed_pages,
        output.stats.total_pages
    );
    assert!(output.stats.total_input_tokens > 0, "Should have consumed tokens");
    assert!(output.pages.windows(2).all(|w| w[0].page_num < w[1].page_num));
    assert_markdown_quality(&output.markdown, "sample");
}

#[tokio::test]
async fn test_fast_mode_converts() {
    let (path, key) = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let config = ConversionConfig::builder()
        .fast_mode(true)
        .build()
        .expect("valid config");
    let request = ConversionRequest::new(&path, key).with_config(config);

    let markdown = OpenRouterConverter
        .convert(&request)
        .await
        .expect("fast conversion should succeed");
    assert_markdown_quality(&markdown, "sample_fast");
}

#[tokio::test]
async fn test_bad_key_is_an_auth_error() {
    let (path, _) = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let config = ConversionConfig::builder()
        .batch_size(1)
        .max_retries(0)
        .build()
        .expect("valid config");
    let request = ConversionRequest::new(&path, ApiKey::new("sk-or-invalid").expect("non-empty"))
        .with_config(config);

    let err = OpenRouterConverter.convert(&request).await.unwrap_err();
    assert!(
        matches!(err, PaperShiftError::AllPagesFailed { .. }),
        "got {err:?}"
    );
}

// ── Full run ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_run_writes_markdown_file() {
    let (path, key) = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let out_dir = tempfile::tempdir().unwrap();

    let env = Environment {
        api_key: Some(key.expose().to_string()),
        current_dir: out_dir.path().to_path_buf(),
    };
    let mut inv = Invocation::new(&path);
    inv.output_dir = Some(out_dir.path().join("converted"));

    let written = app::run(inv, &env, &OpenRouterConverter)
        .await
        .expect("run should succeed");

    assert_eq!(written, out_dir.path().join("converted/sample.md"));
    let md = std::fs::read_to_string(&written).unwrap();
    assert_markdown_quality(&md, "run");
}
