//! # papershift
//!
//! Convert PDF documents to Markdown with vision-language models hosted on
//! OpenRouter.
//!
//! Each page is rasterised with pdfium and sent to the model as an image;
//! the model answers with Markdown for that page. Pages are rendered in
//! batches and transcribed concurrently within a batch.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input   check the file exists and starts with %PDF
//!  ├─ 2. Render  rasterise a batch of pages via pdfium (spawn_blocking)
//!  ├─ 3. Encode  PNG (or JPEG in fast mode) → base64
//!  ├─ 4. VLM     up to `max_workers` concurrent OpenRouter calls
//!  ├─ 5. Polish  strip fences, normalise whitespace, drop fake image links
//!  └─ 6. Output  pages joined in order
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use papershift::{convert_pdf_to_markdown, ApiKey, ConversionConfig, ConversionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = ApiKey::new(std::env::var("OPENROUTER_API_KEY")?).expect("non-empty key");
//!     let config = ConversionConfig::builder().max_workers(8).build()?;
//!     let request = ConversionRequest::new("document.pdf", key).with_config(config);
//!     println!("{}", convert_pdf_to_markdown(&request).await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Binaries
//!
//! | Binary       | Surface |
//! |--------------|---------|
//! | `papershift` | full flag set: output path/dir, DPI, target height, model, key, workers, batch size, fast mode |
//! | `pdf-to-md`  | `pdf-to-md <pdf_path> [output_path]`, key from `OPENROUTER_API_KEY` |
//!
//! Both drive [`app::run`]. Disable the `cli` feature to use only the
//! library.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod app;
pub mod config;
pub mod convert;
pub mod error;
pub mod openrouter;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use app::{Environment, Invocation, PreparedConversion};
pub use config::{ApiKey, ConversionConfig, ConversionConfigBuilder, ConversionRequest};
pub use convert::{convert_pdf_to_markdown, MarkdownConverter, OpenRouterConverter, VisionConverter};
pub use error::{PageError, PaperShiftError};
pub use openrouter::{openrouter_provider, ProviderModel, VisionModel, VisionReply};
pub use output::{ConversionOutput, ConversionStats, PageResult};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
