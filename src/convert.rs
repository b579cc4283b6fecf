//! The conversion seam and the bundled vision-model converter.
//!
//! The CLIs only know [`MarkdownConverter`]: hand it a
//! [`ConversionRequest`], get Markdown back or an error. [`VisionConverter`]
//! is the implementation shipped with the crate:
//!
//! ```text
//! validate ──▶ page count ──▶ for each batch:
//!                               render ──▶ encode ──▶ model (≤ max_workers) ──▶ clean
//!                             ──▶ assemble in page order
//! ```

use crate::config::{ConversionConfig, ConversionRequest};
use crate::error::{PageError, PaperShiftError};
use crate::openrouter::{openrouter_provider, ProviderModel, VisionModel};
use crate::output::{ConversionOutput, ConversionStats, PageResult};
use crate::pipeline::{encode, input, llm, postprocess, render};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns a PDF into Markdown.
#[async_trait]
pub trait MarkdownConverter: Send + Sync {
    async fn convert(&self, request: &ConversionRequest) -> Result<String, PaperShiftError>;
}

/// Convert with the bundled [`VisionConverter`] talking to OpenRouter.
///
/// ```rust,no_run
/// use papershift::{convert_pdf_to_markdown, ApiKey, ConversionRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key = ApiKey::new(std::env::var("OPENROUTER_API_KEY")?).expect("non-empty key");
/// let markdown = convert_pdf_to_markdown(&ConversionRequest::new("paper.pdf", key)).await?;
/// println!("{markdown}");
/// # Ok(())
/// # }
/// ```
pub async fn convert_pdf_to_markdown(request: &ConversionRequest) -> Result<String, PaperShiftError> {
    OpenRouterConverter.convert(request).await
}

/// [`MarkdownConverter`] over `config.provider` when one is set, otherwise
/// an OpenRouter provider keyed with the request's credential.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenRouterConverter;

#[async_trait]
impl MarkdownConverter for OpenRouterConverter {
    async fn convert(&self, request: &ConversionRequest) -> Result<String, PaperShiftError> {
        if let Some(ref dir) = request.output_dir {
            debug!("Output directory for this run: {}", dir.display());
        }
        let provider = match request.config.provider {
            Some(ref provider) => Arc::clone(provider),
            None => openrouter_provider(&request.api_key, &request.config),
        };
        debug!("Using {} provider, model {}", provider.name(), provider.model());
        let model = ProviderModel::new(provider, &request.config);
        VisionConverter::new(model).convert(request).await
    }
}

/// Renders pages with pdfium and transcribes them with a [`VisionModel`].
pub struct VisionConverter<M> {
    model: Arc<M>,
}

impl<M: VisionModel + 'static> VisionConverter<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Arc::new(model),
        }
    }

    /// Convert a whole document, returning per-page detail and stats.
    ///
    /// Pages that fail after retries are left out of the Markdown and
    /// reported in `pages`; the call fails only if no page succeeds.
    pub async fn convert_document(
        &self,
        pdf_path: &Path,
        config: &ConversionConfig,
    ) -> Result<ConversionOutput, PaperShiftError> {
        let total_start = Instant::now();
        info!("Starting conversion: {}", pdf_path.display());

        input::validate_pdf(pdf_path)?;

        let total_pages = render::page_count(pdf_path, config).await?;
        if total_pages == 0 {
            return Err(PaperShiftError::EmptyDocument {
                path: pdf_path.to_path_buf(),
            });
        }

        let batches = batch_indices(total_pages, config.batch_size);
        info!(
            "{} pages in {} batches of up to {}",
            total_pages,
            batches.len(),
            config.batch_size
        );

        if let Some(ref cb) = config.progress_callback {
            cb.on_conversion_start(total_pages);
        }

        let mut pages: Vec<PageResult> = Vec::with_capacity(total_pages);
        for (n, batch) in batches.iter().enumerate() {
            if let Some(ref cb) = config.progress_callback {
                cb.on_batch_start(n + 1, batches.len(), batch.len());
            }
            debug!("Batch {}/{}: pages {:?}", n + 1, batches.len(), batch);

            let rendered = render::render_batch(pdf_path, config, batch)
                .await
                .map_err(|e| abort(config, e))?;
            let results = self.process_batch(rendered, total_pages, config).await;
            pages.extend(results);
        }

        let output = summarise(pages, total_pages, batches.len(), config, total_start)?;
        info!(
            "Conversion complete: {}/{} pages, {}ms total",
            output.stats.processed_pages, total_pages, output.stats.total_duration_ms
        );
        Ok(output)
    }

    /// Encode and transcribe one rendered batch, at most `max_workers`
    /// model calls in flight.
    async fn process_batch(
        &self,
        rendered: Vec<(usize, image::DynamicImage)>,
        total_pages: usize,
        config: &ConversionConfig,
    ) -> Vec<PageResult> {
        stream::iter(rendered.into_iter().map(|(idx, img)| {
            let model = Arc::clone(&self.model);
            async move {
                let page_num = idx + 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_page_start(page_num, total_pages);
                }

                let encoded = encode::encode_page(&img, config.fast_mode);
                drop(img);

                let mut result = match encoded {
                    Ok(encoded) => llm::process_page(model.as_ref(), page_num, &encoded, config).await,
                    Err(e) => encode_failure(page_num, &e),
                };

                match result.error {
                    None => {
                        result.markdown = postprocess::clean_markdown(&result.markdown);
                        if let Some(ref cb) = config.progress_callback {
                            cb.on_page_complete(page_num, total_pages, result.markdown.len());
                        }
                    }
                    Some(ref e) => {
                        warn!("Skipping page {}: {}", page_num, e);
                        if let Some(ref cb) = config.progress_callback {
                            cb.on_page_error(page_num, total_pages, &e.to_string());
                        }
                    }
                }
                result
            }
        }))
        .buffer_unordered(config.max_workers)
        .collect()
        .await
    }
}

#[async_trait]
impl<M: VisionModel + 'static> MarkdownConverter for VisionConverter<M> {
    async fn convert(&self, request: &ConversionRequest) -> Result<String, PaperShiftError> {
        let output = self
            .convert_document(request.pdf_path(), &request.config)
            .await?;
        Ok(output.markdown)
    }
}

/// Report an abort to the progress callback and hand the error back.
fn abort(config: &ConversionConfig, err: PaperShiftError) -> PaperShiftError {
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_aborted(&err.to_string());
    }
    err
}

/// Order page results, report completion, and build the document output.
///
/// Fails with `AllPagesFailed` when no page succeeded.
fn summarise(
    mut pages: Vec<PageResult>,
    total_pages: usize,
    batches: usize,
    config: &ConversionConfig,
    started: Instant,
) -> Result<ConversionOutput, PaperShiftError> {
    pages.sort_by_key(|p| p.page_num);

    let processed = pages.iter().filter(|p| p.is_success()).count();
    let failed = pages.len() - processed;

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(total_pages, processed);
    }

    if processed == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(PaperShiftError::AllPagesFailed {
            total: pages.len(),
            retries: config.max_retries,
            first_error,
        });
    }

    let stats = ConversionStats {
        total_pages,
        processed_pages: processed,
        failed_pages: failed,
        batches,
        total_input_tokens: pages.iter().map(|p| p.input_tokens as u64).sum(),
        total_output_tokens: pages.iter().map(|p| p.output_tokens as u64).sum(),
        total_duration_ms: started.elapsed().as_millis() as u64,
    };

    Ok(ConversionOutput {
        markdown: assemble_markdown(&pages),
        pages,
        stats,
    })
}

fn encode_failure(page_num: usize, e: &image::ImageError) -> PageResult {
    PageResult {
        page_num,
        markdown: String::new(),
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: 0,
        retries: 0,
        error: Some(PageError::EncodeFailed {
            page: page_num,
            detail: e.to_string(),
        }),
    }
}

/// Split `0..total_pages` into consecutive chunks of `batch_size`.
pub fn batch_indices(total_pages: usize, batch_size: usize) -> Vec<Vec<usize>> {
    let indices: Vec<usize> = (0..total_pages).collect();
    indices
        .chunks(batch_size.max(1))
        .map(<[usize]>::to_vec)
        .collect()
}

/// Join successful pages with one blank line, in page order.
fn assemble_markdown(pages: &[PageResult]) -> String {
    pages
        .iter()
        .filter(|p| p.is_success() && !p.markdown.trim().is_empty())
        .map(|p| p.markdown.trim_end())
        .collect::<Vec<_>>()
        .join("\n\n")
        + "\n"
}
