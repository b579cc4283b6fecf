//! Full command-line front end (`papershift`).
//!
//! Maps flags to an [`Invocation`], then drives the shared
//! [`papershift::app`] run with the OpenRouter converter.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use papershift::app::{self, Environment, Invocation};
use papershift::config::{
    DEFAULT_BASE_URL, DEFAULT_BATCH_SIZE, DEFAULT_DPI, DEFAULT_MAX_WORKERS, DEFAULT_MODEL,
    DEFAULT_TARGET_HEIGHT_PX,
};
use papershift::{ConversionConfig, ConversionProgressCallback, OpenRouterConverter, ProgressCallback};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Progress bar ─────────────────────────────────────────────────────────────

/// Live progress bar with one log line per page. Pages inside a batch
/// finish out of order, so start times are tracked per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Hidden until `on_conversion_start` reports the page count, so
    /// validation errors print on a clean terminal.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::hidden();
        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_batch_start(&self, batch: usize, total_batches: usize, _pages_in_batch: usize) {
        self.bar.set_message(format!("batch {batch}/{total_batches}"));
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, markdown_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{markdown_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} pages converted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages converted  ({} failed)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }

    fn on_conversion_aborted(&self, _error: &str) {
        self.bar.finish_and_clear();
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert next to the current directory (paper.md)
  papershift paper.pdf

  # Explicit output file
  papershift paper.pdf -o notes/paper.md

  # Derived name inside a directory (created if missing)
  papershift paper.pdf -d converted/

  # Cheaper and quicker
  papershift --fast --max-workers 8 scan.pdf

  # Another OpenRouter model
  papershift --model anthropic/claude-3.5-sonnet report.pdf

ENVIRONMENT VARIABLES:
  OPENROUTER_API_KEY   API key used when --api-key is not given
  OPENROUTER_BASE_URL  Override the API root (same as --base-url)
  PDFIUM_LIB_PATH      Path to libpdfium (same as --pdfium-lib)
  RUST_LOG             Log filter, e.g. RUST_LOG=papershift=debug

EXIT STATUS:
  0 on success, 1 on any error.
"#;

/// Convert PDF documents to Markdown using OpenRouter vision models.
#[derive(Parser, Debug)]
#[command(
    name = "papershift",
    version,
    about = "Convert PDF documents to Markdown using OpenRouter vision models",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the PDF file to convert.
    pdf_path: PathBuf,

    /// Output file path (default: PDF name with .md extension).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Directory for the output file (default: current directory).
    #[arg(short = 'd', long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// DPI for PDF rendering.
    #[arg(long, default_value_t = DEFAULT_DPI,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Target height in pixels for rendered page images.
    #[arg(long = "target-height", default_value_t = DEFAULT_TARGET_HEIGHT_PX)]
    target_height: u32,

    /// Model to use for conversion.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenRouter API key (falls back to OPENROUTER_API_KEY).
    #[arg(long = "api-key")]
    api_key: Option<String>,

    /// Maximum number of concurrent model calls.
    #[arg(long = "max-workers", default_value_t = DEFAULT_MAX_WORKERS)]
    max_workers: usize,

    /// Number of pages rendered per batch.
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Enable fast mode for quicker processing.
    #[arg(long = "fast")]
    fast: bool,

    /// Retries per page on a transient model failure.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: u32,

    /// Per-request model timeout in seconds.
    #[arg(long, default_value_t = 120)]
    api_timeout: u64,

    /// OpenRouter API root.
    #[arg(long, env = "OPENROUTER_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Path to the pdfium shared library (default: system library).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level logs.
    #[arg(short, long)]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let env = match Environment::from_process() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let invocation = match build_invocation(&cli, progress) {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    // ── validate_input → resolve_output_path ─────────────────────────────
    let prepared = match app::prepare(invocation, &env) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // ── convert → write_output ───────────────────────────────────────────
    if !cli.quiet {
        println!("Converting {} to markdown...", cli.pdf_path.display());
    }

    match app::execute(&prepared, &OpenRouterConverter).await {
        Ok(path) => {
            if !cli.quiet {
                println!("Conversion complete! Markdown saved to: {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error during conversion: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Map CLI flags to an [`Invocation`].
fn build_invocation(cli: &Cli, progress: Option<ProgressCallback>) -> Result<Invocation> {
    let mut builder = ConversionConfig::builder()
        .dpi(cli.dpi)
        .target_height_px(cli.target_height)
        .model(cli.model.clone())
        .max_workers(cli.max_workers)
        .batch_size(cli.batch_size)
        .fast_mode(cli.fast)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .base_url(cli.base_url.clone());

    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let config = builder.build().context("Invalid configuration")?;

    Ok(Invocation {
        pdf_path: cli.pdf_path.clone(),
        output_path: cli.output.clone(),
        output_dir: cli.output_dir.clone(),
        api_key: cli.api_key.clone(),
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_when_flags_omitted() {
        let cli = Cli::try_parse_from(["papershift", "doc.pdf"]).unwrap();
        let inv = build_invocation(&cli, None).unwrap();
        assert_eq!(inv.config.dpi, 300);
        assert_eq!(inv.config.target_height_px, 2048);
        assert_eq!(inv.config.max_workers, 4);
        assert_eq!(inv.config.batch_size, 5);
        assert!(!inv.config.fast_mode);
        assert_eq!(inv.config.model, "openrouter/google/gemini-2.0-flash-001");
        assert!(inv.output_path.is_none());
        assert!(inv.output_dir.is_none());
        assert!(inv.api_key.is_none());
    }

    #[test]
    fn flags_are_forwarded() {
        let cli = Cli::try_parse_from([
            "papershift",
            "doc.pdf",
            "-o",
            "out.md",
            "-d",
            "dir",
            "--dpi",
            "200",
            "--target-height",
            "1024",
            "--model",
            "openai/gpt-4o",
            "--api-key",
            "sk-flag",
            "--max-workers",
            "2",
            "--batch-size",
            "10",
            "--fast",
        ])
        .unwrap();
        let inv = build_invocation(&cli, None).unwrap();
        assert_eq!(inv.output_path, Some(PathBuf::from("out.md")));
        assert_eq!(inv.output_dir, Some(PathBuf::from("dir")));
        assert_eq!(inv.config.dpi, 200);
        assert_eq!(inv.config.target_height_px, 1024);
        assert_eq!(inv.config.model, "openai/gpt-4o");
        assert_eq!(inv.api_key.as_deref(), Some("sk-flag"));
        assert_eq!(inv.config.max_workers, 2);
        assert_eq!(inv.config.batch_size, 10);
        assert!(inv.config.fast_mode);
    }

    #[test]
    fn zero_workers_is_a_configuration_error() {
        let cli = Cli::try_parse_from(["papershift", "doc.pdf", "--max-workers", "0"]).unwrap();
        assert!(build_invocation(&cli, None).is_err());
    }

    #[test]
    fn max_retries_is_bounded() {
        let cli = Cli::try_parse_from(["papershift", "doc.pdf", "--max-retries", "10"]).unwrap();
        assert_eq!(build_invocation(&cli, None).unwrap().config.max_retries, 10);
        assert!(Cli::try_parse_from(["papershift", "doc.pdf", "--max-retries", "300"]).is_err());
    }

    #[test]
    fn aborted_conversion_clears_the_bar() {
        let cb = CliProgressCallback::new_dynamic();
        cb.on_conversion_start(4);
        cb.on_page_complete(1, 4, 10);
        assert!(!cb.bar.is_finished());

        cb.on_conversion_aborted("render failed");
        assert!(cb.bar.is_finished());
    }

    #[test]
    fn missing_pdf_path_is_a_usage_error() {
        let err = Cli::try_parse_from(["papershift"]).unwrap_err();
        assert!(err.use_stderr());
    }
}
