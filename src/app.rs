//! The run shared by both command-line entry points.
//!
//! ```text
//! start ─▶ validate_input ─▶ resolve_output_path ─▶ convert ─▶ write_output ─▶ exit 0
//!                 └──────────────────┴────────────────┴────────────┴─▶ exit 1
//! ```
//!
//! [`prepare`] covers the first two states and never touches the converter;
//! [`execute`] covers the last two. Binaries print their progress line in
//! between. Process-wide inputs (the `OPENROUTER_API_KEY` variable and the
//! working directory) come in through [`Environment`] so tests can supply
//! their own.

use crate::config::{ApiKey, ConversionConfig, ConversionRequest};
use crate::convert::MarkdownConverter;
use crate::error::PaperShiftError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the environment variable holding the credential.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Process context read once at start-up.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Value of `OPENROUTER_API_KEY`, if set.
    pub api_key: Option<String>,
    /// Directory that receives derived output paths.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the real process environment.
    pub fn from_process() -> Result<Self, PaperShiftError> {
        let current_dir = std::env::current_dir()
            .map_err(|e| PaperShiftError::Internal(format!("cannot read working directory: {e}")))?;
        Ok(Self {
            api_key: std::env::var(API_KEY_ENV).ok(),
            current_dir,
        })
    }
}

/// What a command line asked for.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub pdf_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    /// Credential given on the command line; wins over the environment.
    pub api_key: Option<String>,
    pub config: ConversionConfig,
}

impl Invocation {
    pub fn new(pdf_path: impl Into<PathBuf>) -> Self {
        Self {
            pdf_path: pdf_path.into(),
            output_path: None,
            output_dir: None,
            api_key: None,
            config: ConversionConfig::default(),
        }
    }
}

/// A validated run: the converter request plus where to write.
#[derive(Debug, Clone)]
pub struct PreparedConversion {
    pub request: ConversionRequest,
    pub output_path: PathBuf,
}

/// Validate the input and credential, then resolve the output path.
///
/// Checks run in a fixed order: the input file first, then the credential.
pub fn prepare(
    invocation: Invocation,
    env: &Environment,
) -> Result<PreparedConversion, PaperShiftError> {
    if !invocation.pdf_path.is_file() {
        return Err(PaperShiftError::FileNotFound {
            path: invocation.pdf_path,
        });
    }

    let api_key = resolve_api_key(invocation.api_key.as_deref(), env.api_key.as_deref())?;

    let output_path = resolve_output_path(
        &invocation.pdf_path,
        invocation.output_path.as_deref(),
        invocation.output_dir.as_deref(),
        &env.current_dir,
    );
    debug!("Resolved output path: {}", output_path.display());

    let mut request = ConversionRequest::new(invocation.pdf_path, api_key).with_config(invocation.config);
    if let Some(dir) = invocation.output_dir {
        request = request.with_output_dir(dir);
    }

    Ok(PreparedConversion {
        request,
        output_path,
    })
}

/// Run the converter and write its Markdown to the resolved path.
///
/// Nothing is written when the converter fails.
pub async fn execute<C: MarkdownConverter + ?Sized>(
    prepared: &PreparedConversion,
    converter: &C,
) -> Result<PathBuf, PaperShiftError> {
    let markdown = converter.convert(&prepared.request).await?;
    write_markdown(&prepared.output_path, &markdown).await?;
    info!(
        "Wrote {} bytes to {}",
        markdown.len(),
        prepared.output_path.display()
    );
    Ok(prepared.output_path.clone())
}

/// [`prepare`] then [`execute`].
pub async fn run<C: MarkdownConverter + ?Sized>(
    invocation: Invocation,
    env: &Environment,
    converter: &C,
) -> Result<PathBuf, PaperShiftError> {
    let prepared = prepare(invocation, env)?;
    execute(&prepared, converter).await
}

/// Explicit credential first, then the environment. Blank values count as
/// missing.
pub fn resolve_api_key(
    explicit: Option<&str>,
    from_env: Option<&str>,
) -> Result<ApiKey, PaperShiftError> {
    explicit
        .and_then(ApiKey::new)
        .or_else(|| from_env.and_then(ApiKey::new))
        .ok_or(PaperShiftError::MissingApiKey)
}

/// Where the Markdown goes.
///
/// An explicit output path is used as given. Otherwise the input's file
/// stem plus `.md`, inside `output_dir` when given, else inside
/// `current_dir`.
pub fn resolve_output_path(
    pdf_path: &Path,
    output_path: Option<&Path>,
    output_dir: Option<&Path>,
    current_dir: &Path,
) -> PathBuf {
    if let Some(path) = output_path {
        return path.to_path_buf();
    }

    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = format!("{stem}.md");

    output_dir.unwrap_or(current_dir).join(file_name)
}

/// Create parent directories as needed, then write `markdown` as UTF-8.
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), PaperShiftError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PaperShiftError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    tokio::fs::write(path, markdown.as_bytes())
        .await
        .map_err(|e| PaperShiftError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
