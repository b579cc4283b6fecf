//! Minimal command-line front end (`pdf-to-md`).
//!
//! ```text
//! pdf-to-md <pdf_path> [output_path]
//! ```
//!
//! Default conversion settings, credential from `OPENROUTER_API_KEY`.
//! Every message goes to stdout.

use clap::Parser;
use papershift::app::{self, Environment, Invocation, API_KEY_ENV};
use papershift::{OpenRouterConverter, PaperShiftError};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: pdf-to-md <pdf_path> [output_path]";

#[derive(Parser, Debug)]
#[command(name = "pdf-to-md", version, about = "Convert a PDF to Markdown with default settings")]
struct Args {
    /// PDF file to convert.
    pdf_path: PathBuf,

    /// Where to write the Markdown (default: <stem>.md in the current directory).
    output_path: Option<PathBuf>,

    /// Anything after the output path is ignored.
    #[arg(hide = true, num_args = 0.., allow_hyphen_values = true, trailing_var_arg = true)]
    extra: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            println!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let env = match Environment::from_process() {
        Ok(env) => env,
        Err(e) => {
            println!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if !args.extra.is_empty() {
        tracing::debug!("Ignoring extra arguments: {:?}", args.extra);
    }

    let mut invocation = Invocation::new(&args.pdf_path);
    invocation.output_path = args.output_path;

    let prepared = match app::prepare(invocation, &env) {
        Ok(p) => p,
        Err(PaperShiftError::MissingApiKey) => {
            println!("Error: {API_KEY_ENV} environment variable is not set");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            println!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("Converting {} to markdown...", args.pdf_path.display());

    match app::execute(&prepared, &OpenRouterConverter).await {
        Ok(path) => {
            println!("Conversion complete! Markdown saved to: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Error during conversion: {e}");
            ExitCode::FAILURE
        }
    }
}
