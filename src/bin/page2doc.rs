//! CLI binary for page2doc.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConvertConfig` and prints the selected rendition.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use page2doc::{ConvertConfig, Converter, ImageInput, TruncationPolicy, DEFAULT_PROMPT};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a local page image (Markdown to stdout)
  page2doc page.png

  # Convert from a URL
  page2doc https://example.com/scan.png -o page.md

  # Self-contained HTML with embedded picture crops
  page2doc page.png --format html -o page.html

  # All four renditions as JSON
  page2doc page.png --json > page.json

  # Point at a different OpenAI-compatible endpoint
  page2doc page.png --base-url http://localhost:11434/v1 --model smoldocling

  # Reject output truncated at the token cap instead of salvaging
  page2doc dense-page.png --strict

ENVIRONMENT VARIABLES:
  PAGE2DOC_BASE_URL   OpenAI-compatible endpoint base URL
  PAGE2DOC_MODEL      Logical model name served by the endpoint
  PAGE2DOC_API_KEY    Bearer token for the endpoint, if it needs one

SETUP:
  1. Serve a DocTags-capable vision model behind an OpenAI-compatible
     streaming endpoint (vLLM, SGLang, Ollama, LM Studio).
  2. Convert:  page2doc page.png -o page.md
"#;

/// Convert a page image to a structured document using a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "page2doc",
    version,
    about = "Convert a page image to Markdown/HTML/text using a Vision LLM",
    long_about = "Convert a single page image (local file or URL) into a structured document \
via a streaming vision-language model that emits DocTags markup. Produces the raw tag \
stream, Markdown, self-contained HTML, and plain text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image file path or HTTP/HTTPS URL.
    input: String,

    /// Instruction sent to the model alongside the image.
    #[arg(short, long, default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// Write the selected rendition to this file instead of stdout.
    #[arg(short, long, env = "PAGE2DOC_OUTPUT")]
    output: Option<PathBuf>,

    /// Which rendition to print: doctags, markdown, html, text.
    #[arg(short, long, env = "PAGE2DOC_FORMAT", value_enum, default_value = "markdown")]
    format: FormatArg,

    /// Base URL of the OpenAI-compatible streaming endpoint.
    #[arg(long, env = "PAGE2DOC_BASE_URL")]
    base_url: Option<String>,

    /// Logical model name served by the endpoint.
    #[arg(long, env = "PAGE2DOC_MODEL")]
    model: Option<String>,

    /// Bearer token for the endpoint.
    #[arg(long, env = "PAGE2DOC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Max generated fragments before the stream is cut off.
    #[arg(long, env = "PAGE2DOC_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PAGE2DOC_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// HTTP timeout for fetching a URL input, in seconds.
    #[arg(long, env = "PAGE2DOC_FETCH_TIMEOUT", default_value_t = 10)]
    fetch_timeout: u64,

    /// Fail on output truncated at the token cap instead of salvaging.
    #[arg(long, env = "PAGE2DOC_STRICT")]
    strict: bool,

    /// Output all four renditions as structured JSON instead of one.
    #[arg(long, env = "PAGE2DOC_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PAGE2DOC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGE2DOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAGE2DOC_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Doctags,
    Markdown,
    Html,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; it is
    // all the feedback that matters during a single-page conversion.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = ConvertConfig::builder()
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .fetch_timeout_secs(cli.fetch_timeout)
        .truncation(if cli.strict {
            TruncationPolicy::Strict
        } else {
            TruncationPolicy::Salvage
        });
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    let config = builder.build().context("Invalid configuration")?;
    let converter = Converter::from_config(config).context("Failed to build converter")?;

    // ── Convert ──────────────────────────────────────────────────────────
    let spinner = if show_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.set_message(cli.input.clone());
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let bundle = converter
        .convert(ImageInput::from_str_input(&cli.input), &cli.prompt)
        .await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    if bundle.is_error() {
        eprintln!("{}", bundle.doctags);
        std::process::exit(1);
    }

    // ── Print result ─────────────────────────────────────────────────────
    let rendition = if cli.json {
        serde_json::to_string_pretty(&bundle).context("Failed to serialize output")?
    } else {
        match cli.format {
            FormatArg::Doctags => bundle.doctags,
            FormatArg::Markdown => bundle.markdown,
            FormatArg::Html => bundle.html,
            FormatArg::Text => bundle.plain_text,
        }
    };

    match cli.output {
        Some(path) => {
            std::fs::write(&path, rendition)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!("Wrote {}", path.display());
            }
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out.write_all(rendition.as_bytes())
                .context("Failed to write to stdout")?;
            if !rendition.ends_with('\n') {
                out.write_all(b"\n").context("Failed to write to stdout")?;
            }
        }
    }

    Ok(())
}
