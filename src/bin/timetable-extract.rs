//! CLI binary for timetable-extract.
//!
//! A thin shim over the library crate: `serve` runs the HTTP surface,
//! `extract` runs one document (local file or URL) and prints the JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use timetable_extract::pipeline::input::load_input;
use timetable_extract::{ExtractionConfig, ServerConfig, TimetableExtractor};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on port 8080
  timetable-extract serve --port 8080

  # Extract a photographed timetable
  timetable-extract extract week.jpg --pretty

  # Extract from a URL with a specific model
  timetable-extract extract https://school.example/timetable.pdf --model gpt-4.1-mini

  # Upload to a running service
  curl -F file=@week.png http://localhost:3000/extract

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY             OpenAI API key
  ANTHROPIC_API_KEY          Anthropic API key
  GEMINI_API_KEY             Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER     Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL            Override model ID
  HOST, PORT                 Bind address for `serve` (default 0.0.0.0:3000)
  MAX_FILE_SIZE              Upload limit in bytes (default 10485760)
  ALLOWED_FILE_TYPES         Comma list (default image/png,image/jpeg,application/pdf)
  ENABLE_VISION, ENABLE_OCR  Image paths (default true)
  OCR_CONFIDENCE_THRESHOLD   Minimum Tesseract confidence 0-100 (default 60)
  OCR_LANGUAGE               Tesseract language (default eng)
  PDFIUM_LIB_PATH            Directory containing libpdfium

SETUP:
  Tesseract must be on PATH for OCR; pdfium must be on the library path
  or pointed to with PDFIUM_LIB_PATH for PDF uploads.
"#;

/// Extract weekly timetables from images and PDFs using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "timetable-extract",
    version,
    about = "Extract weekly timetables from images and PDFs using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "TIMETABLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "TIMETABLE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (POST /extract, GET /health).
    Serve {
        /// Address to bind.
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: IpAddr,

        /// Port to listen on.
        #[arg(short, long, env = "PORT", default_value_t = 3000)]
        port: u16,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },

    /// Extract one timetable and print it as JSON.
    Extract {
        /// Local image/PDF path or HTTP/HTTPS URL.
        input: String,

        /// Override the MIME type sniffed from the file contents.
        #[arg(long)]
        mime: Option<String>,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,

        /// Disable the spinner.
        #[arg(long, env = "TIMETABLE_NO_PROGRESS")]
        no_progress: bool,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },
}

/// Flags shared by both subcommands; they map onto `ExtractionConfig`.
#[derive(Args, Debug)]
struct ExtractionArgs {
    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Largest accepted upload in bytes.
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = 10 * 1024 * 1024)]
    max_file_size: usize,

    /// Accepted MIME types.
    #[arg(
        long,
        env = "ALLOWED_FILE_TYPES",
        value_delimiter = ',',
        default_value = "image/png,image/jpeg,application/pdf"
    )]
    allowed_file_types: Vec<String>,

    /// Send images straight to the vision model.
    #[arg(long, env = "ENABLE_VISION", default_value_t = true, action = clap::ArgAction::Set)]
    enable_vision: bool,

    /// Allow Tesseract OCR (vision fallback, or the only image path).
    #[arg(long, env = "ENABLE_OCR", default_value_t = true, action = clap::ArgAction::Set)]
    enable_ocr: bool,

    /// Minimum mean OCR confidence (0–100).
    #[arg(long, env = "OCR_CONFIDENCE_THRESHOLD", default_value_t = 60.0)]
    ocr_confidence_threshold: f32,

    /// Tesseract language code(s).
    #[arg(long, env = "OCR_LANGUAGE", default_value = "eng")]
    ocr_language: String,

    /// Images are downscaled to fit this box.
    #[arg(long, env = "MAX_IMAGE_DIMENSION", default_value_t = 2000)]
    max_image_dimension: u32,

    /// Confidence below which a block gets a warning (0–1).
    #[arg(long, env = "LOW_CONFIDENCE_THRESHOLD", default_value_t = 0.5)]
    low_confidence_threshold: f64,

    /// Directory containing the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "TIMETABLE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens.
    #[arg(long, env = "TIMETABLE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "TIMETABLE_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, env = "TIMETABLE_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        match cli.command {
            // The spinner and the JSON on stdout are the feedback that matters.
            Command::Extract { no_progress: false, .. } => "warn",
            _ => "info",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            host,
            port,
            extraction,
        } => {
            let config = build_config(&extraction).await?;
            let extractor = TimetableExtractor::new(config).await;
            if !extractor.llm_configured() && !cli.quiet {
                eprintln!(
                    "{} no LLM provider configured; /extract will fail until one is set",
                    cyan("⚠")
                );
            }
            timetable_extract::server::serve(extractor, ServerConfig { host, port })
                .await
                .context("HTTP server failed")?;
        }
        Command::Extract {
            input,
            mime,
            pretty,
            no_progress,
            extraction,
        } => {
            let config = build_config(&extraction).await?;
            let extractor = TimetableExtractor::new(config).await;

            let spinner = (!cli.quiet && !no_progress).then(|| spinner(&input));

            let result = match mime {
                Some(mime) => {
                    let loaded = load_input(&input, extractor.config().download_timeout_secs)
                        .await
                        .with_context(|| format!("Failed to load '{input}'"))?;
                    extractor.extract(&loaded.bytes, &mime).await
                }
                None => extractor.extract_input(&input).await,
            };

            if let Some(bar) = spinner {
                bar.finish_and_clear();
            }
            let output = result.context("Extraction failed")?;

            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }
            .context("Failed to serialise output")?;
            println!("{json}");

            if !cli.quiet {
                eprintln!(
                    "{} {} blocks via {}  {}",
                    if output.warnings.is_empty() {
                        green("✔")
                    } else {
                        cyan("⚠")
                    },
                    bold(&output.result.timeblocks.len().to_string()),
                    output.method,
                    dim(&format!(
                        "{} warning(s), {} tokens in / {} out, {}ms",
                        output.warnings.len(),
                        output.stats.input_tokens,
                        output.stats.output_tokens,
                        output.stats.processing_time_ms
                    )),
                );
            }
        }
    }

    Ok(())
}

fn spinner(input: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Extracting");
    bar.set_message(input.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(args: &ExtractionArgs) -> Result<ExtractionConfig> {
    let system_prompt = if let Some(ref path) = args.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = ExtractionConfig::builder()
        .max_file_size(args.max_file_size)
        .allowed_mime_types(&args.allowed_file_types)
        .enable_vision(args.enable_vision)
        .enable_ocr(args.enable_ocr)
        .ocr_confidence_threshold(args.ocr_confidence_threshold)
        .ocr_language(args.ocr_language.as_str())
        .max_image_dimension(args.max_image_dimension)
        .low_confidence_threshold(args.low_confidence_threshold)
        .max_tokens(args.max_tokens)
        .temperature(args.temperature)
        .download_timeout_secs(args.download_timeout);

    if let Some(ref model) = args.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(ref path) = args.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
