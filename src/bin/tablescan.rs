//! CLI binary for tablescan.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tablescan::{extract, extract_to_file, ExtractConfig};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a table, write ocr_results/receipt.json
  tablescan receipt.png

  # Print the rows to stdout instead of writing a file
  tablescan --stdout receipt.png

  # Custom output directory and a different model
  tablescan -o results --model meta-llama/Llama-3.2-11B-Vision-Instruct-Turbo scan.jpg

  # More patience for flaky networks
  tablescan --max-retries 5 --api-timeout 120 photo.png

ENVIRONMENT VARIABLES:
  TOGETHER_API_KEY        OCR service API key
  TABLESCAN_MODEL         Override the vision model ID
  TABLESCAN_API_BASE      Override the OpenAI-compatible endpoint base URL

SETUP:
  1. Set API key:     export TOGETHER_API_KEY=tok-...
  2. Extract:         tablescan table.png
"#;

/// Extract structured table rows from an image using vision OCR.
#[derive(Parser, Debug)]
#[command(
    name = "tablescan",
    version,
    about = "Extract structured table rows from images using vision OCR",
    long_about = "Send an image of a table to a vision OCR model, parse the returned Markdown \
table into structured rows, and write them as a JSON file named after the image.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the image file (PNG, JPEG, GIF, WebP, BMP, TIFF).
    input: PathBuf,

    /// Directory the JSON result is written into.
    #[arg(short, long, env = "TABLESCAN_OUTPUT_DIR", default_value = "ocr_results")]
    output_dir: PathBuf,

    /// Print the rows as JSON to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,

    /// OCR service API key.
    #[arg(long, env = "TOGETHER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Vision model ID.
    #[arg(long, env = "TABLESCAN_MODEL")]
    model: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[arg(long, env = "TABLESCAN_API_BASE")]
    api_base: Option<String>,

    /// Path to a text file containing a custom transcription prompt.
    #[arg(long, env = "TABLESCAN_PROMPT")]
    prompt: Option<PathBuf>,

    /// Maximum OCR attempts (first try included).
    #[arg(long, env = "TABLESCAN_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Initial retry backoff in milliseconds (doubles each attempt).
    #[arg(long, env = "TABLESCAN_BACKOFF_MS", default_value_t = 500)]
    backoff_ms: u64,

    /// Per-attempt OCR call timeout in seconds.
    #[arg(long, env = "TABLESCAN_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Disable the spinner.
    #[arg(long, env = "TABLESCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TABLESCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "TABLESCAN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // summary line carries everything the user needs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.stdout;
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

    let config = build_config(&cli).await?;

    let spinner = if show_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Extracting");
        bar.set_message(cli.input.display().to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    // ── Run extraction ───────────────────────────────────────────────────
    if cli.stdout {
        let output = extract(&cli.input, &config)
            .await
            .context("Extraction failed")?;

        let json = serde_json::to_string_pretty(&output.table.rows)
            .context("Failed to serialise rows")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(json.as_bytes()).context("stdout write")?;
        handle.write_all(b"\n").ok();

        if !cli.quiet {
            eprintln!(
                "{} {} rows  {}  {}",
                green("✔"),
                bold(&output.table.rows.len().to_string()),
                dim(&format!("{} attempt(s)", output.stats.attempts)),
                dim(&format!("{}ms", output.stats.total_duration_ms)),
            );
            if output.stats.dropped_rows > 0 {
                eprintln!(
                    "{} {} malformed line(s) dropped",
                    cyan("⚠"),
                    output.stats.dropped_rows
                );
            }
        }
    } else {
        let filename = extract_to_file(&cli.input, &config)
            .await
            .context("Extraction failed");

        if let Some(bar) = &spinner {
            bar.finish_and_clear();
        }
        let filename = filename?;

        if !cli.quiet {
            eprintln!(
                "{} {}",
                green("✔"),
                bold(&config.output_dir.join(&filename).display().to_string()),
            );
        } else {
            println!("{filename}");
        }
    }

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    Ok(())
}

/// Map CLI args to `ExtractConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractConfig> {
    let prompt = if let Some(ref path) = cli.prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt from {path:?}"))?,
        )
    } else {
        None
    };

    let mut builder = ExtractConfig::builder()
        .max_retries(cli.max_retries)
        .retry_backoff_ms(cli.backoff_ms)
        .api_timeout_secs(cli.api_timeout)
        .output_dir(cli.output_dir.clone());

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref base) = cli.api_base {
        builder = builder.api_base(base);
    }
    if let Some(p) = prompt {
        builder = builder.prompt(p);
    }

    builder.build().context("Invalid configuration")
}
