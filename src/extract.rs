//! Retry-wrapped extraction entry points.
//!
//! ## Attempt classification
//!
//! Each attempt — OCR call, parse, row-count check — resolves to an explicit
//! [`Attempt`] outcome instead of threading control flow through error
//! types. The loop driver continues on `Retry`, stops on `Fatal`, and
//! short-circuits on `Done`; failure severity is decided exactly once, in
//! [`run_attempt`].
//!
//! A successful OCR call that parses to zero rows is a `Retry`, not a
//! success: a table image that yields no rows almost always means the model
//! misread it, and a second attempt usually recovers.

use crate::config::ExtractConfig;
use crate::engine::{ImagePayload, OcrEngine, TogetherVision};
use crate::error::TableScanError;
use crate::pipeline::{encode, input};
use crate::prompts::DEFAULT_OCR_PROMPT;
use crate::table::{parse_markdown_table, ParsedTable};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Timing and attempt counters for one extraction run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExtractStats {
    /// Attempts consumed, the successful one included.
    pub attempts: u32,
    /// Wall-clock time for the whole run.
    pub total_duration_ms: u64,
    /// Time spent inside the attempt loop (OCR calls + backoff).
    pub ocr_duration_ms: u64,
    /// Table-region lines discarded for a column-count mismatch.
    pub dropped_rows: usize,
}

/// The result of a successful extraction.
#[derive(Debug, Clone)]
pub struct ExtractOutput {
    pub table: ParsedTable,
    pub stats: ExtractStats,
}

/// Outcome of one attempt; the loop driver decides continuation from the
/// variant alone.
enum Attempt {
    Done(ParsedTable),
    Retry(TableScanError),
    Fatal(TableScanError),
}

/// Extract table rows from an image file.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `image`  — Path to a raster image containing a table
/// * `config` — Extraction configuration
///
/// # Errors
/// * [`TableScanError::MissingApiKey`] — no credential and no injected
///   engine; returned before the OCR service is contacted at all
/// * Input errors — missing/unreadable/non-image file, also pre-attempt
/// * The last attempt's failure once the retry budget is exhausted
pub async fn extract(
    image: impl AsRef<Path>,
    config: &ExtractConfig,
) -> Result<ExtractOutput, TableScanError> {
    let total_start = Instant::now();
    let image = image.as_ref();

    // Credential check precedes everything: retrying cannot fix it, so
    // there is no reason to even open the file first.
    let engine = resolve_engine(config)?;

    let resolved = input::resolve_image(image)?;
    let payload = encode::encode_image(&resolved).await?;
    let prompt = config.prompt.as_deref().unwrap_or(DEFAULT_OCR_PROMPT);

    info!("Starting extraction: {}", image.display());

    let ocr_start = Instant::now();
    let mut last_err: Option<TableScanError> = None;

    for attempt in 1..=config.max_retries {
        if attempt > 1 {
            // Saturating: a large --max-retries must not overflow the shift.
            let backoff = config
                .retry_backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt - 2));
            if backoff > 0 {
                debug!("Backing off {}ms before attempt {}", backoff, attempt);
                sleep(Duration::from_millis(backoff)).await;
            }
        }

        match run_attempt(&engine, &payload, prompt, attempt).await {
            Attempt::Done(table) => {
                let stats = ExtractStats {
                    attempts: attempt,
                    total_duration_ms: total_start.elapsed().as_millis() as u64,
                    ocr_duration_ms: ocr_start.elapsed().as_millis() as u64,
                    dropped_rows: table.dropped,
                };
                info!(
                    "Extracted {} rows in {} attempt(s), {}ms",
                    table.rows.len(),
                    attempt,
                    stats.total_duration_ms
                );
                if table.dropped > 0 {
                    warn!(
                        "{} malformed line(s) dropped (column count mismatch)",
                        table.dropped
                    );
                }
                return Ok(ExtractOutput { table, stats });
            }
            Attempt::Retry(e) => {
                warn!("Attempt {}/{} failed: {}", attempt, config.max_retries, e);
                last_err = Some(e);
            }
            Attempt::Fatal(e) => return Err(e),
        }
    }

    Err(last_err
        .unwrap_or_else(|| TableScanError::Internal("retry loop ran zero attempts".into())))
}

/// Extract table rows and write them as pretty-printed JSON into
/// `config.output_dir`, named `<image-stem>.json`.
///
/// The output directory is created (idempotently) before the retry loop
/// begins. The file is written atomically (temp file + rename), so a failed
/// run never leaves a partial result behind. Returns the output file's name.
pub async fn extract_to_file(
    image: impl AsRef<Path>,
    config: &ExtractConfig,
) -> Result<String, TableScanError> {
    let image = image.as_ref();

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| TableScanError::OutputWriteFailed {
            path: config.output_dir.clone(),
            source: e,
        })?;

    let output = extract(image, config).await?;

    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    let filename = format!("{stem}.json");
    let path = config.output_dir.join(&filename);

    let json = serde_json::to_string_pretty(&output.table.rows)
        .map_err(|e| TableScanError::Internal(format!("serialising rows: {e}")))?;

    // Atomic write: temp file in the same directory, then rename.
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| TableScanError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
        TableScanError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        }
    })?;

    info!("Results written to {}", path.display());
    Ok(filename)
}

/// Extract table rows from in-memory image bytes.
///
/// Writes `bytes` to a managed [`tempfile`] which is cleaned up on return
/// or panic. Recommended when the image comes from an upload or a database
/// rather than a file on disk.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractConfig,
) -> Result<ExtractOutput, TableScanError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| TableScanError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| TableScanError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_path_buf();
    // `tmp` is dropped (and the file deleted) when `extract` returns
    extract(&path, config).await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    image: impl AsRef<Path>,
    config: &ExtractConfig,
) -> Result<ExtractOutput, TableScanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TableScanError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract(image, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the OCR engine: injected engine first, otherwise build a
/// [`TogetherVision`] from the configured credential.
fn resolve_engine(config: &ExtractConfig) -> Result<Arc<dyn OcrEngine>, TableScanError> {
    if let Some(ref engine) = config.engine {
        return Ok(Arc::clone(engine));
    }

    let key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or(TableScanError::MissingApiKey)?;

    Ok(Arc::new(TogetherVision::new(
        key,
        &config.model,
        &config.api_base,
        config.api_timeout_secs,
    )?))
}

/// One full attempt: OCR call, parse, row-count check.
async fn run_attempt(
    engine: &Arc<dyn OcrEngine>,
    payload: &ImagePayload,
    prompt: &str,
    attempt: u32,
) -> Attempt {
    match engine.recognize(payload, prompt).await {
        Ok(markdown) => {
            debug!("Attempt {}: OCR returned {} bytes", attempt, markdown.len());
            let table = parse_markdown_table(&markdown);
            if table.is_empty() {
                Attempt::Retry(TableScanError::EmptyTable { attempts: attempt })
            } else {
                Attempt::Done(table)
            }
        }
        Err(e) if e.is_transient() => Attempt::Retry(e),
        Err(e) => Attempt::Fatal(e),
    }
}
