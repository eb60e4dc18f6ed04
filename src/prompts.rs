//! Transcription prompts for the vision OCR call.
//!
//! Centralising the prompt here keeps it a single source of truth and lets
//! unit tests inspect it without a live API. Callers override it via
//! [`crate::config::ExtractConfig::prompt`]; the constant is used only when
//! no override is provided.

/// Default prompt asking the vision model to transcribe the image's table
/// as a GFM pipe table.
///
/// The "no fences, no commentary" rules matter: the parser scans for the
/// first pipe-bearing line, and a chatty preamble is tolerated but a fenced
/// block is not guaranteed to be.
pub const DEFAULT_OCR_PROMPT: &str = r#"Transcribe the table in this image to Markdown.

Rules:
1. Output a GFM pipe table: a header row, a `---` separator row, one line per data row.
2. Preserve every cell's text exactly as printed; do not reorder rows or columns.
3. Use the table's own column headings as the header row.
4. If a cell is empty, leave the field empty between the pipes.
5. Do NOT wrap the output in ``` fences.
6. Do NOT add commentary, explanations, or totals that are not in the image.
"#;
