//! # tablescan
//!
//! Extract structured table rows from images using vision OCR.
//!
//! ## Why this crate?
//!
//! Classic OCR gives you a bag of words with coordinates; reconstructing a
//! table from that is fragile. A vision model instead reads the image like a
//! human and emits a Markdown pipe table, which this crate parses into
//! ordered rows keyed by the table's own column headers — ready to
//! serialise, edit, or load into a dataframe.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image
//!  │
//!  ├─ 1. Input    validate path, sniff the raster format
//!  ├─ 2. Encode   bytes → base64 data-URL
//!  ├─ 3. OCR      vision model call, retried with backoff
//!  ├─ 4. Parse    Markdown pipe table → ordered rows
//!  └─ 5. Output   pretty JSON file named after the image
//! ```
//!
//! Zero extracted rows counts as a failed attempt: a table image that
//! parses to nothing almost always means the model misread it, and a
//! retry usually recovers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tablescan::{extract, ExtractConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractConfig::builder()
//!         .api_key(std::env::var("TOGETHER_API_KEY")?)
//!         .build()?;
//!     let output = extract("invoice.png", &config).await?;
//!     for row in &output.table.rows {
//!         println!("{row:?}");
//!     }
//!     eprintln!("{} attempts, {} dropped lines",
//!         output.stats.attempts,
//!         output.stats.dropped_rows);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `tablescan` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! tablescan = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractConfig, ExtractConfigBuilder, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use engine::{ImagePayload, OcrEngine, TogetherVision};
pub use error::TableScanError;
pub use extract::{
    extract, extract_from_bytes, extract_sync, extract_to_file, ExtractOutput, ExtractStats,
};
pub use table::{parse_markdown_table, ParsedTable, Row};
