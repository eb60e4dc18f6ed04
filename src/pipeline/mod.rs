//! Pipeline stages for image-to-rows extraction.
//!
//! Each submodule implements exactly one transformation step, keeping the
//! stages independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ engine ──▶ table
//! (path)   (base64)    (OCR)    (rows)
//! ```
//!
//! 1. [`input`]  — validate the image path and sniff the raster format
//! 2. [`encode`] — read the bytes and base64-wrap them for the request body
//! 3. [`crate::engine`] — the OCR call; the only stage with network I/O
//! 4. [`crate::table`] — parse the returned Markdown into rows

pub mod encode;
pub mod input;
