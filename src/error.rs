//! Error types for the tablescan library.
//!
//! The variants fall into four severity classes, and the retry loop in
//! [`crate::extract`] treats each class differently:
//!
//! * **Configuration** ([`TableScanError::MissingApiKey`],
//!   [`TableScanError::InvalidConfig`]) — fatal before the first attempt.
//!   Retrying cannot conjure a credential.
//! * **Transient service failures** ([`TableScanError::OcrFailed`],
//!   [`TableScanError::OcrTimeout`], [`TableScanError::EmptyTable`]) —
//!   retried up to the configured attempt budget. An empty table counts as
//!   transient because it usually means the model misread the image, not
//!   that the image has no table.
//! * **Permanent service failures** ([`TableScanError::AuthRejected`]) —
//!   the endpoint rejected the key; retrying with the same key cannot help.
//! * **I/O** ([`TableScanError::OutputWriteFailed`]) — surfaced directly;
//!   re-running the OCR call would not fix a filesystem problem.
//!
//! [`TableScanError::is_transient`] encodes the classification so the loop
//! driver never has to pattern-match severity itself.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the tablescan library.
#[derive(Debug, Error)]
pub enum TableScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input image was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a recognised raster image.
    #[error("File is not a supported image format: '{path}'\nFirst bytes: {magic:?}")]
    NotAnImage { path: PathBuf, magic: [u8; 4] },

    // ── Config errors ─────────────────────────────────────────────────────
    /// No API key was configured and no custom engine was injected.
    #[error(
        "No OCR API key configured.\n\
         Set one with ExtractConfig::builder().api_key(...), or export TOGETHER_API_KEY."
    )]
    MissingApiKey,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Service errors ────────────────────────────────────────────────────
    /// The OCR service call failed (network error, 5xx, malformed response).
    #[error("OCR service call failed: {message}")]
    OcrFailed { message: String },

    /// The OCR service call exceeded the per-attempt timeout.
    #[error("OCR call timed out after {secs}s\nIncrease --api-timeout for slow models.")]
    OcrTimeout { secs: u64 },

    /// The OCR service rejected the credential (401/403) — retry cannot help.
    #[error("OCR service rejected the API key: {detail}")]
    AuthRejected { detail: String },

    // ── Result errors ─────────────────────────────────────────────────────
    /// Every attempt produced Markdown with zero table rows.
    #[error(
        "No table rows extracted after {attempts} attempt(s).\n\
         The image may not contain a table, or the model could not read it."
    )]
    EmptyTable { attempts: u32 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory or write the result file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TableScanError {
    /// Whether the retry loop should attempt again after this error.
    ///
    /// Transient: service hiccups, timeouts, and empty OCR results.
    /// Everything else (config, auth, input, I/O) stops the loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TableScanError::OcrFailed { .. }
                | TableScanError::OcrTimeout { .. }
                | TableScanError::EmptyTable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_display() {
        let e = TableScanError::EmptyTable { attempts: 3 };
        let msg = e.to_string();
        assert!(msg.contains("3 attempt"), "got: {msg}");
    }

    #[test]
    fn timeout_display() {
        let e = TableScanError::OcrTimeout { secs: 60 };
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn auth_display() {
        let e = TableScanError::AuthRejected {
            detail: "invalid key".into(),
        };
        assert!(e.to_string().contains("invalid key"));
    }

    #[test]
    fn transient_classification() {
        assert!(TableScanError::OcrFailed {
            message: "503".into()
        }
        .is_transient());
        assert!(TableScanError::OcrTimeout { secs: 1 }.is_transient());
        assert!(TableScanError::EmptyTable { attempts: 1 }.is_transient());

        assert!(!TableScanError::MissingApiKey.is_transient());
        assert!(!TableScanError::AuthRejected {
            detail: "nope".into()
        }
        .is_transient());
        assert!(!TableScanError::OutputWriteFailed {
            path: "x.json".into(),
            source: std::io::Error::other("disk full"),
        }
        .is_transient());
    }
}
