//! Image encoding: file bytes → base64 [`ImagePayload`].
//!
//! Vision APIs accept images as base64 data-URIs embedded in the JSON
//! request body. The bytes are sent exactly as they sit on disk — no
//! re-encoding, no resizing — because any lossy step before OCR costs
//! accuracy, and the sniffed MIME type already tells the service what the
//! bytes are.

use crate::engine::ImagePayload;
use crate::error::TableScanError;
use crate::pipeline::input::ResolvedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Read the resolved image and wrap it for the OCR request.
pub async fn encode_image(resolved: &ResolvedImage) -> Result<ImagePayload, TableScanError> {
    let bytes = tokio::fs::read(&resolved.path).await.map_err(|e| {
        TableScanError::Internal(format!("reading '{}': {e}", resolved.path.display()))
    })?;

    let data = STANDARD.encode(&bytes);
    debug!(
        "Encoded {} ({} bytes → {} base64)",
        resolved.path.display(),
        bytes.len(),
        data.len()
    );

    Ok(ImagePayload {
        data,
        mime_type: resolved.mime_type().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::resolve_image;
    use image::{Rgba, RgbaImage};

    #[tokio::test]
    async fn encode_small_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let resolved = resolve_image(&path).unwrap();
        let payload = encode_image(&resolved).await.expect("encode should succeed");
        assert_eq!(payload.mime_type, "image/png");
        assert!(!payload.data.is_empty());
        // Round-trips as valid base64 back to the on-disk bytes.
        let decoded = STANDARD.decode(&payload.data).expect("valid base64");
        assert_eq!(decoded, std::fs::read(&path).unwrap());
    }
}
