//! Input resolution: validate the image path before any network call.
//!
//! Format sniffing happens here, on magic bytes, so a text file or a PDF
//! fails with [`TableScanError::NotAnImage`] instead of a confusing
//! service-side rejection three retries later. `image::guess_format` looks
//! only at the header bytes, so every raster format the crate knows about
//! is recognised regardless of which codecs are compiled in.

use crate::error::TableScanError;
use image::ImageFormat;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A validated input image: its path plus the sniffed format.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub path: PathBuf,
    pub format: ImageFormat,
}

impl ResolvedImage {
    /// MIME type for the request body, e.g. `image/png`.
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }
}

/// Validate that `path` exists, is readable, and starts with the magic
/// bytes of a known raster format.
pub fn resolve_image(path: &Path) -> Result<ResolvedImage, TableScanError> {
    if !path.exists() {
        return Err(TableScanError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(TableScanError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(TableScanError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };

    // 32 bytes covers the longest magic any supported format uses.
    let mut header = [0u8; 32];
    let read = file.read(&mut header).map_err(|e| {
        TableScanError::Internal(format!("reading '{}': {e}", path.display()))
    })?;

    let format = image::guess_format(&header[..read]).map_err(|_| {
        let mut magic = [0u8; 4];
        let n = read.min(4);
        magic[..n].copy_from_slice(&header[..n]);
        TableScanError::NotAnImage {
            path: path.to_path_buf(),
            magic,
        }
    })?;

    debug!("Resolved image: {} ({:?})", path.display(), format);
    Ok(ResolvedImage {
        path: path.to_path_buf(),
        format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn png_is_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.png");
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let resolved = resolve_image(&path).expect("png should resolve");
        assert_eq!(resolved.format, ImageFormat::Png);
        assert_eq!(resolved.mime_type(), "image/png");
    }

    #[test]
    fn text_file_is_not_an_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "| Name | Age |\n| Alice | 30 |").unwrap();

        let err = resolve_image(&path).unwrap_err();
        assert!(matches!(err, TableScanError::NotAnImage { .. }), "got {err:?}");
    }

    #[test]
    fn missing_file() {
        let err = resolve_image(Path::new("/no/such/file.png")).unwrap_err();
        assert!(matches!(err, TableScanError::FileNotFound { .. }));
    }
}
