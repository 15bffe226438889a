//! Screenshot image format and data URL validation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// JPEG quality used for previews.
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

// ============================================================================
// ImageFormat
// ============================================================================

/// Image format requested from the capture API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG format (lossless, larger).
    Png,
    /// JPEG format with quality (0-100).
    Jpeg(u8),
}

impl Default for ImageFormat {
    fn default() -> Self {
        Self::Jpeg(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageFormat {
    /// Creates JPEG format with quality clamped to 100.
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self::Jpeg(quality.min(100))
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg(_) => "image/jpeg",
        }
    }

    /// Returns the format string the capture API expects.
    #[must_use]
    pub fn format_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) => "jpeg",
        }
    }

    /// Returns the quality value if JPEG.
    #[must_use]
    pub fn quality(&self) -> Option<u8> {
        match self {
            Self::Png => None,
            Self::Jpeg(q) => Some(*q),
        }
    }

    /// Checks that `data_url` is a base64 data URL of this format's MIME type.
    ///
    /// Only the header and the first base64 block are decoded; previews can
    /// be hundreds of kilobytes and are passed through untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidImage`] if the URL is malformed, has the wrong
    /// MIME type or an empty or undecodable payload.
    pub fn validate_data_url(&self, data_url: &str) -> Result<()> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| Error::invalid_image("missing data: scheme"))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::invalid_image("missing payload separator"))?;

        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::invalid_image("payload is not base64"))?;

        if mime != self.mime_type() {
            return Err(Error::invalid_image(format!(
                "expected {}, got {}",
                self.mime_type(),
                mime
            )));
        }

        if payload.is_empty() {
            return Err(Error::invalid_image("empty payload"));
        }

        let bytes = payload.as_bytes();
        let head_len = bytes.len().min(64) / 4 * 4;
        let head = if head_len == 0 { bytes } else { &bytes[..head_len] };
        Base64Standard
            .decode(head)
            .map_err(|e| Error::invalid_image(format!("bad base64: {e}")))?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
