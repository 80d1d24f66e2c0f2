//! Image payload decoding
//!
//! Upload submissions carry the photograph as a base64 data URI
//! (`data:image/png;base64,...`). The declared format must be one of the
//! supported encodings and must agree with the magic bytes of the decoded
//! payload; extension-style trust in the declared prefix alone is not enough.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

/// Supported image encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
    Heic,
    Heif,
}

impl ImageFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Heic => "image/heic",
            ImageFormat::Heif => "image/heif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Webp => "webp",
            ImageFormat::Heic => "heic",
            ImageFormat::Heif => "heif",
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::Webp),
            "image/heic" => Some(ImageFormat::Heic),
            "image/heif" => Some(ImageFormat::Heif),
            _ => None,
        }
    }

    /// HEIC/HEIF share a container; sniffers may report either for both
    fn same_family(&self, other: &ImageFormat) -> bool {
        let heif_family =
            |f: &ImageFormat| matches!(f, ImageFormat::Heic | ImageFormat::Heif);
        self == other || (heif_family(self) && heif_family(other))
    }
}

/// Payload decoding errors. All of these surface to the caller as
/// INVALID_DATA; the distinct variants exist for logging.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not a base64 image data URI")]
    MissingPrefix,

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid base64 image data: {0}")]
    InvalidBase64(String),

    #[error("declared format {declared} does not match image content")]
    FormatMismatch { declared: &'static str },
}

/// Decoded upload payload
#[derive(Debug)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

/// Decode and validate a `data:image/<fmt>;base64,<data>` payload.
///
/// Steps: split the data-URI prefix, map the declared MIME type to a
/// supported format, base64-decode, then verify the declared format against
/// the payload's magic bytes.
pub fn decode_data_uri(payload: &str) -> Result<ImagePayload, PayloadError> {
    let rest = payload.strip_prefix("data:").ok_or(PayloadError::MissingPrefix)?;
    let (mime, data) = rest.split_once(";base64,").ok_or(PayloadError::MissingPrefix)?;

    let format = ImageFormat::from_mime(mime)
        .ok_or_else(|| PayloadError::UnsupportedFormat(mime.to_string()))?;

    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| PayloadError::InvalidBase64(e.to_string()))?;

    // Magic-byte verification: the declared type must match what the bytes
    // actually are.
    let detected = infer::get(&bytes)
        .and_then(|kind| ImageFormat::from_mime(kind.mime_type()))
        .ok_or(PayloadError::FormatMismatch { declared: format.mime() })?;

    if !format.same_family(&detected) {
        return Err(PayloadError::FormatMismatch { declared: format.mime() });
    }

    Ok(ImagePayload { bytes, format })
}
