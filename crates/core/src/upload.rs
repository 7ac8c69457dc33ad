//! Upload validation for the restore endpoint.
//!
//! All checks run before any credit check or external call, so an invalid
//! upload never costs the user anything. Dimension gating inspects the PNG
//! header directly (signature + IHDR); JPEG and WebP uploads are bounded by
//! the byte-size cap alone.

/// Maximum accepted upload size.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Maximum raster dimension on either axis.
pub const MAX_DIMENSION_PX: u32 = 4000;

/// Accepted MIME types for the image field.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Label applied when the client sends none.
pub const DEFAULT_LABEL: &str = "photo";

/// Maximum label length in characters, after trimming.
pub const MAX_LABEL_CHARS: usize = 200;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Why an upload was refused. All variants map to HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("File too large: {actual} bytes exceeds the {MAX_UPLOAD_BYTES} byte limit")]
    FileTooLarge { actual: usize },

    #[error("Unsupported file type '{0}'. Accepted: JPEG, PNG, WebP")]
    UnsupportedType(String),

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("Image dimensions {width}x{height} exceed the {MAX_DIMENSION_PX}px limit")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("File is not a valid PNG")]
    MalformedPng,

    #[error("Label must be at most {MAX_LABEL_CHARS} characters")]
    LabelTooLong,
}

/// Validate an uploaded image: size cap, MIME allowlist, and the PNG
/// dimension gate.
pub fn validate_upload(content_type: &str, bytes: &[u8]) -> Result<(), UploadError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::FileTooLarge {
            actual: bytes.len(),
        });
    }
    if bytes.is_empty() {
        return Err(UploadError::EmptyFile);
    }
    if !ALLOWED_MIME_TYPES.contains(&content_type) {
        return Err(UploadError::UnsupportedType(content_type.to_string()));
    }

    if content_type == "image/png" {
        let (width, height) = png_dimensions(bytes).ok_or(UploadError::MalformedPng)?;
        if width > MAX_DIMENSION_PX || height > MAX_DIMENSION_PX {
            return Err(UploadError::DimensionsTooLarge { width, height });
        }
    }

    Ok(())
}

/// Read width and height from a PNG header without decoding pixel data.
///
/// Checks the 8-byte signature and the IHDR chunk that must immediately
/// follow it; width and height are big-endian u32s at offsets 16 and 20.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || bytes[..8] != PNG_SIGNATURE {
        return None;
    }
    if &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

/// Normalize the optional label field: trim, default, enforce the length cap.
pub fn normalize_label(label: Option<&str>) -> Result<String, UploadError> {
    let trimmed = label.map(str::trim).unwrap_or("");
    if trimmed.is_empty() {
        return Ok(DEFAULT_LABEL.to_string());
    }
    if trimmed.chars().count() > MAX_LABEL_CHARS {
        return Err(UploadError::LabelTooLong);
    }
    Ok(trimmed.to_string())
}
