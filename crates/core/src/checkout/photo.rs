//! Cash-payment verification photos.
//!
//! Photos arrive either as a `data:` URL produced by the in-page camera
//! capture or as raw bytes from the file-picker fallback. Both are checked
//! against the image's magic bytes before anything is stored.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest photo accepted, in bytes.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Errors from decoding a cash photo.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhotoError {
    #[error("No photo was provided")]
    Empty,
    #[error("Photo is too large (maximum {max_mb} MB)")]
    TooLarge { max_mb: usize },
    #[error("Unsupported image type: {0}")]
    UnsupportedType(String),
    #[error("Photo could not be read")]
    Malformed,
    #[error("File does not look like a {0} image")]
    ContentMismatch(&'static str),
}

/// Image encodings accepted for cash photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Parse a MIME type such as `image/jpeg`. Parameters are ignored.
    ///
    /// # Errors
    ///
    /// Returns `PhotoError::UnsupportedType` for anything other than JPEG,
    /// PNG or WebP.
    pub fn from_mime(mime: &str) -> Result<Self, PhotoError> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/webp" => Ok(Self::Webp),
            _ => Err(PhotoError::UnsupportedType(essence.to_string())),
        }
    }

    /// Detect the format from the leading bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()) {
            Some(Self::Webp)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Webp => "WebP",
        }
    }
}

/// A decoded, validated cash photo.
#[derive(Clone, PartialEq, Eq)]
pub struct CashPhoto {
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for CashPhoto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CashPhoto")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl CashPhoto {
    /// Decode a `data:image/...;base64,...` URL from the camera capture.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not base64 image data, the image type
    /// is unsupported, the payload is too large, or the bytes do not match
    /// the declared type.
    pub fn from_data_url(data_url: &str) -> Result<Self, PhotoError> {
        let data_url = data_url.trim();
        if data_url.is_empty() {
            return Err(PhotoError::Empty);
        }

        let rest = data_url.strip_prefix("data:").ok_or(PhotoError::Malformed)?;
        let (meta, payload) = rest.split_once(',').ok_or(PhotoError::Malformed)?;
        let mime = meta.strip_suffix(";base64").ok_or(PhotoError::Malformed)?;
        let format = ImageFormat::from_mime(mime)?;

        // Reject before decoding: base64 expands by 4/3.
        if payload.len() / 4 * 3 > MAX_PHOTO_BYTES {
            return Err(too_large());
        }

        let bytes = STANDARD
            .decode(payload)
            .map_err(|_| PhotoError::Malformed)?;
        Self::checked(format, bytes)
    }

    /// Accept bytes from a file upload.
    ///
    /// The declared content type, when present, must agree with the bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is empty, too large, or not a
    /// supported image.
    pub fn from_upload(content_type: Option<&str>, bytes: Vec<u8>) -> Result<Self, PhotoError> {
        if bytes.is_empty() {
            return Err(PhotoError::Empty);
        }
        let format = match content_type {
            Some(mime) if mime != "application/octet-stream" => ImageFormat::from_mime(mime)?,
            _ => ImageFormat::sniff(&bytes)
                .ok_or_else(|| PhotoError::UnsupportedType("unknown".to_string()))?,
        };
        Self::checked(format, bytes)
    }

    fn checked(format: ImageFormat, bytes: Vec<u8>) -> Result<Self, PhotoError> {
        if bytes.is_empty() {
            return Err(PhotoError::Empty);
        }
        if bytes.len() > MAX_PHOTO_BYTES {
            return Err(too_large());
        }
        if ImageFormat::sniff(&bytes) != Some(format) {
            return Err(PhotoError::ContentMismatch(format.name()));
        }
        Ok(Self { format, bytes })
    }

    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

const fn too_large() -> PhotoError {
    PhotoError::TooLarge {
        max_mb: MAX_PHOTO_BYTES / (1024 * 1024),
    }
}

/// Reference to a stored cash photo, kept on the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashPhotoReceipt {
    /// Object path inside the photo bucket.
    pub path: String,
    pub format: ImageFormat,
    pub size: usize,
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Smallest byte string that sniffs as JPEG.
    pub(crate) fn jpeg_bytes() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F']
    }

    #[test]
    fn test_from_data_url() {
        let url = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg_bytes()));
        let photo = CashPhoto::from_data_url(&url).unwrap();
        assert_eq!(photo.format(), ImageFormat::Jpeg);
        assert_eq!(photo.bytes(), jpeg_bytes().as_slice());
    }

    #[test]
    fn test_data_url_rejects_garbage() {
        assert_eq!(CashPhoto::from_data_url(""), Err(PhotoError::Empty));
        assert_eq!(
            CashPhoto::from_data_url("https://example.com/cash.jpg"),
            Err(PhotoError::Malformed)
        );
        assert_eq!(
            CashPhoto::from_data_url("data:image/jpeg;base64,@@@"),
            Err(PhotoError::Malformed)
        );
        assert!(matches!(
            CashPhoto::from_data_url("data:text/plain;base64,aGk="),
            Err(PhotoError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_declared_type_must_match_bytes() {
        let png_claiming_jpeg = format!(
            "data:image/jpeg;base64,{}",
            STANDARD.encode(b"\x89PNG\r\n\x1a\nrest")
        );
        assert_eq!(
            CashPhoto::from_data_url(&png_claiming_jpeg),
            Err(PhotoError::ContentMismatch("JPEG"))
        );
    }

    #[test]
    fn test_from_upload_sniffs_when_untyped() {
        let photo = CashPhoto::from_upload(None, b"RIFF\0\0\0\0WEBPVP8 ".to_vec()).unwrap();
        assert_eq!(photo.format(), ImageFormat::Webp);

        assert_eq!(CashPhoto::from_upload(Some("image/png"), Vec::new()), Err(PhotoError::Empty));
        assert!(matches!(
            CashPhoto::from_upload(Some("application/pdf"), b"%PDF".to_vec()),
            Err(PhotoError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let mut bytes = jpeg_bytes();
        bytes.resize(MAX_PHOTO_BYTES + 1, 0);
        assert_eq!(
            CashPhoto::from_upload(Some("image/jpeg"), bytes),
            Err(PhotoError::TooLarge { max_mb: 10 })
        );
    }

    #[test]
    fn test_mime_parameters_ignored() {
        assert_eq!(
            ImageFormat::from_mime("image/PNG; charset=binary"),
            Ok(ImageFormat::Png)
        );
    }
}
