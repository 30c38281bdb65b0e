//! Image attachments sent as inline data parts
//!
//! Holds base64 image data with its MIME type. The built-in asset is a JPEG
//! embedded at build time; files supplied at runtime are encoded on load.

pub mod mime;

use crate::{Error, Result};
use base64::Engine as _;
use std::path::Path;

const EMBEDDED_IMAGE_B64: &str = include_str!("../../data/sample_image.b64");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    mime_type: String,
    data: String,
}

impl ImageAttachment {
    /// Wraps already-encoded data. The base64 text is not validated.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// The JPEG asset compiled into the binary.
    pub fn embedded() -> Self {
        Self::new(mime::JPEG, EMBEDDED_IMAGE_B64.trim())
    }

    /// Encodes raw image bytes, detecting the MIME type from the header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mime_type = mime::sniff_image_mime(bytes)
            .ok_or_else(|| Error::Image("unrecognized image format".to_string()))?;
        let data = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(Self::new(mime_type, data))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        tracing::info!("Loaded image {} ({} bytes)", path.display(), bytes.len());
        Self::from_bytes(&bytes)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Decodes the attachment back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(base64::engine::general_purpose::STANDARD.decode(&self.data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_asset_is_jpeg() {
        let image = ImageAttachment::embedded();
        assert_eq!(image.mime_type(), "image/jpeg");
        assert!(!image.data().ends_with('\n'));

        let bytes = image.decode().unwrap();
        assert_eq!(mime::sniff_image_mime(&bytes), Some(mime::JPEG));
    }

    #[test]
    fn test_from_bytes_encodes_and_detects_mime() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let image = ImageAttachment::from_bytes(&png).unwrap();

        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.data(), "iVBORw0KGgo=");
        assert_eq!(image.decode().unwrap(), png);
    }

    #[test]
    fn test_from_bytes_rejects_unknown_format() {
        let err = ImageAttachment::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, Error::Image(_)));
        assert!(ImageAttachment::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_from_bytes_detects_gif_and_webp() {
        let gif = ImageAttachment::from_bytes(b"GIF89a\x01\x00").unwrap();
        assert_eq!(gif.mime_type(), "image/gif");

        let webp = ImageAttachment::from_bytes(b"RIFF\x00\x00\x00\x00WEBPVP8 ").unwrap();
        assert_eq!(webp.mime_type(), "image/webp");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xDB, 0x00]).unwrap();

        let image = ImageAttachment::from_file(file.path()).unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_from_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageAttachment::from_file(&dir.path().join("missing.jpg")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_decode_invalid_data() {
        let image = ImageAttachment::new("image/jpeg", "***");
        assert!(matches!(image.decode().unwrap_err(), Error::Base64(_)));
    }
}
