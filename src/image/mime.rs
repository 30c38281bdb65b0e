pub const JPEG: &str = "image/jpeg";
pub const PNG: &str = "image/png";
pub const WEBP: &str = "image/webp";
pub const GIF: &str = "image/gif";

/// Identifies an image format from its leading magic bytes.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some(JPEG),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some(PNG),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some(WEBP),
        [0x47, 0x49, 0x46, 0x38, ..] => Some(GIF),
        _ => {
            tracing::debug!(
                "Unrecognized image header: {:02X?}",
                &bytes[..bytes.len().min(4)]
            );
            None
        }
    }
}
