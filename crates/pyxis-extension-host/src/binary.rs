//! Binary asset detection and data-URL round-tripping
//!
//! Package assets with a binary extension are fetched as bytes, carried
//! through install pipelines as data URLs and persisted as blobs. The codec
//! here owns the extension allow-list, the MIME map and the strict data-URL
//! parser.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pyxis_extension_sdk::error::{ExtensionError, Result};
use pyxis_extension_sdk::record::Blob;

/// MIME fallback for paths with no known extension
pub const OCTET_STREAM: &str = "application/octet-stream";

// Chunk length must be a multiple of 3 so chunk encodings concatenate into
// one valid base64 payload.
const ENCODE_CHUNK: usize = 30 * 1024;

/// File extensions classified as binary, with their MIME types.
const BINARY_EXTENSIONS: &[(&str, &str)] = &[
    // Images
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("ico", "image/x-icon"),
    ("svg", "image/svg+xml"),
    // Fonts
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("eot", "application/vnd.ms-fontobject"),
    // Executables and documents
    ("wasm", "application/wasm"),
    ("pdf", "application/pdf"),
    // Audio
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    // Video
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
];

fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether the path names a binary asset.
pub fn is_binary(path: &str) -> bool {
    match extension_of(path) {
        Some(ext) => BINARY_EXTENSIONS.iter().any(|(e, _)| *e == ext),
        None => false,
    }
}

/// The MIME type for a path, from the binary extension map.
pub fn mime_for_path(path: &str) -> Option<&'static str> {
    let ext = extension_of(path)?;
    BINARY_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Encode bytes as a `data:` URL, deriving the MIME type from `path`.
pub fn bytes_to_data_url(bytes: &[u8], path: Option<&str>) -> String {
    let mime = path.and_then(mime_for_path).unwrap_or(OCTET_STREAM);
    let mut payload = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(ENCODE_CHUNK) {
        payload.push_str(&STANDARD.encode(chunk));
    }
    format!("data:{};base64,{}", mime, payload)
}

/// Decode a strict `data:<mime>;base64,<payload>` URL into a blob.
pub fn data_url_to_blob(data_url: &str) -> Result<Blob> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| ExtensionError::InvalidDataUrl("missing data: scheme".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| ExtensionError::InvalidDataUrl("missing payload separator".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| ExtensionError::InvalidDataUrl("payload is not base64".to_string()))?;
    if mime.is_empty() {
        return Err(ExtensionError::InvalidDataUrl(
            "missing MIME type".to_string(),
        ));
    }
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ExtensionError::InvalidDataUrl(format!("bad base64 payload: {}", e)))?;
    Ok(Blob::new(mime, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_binary() {
        assert!(is_binary("assets/logo.png"));
        assert!(is_binary("FONT.WOFF2"));
        assert!(is_binary("mod.wasm"));
        assert!(!is_binary("index.js"));
        assert!(!is_binary("README"));
        assert!(!is_binary(".gitignore"));
    }

    #[test]
    fn test_data_url_roundtrip() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let url = bytes_to_data_url(&bytes, Some("img/pixel.png"));
        assert!(url.starts_with("data:image/png;base64,"));

        let blob = data_url_to_blob(&url).unwrap();
        assert_eq!(blob.mime_type, "image/png");
        assert_eq!(blob.bytes, bytes);
    }

    #[test]
    fn test_roundtrip_larger_than_chunk() {
        let bytes = vec![0xAB; ENCODE_CHUNK * 2 + 17];
        let url = bytes_to_data_url(&bytes, None);
        assert!(url.starts_with("data:application/octet-stream;base64,"));
        assert_eq!(data_url_to_blob(&url).unwrap().bytes, bytes);
    }

    #[test]
    fn test_data_url_rejects_other_shapes() {
        assert!(data_url_to_blob("http://x/y.png").is_err());
        assert!(data_url_to_blob("data:image/png,plain").is_err());
        assert!(data_url_to_blob("data:;base64,AAAA").is_err());
        assert!(data_url_to_blob("data:image/png;base64,!!!").is_err());
    }

    #[test]
    fn test_mime_fallback() {
        let url = bytes_to_data_url(b"x", Some("file.unknownext"));
        assert!(url.starts_with("data:application/octet-stream;base64,"));
    }
}
