//! Still-image decoding for synthetic cameras

use crate::errors::CameraError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbaImage;
use std::sync::Arc;

/// Parsed `data:` URI. Borrowed from the source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub media_type: Option<&'a str>,
    pub base64: bool,
    pub payload: &'a str,
}

impl DataUri<'_> {
    /// Payload bytes, base64-decoded when the URI says so.
    pub fn bytes(&self) -> Result<Vec<u8>, CameraError> {
        if !self.base64 {
            return Ok(self.payload.as_bytes().to_vec());
        }
        let compact: String = self
            .payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| CameraError::ImageDecode(format!("invalid base64 payload: {}", e)))
    }
}

/// Split a `data:[<media type>][;base64],<payload>` URI into its parts.
pub fn parse_data_uri(uri: &str) -> Result<DataUri<'_>, CameraError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| CameraError::ImageDecode("image is not a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CameraError::ImageDecode("data URI has no payload".to_string()))?;

    let mut params = header.split(';');
    let media_type = params.next().filter(|m| !m.is_empty());
    let base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    Ok(DataUri {
        media_type,
        base64,
        payload,
    })
}

/// Build a base64 `data:` URI for `bytes`.
pub fn encode_data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}

/// Decode an encoded still image into an RGBA raster at its natural size.
pub fn decode_image(encoded: &str) -> Result<RgbaImage, CameraError> {
    let uri = parse_data_uri(encoded)?;
    let bytes = uri.bytes()?;
    if bytes.is_empty() {
        return Err(CameraError::ImageDecode("image payload is empty".to_string()));
    }

    let decoded = image::load_from_memory(&bytes).map_err(|e| {
        CameraError::ImageDecode(format!(
            "cannot decode {} image: {}",
            uri.media_type.unwrap_or("untyped"),
            e
        ))
    })?;

    let rgba = decoded.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(CameraError::ImageDecode("image has no pixels".to_string()));
    }
    Ok(rgba)
}

/// Decode off the async executor; resolves when decoding completes.
pub async fn decode_image_async(encoded: String) -> Result<Arc<RgbaImage>, CameraError> {
    tokio::task::spawn_blocking(move || decode_image(&encoded))
        .await
        .map_err(|e| CameraError::SynthesisFailure(format!("image decode task failed: {}", e)))?
        .map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{synthetic_data_uri, synthetic_png};

    #[test]
    fn test_parse_data_uri_parts() {
        let uri = parse_data_uri("data:image/png;base64,AAAA").unwrap();
        assert_eq!(uri.media_type, Some("image/png"));
        assert!(uri.base64);
        assert_eq!(uri.payload, "AAAA");

        let plain = parse_data_uri("data:,hello").unwrap();
        assert_eq!(plain.media_type, None);
        assert!(!plain.base64);
        assert_eq!(plain.bytes().unwrap(), b"hello");
    }

    #[test]
    fn test_parse_rejects_non_data_uri() {
        assert!(matches!(
            parse_data_uri("https://example.com/cam.png"),
            Err(CameraError::ImageDecode(_))
        ));
        assert!(matches!(
            parse_data_uri("data:image/png;base64"),
            Err(CameraError::ImageDecode(_))
        ));
    }

    #[test]
    fn test_decode_natural_dimensions() {
        let image = decode_image(&synthetic_data_uri(37, 21)).unwrap();
        assert_eq!(image.dimensions(), (37, 21));
    }

    #[test]
    fn test_decode_tolerates_wrapped_base64() {
        let encoded = STANDARD.encode(synthetic_png(8, 8));
        let wrapped: String = encoded
            .as_bytes()
            .chunks(16)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        let image = decode_image(&format!("data:image/png;base64,{}", wrapped)).unwrap();
        assert_eq!(image.dimensions(), (8, 8));
    }

    #[test]
    fn test_decode_garbage_is_image_decode_error() {
        let uri = encode_data_uri("image/png", b"definitely not a png");
        assert!(matches!(decode_image(&uri), Err(CameraError::ImageDecode(_))));
        assert!(matches!(
            decode_image("data:image/png;base64,@@@"),
            Err(CameraError::ImageDecode(_))
        ));
    }

    #[tokio::test]
    async fn test_decode_async() {
        let image = decode_image_async(synthetic_data_uri(4, 3)).await.unwrap();
        assert_eq!(image.dimensions(), (4, 3));
    }
}
