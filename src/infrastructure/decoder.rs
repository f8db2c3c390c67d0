use crate::domain::ports::BarcodeDecoder;
use async_trait::async_trait;

/// Decoder for gateways that already carry the barcode text as the photo payload.
///
/// Returns the trimmed UTF-8 payload, or `None` for empty or non-UTF-8 bytes,
/// which stands in for "no barcode found on the photo".
#[derive(Debug, Default, Clone, Copy)]
pub struct TextPayloadDecoder;

#[async_trait]
impl BarcodeDecoder for TextPayloadDecoder {
    async fn decode(&self, image: &[u8]) -> Option<String> {
        let text = std::str::from_utf8(image).ok()?.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}
