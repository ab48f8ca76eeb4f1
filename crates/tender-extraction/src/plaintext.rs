//! A minimal `Extractor` that treats any input as UTF-8 plain text. Stands
//! in for the real PDF/office/OCR parser stack this crate's contract is
//! written against.

use async_trait::async_trait;

use crate::error::{ExtractionError, ExtractionResult};
use crate::traits::Extractor;

/// Decodes file bytes as UTF-8, lossily for non-`txt` types. Rejects empty
/// input as a parse failure since a zero-byte document is never a valid
/// extraction result.
#[derive(Debug, Default)]
pub struct PlaintextExtractor;

impl PlaintextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for PlaintextExtractor {
    async fn extract_text(&self, bytes: &[u8], file_type: &str) -> ExtractionResult<String> {
        if bytes.is_empty() {
            return Err(ExtractionError::parse(format!("empty {file_type} file")));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decodes_utf8_bytes() {
        let extractor = PlaintextExtractor::new();
        let text = extractor.extract_text(b"hello", "txt").await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn rejects_empty_input() {
        let extractor = PlaintextExtractor::new();
        assert!(extractor.extract_text(b"", "pdf").await.is_err());
    }
}
