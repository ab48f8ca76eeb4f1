//! External contracts the core consumes: file-format parsing and LLM
//! structured extraction. Concrete parser/LLM clients live outside this
//! crate; what's here is the seam the Worker calls through.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ExtractionResult;

/// Parses raw file bytes into plain text. One implementation per supported
/// format family lives behind this trait in a full deployment; this crate
/// ships a plaintext-passthrough implementation and a test double.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract plain text from `bytes`, a file of the given `file_type`
    /// (lowercase extension, no leading dot).
    async fn extract_text(&self, bytes: &[u8], file_type: &str) -> ExtractionResult<String>;
}

/// Calls out to a large language model to turn a chunk of extracted text
/// into structured JSON. Must surface rate-limit responses as a
/// distinguishable [`crate::error::ExtractionErrorKind::RateLimit`] so the
/// Worker can apply the extended back-off floor.
#[async_trait]
pub trait Llm: Send + Sync {
    /// Extract structured data from `chunk`, a slice of a document
    /// originating from `source_name`.
    async fn extract_structured(&self, chunk: &str, source_name: &str) -> ExtractionResult<Value>;
}

/// Split `text` into chunks no larger than `max_chars`, breaking on
/// paragraph boundaries where possible so a single LLM call sees coherent
/// context.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.len() <= max_chars {
        return if text.trim().is_empty() { Vec::new() } else { vec![text.to_string()] };
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for paragraph in text.split("\n\n") {
        if paragraph.trim().is_empty() {
            continue;
        }
        if !current.is_empty() && current.len() + paragraph.len() + 2 > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if paragraph.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            for piece in paragraph.as_bytes().chunks(max_chars) {
                chunks.push(String::from_utf8_lossy(piece).into_owned());
            }
            continue;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("hello world", 1000);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("   ", 1000).is_empty());
    }

    #[test]
    fn long_text_is_split_on_paragraph_boundaries() {
        let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(40));
        let chunks = chunk_text(&text, 50);
        assert_eq!(chunks.len(), 2);
    }
}
