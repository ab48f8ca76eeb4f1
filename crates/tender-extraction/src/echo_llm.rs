//! A minimal `Llm` that wraps its input chunk into a JSON envelope without
//! calling any model. Stands in for the real LLM client this crate's
//! contract is written against.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ExtractionResult;
use crate::traits::Llm;

/// Echoes `chunk` back as `{"source_document": source_name, "text": chunk}`.
#[derive(Debug, Default)]
pub struct EchoLlm;

impl EchoLlm {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Llm for EchoLlm {
    async fn extract_structured(&self, chunk: &str, source_name: &str) -> ExtractionResult<Value> {
        Ok(json!({
            "source_document": source_name,
            "text": chunk,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_chunk_with_provenance() {
        let llm = EchoLlm::new();
        let value = llm.extract_structured("body", "a.pdf").await.unwrap();
        assert_eq!(value["source_document"], "a.pdf");
        assert_eq!(value["text"], "body");
    }
}
