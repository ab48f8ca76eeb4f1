//! Test doubles for [`Extractor`] and [`Llm`] that script a fixed sequence
//! of outcomes per call, so Worker tests can exercise retry and back-off
//! behaviour deterministically.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{ExtractionError, ExtractionErrorKind, ExtractionResult};
use crate::traits::{Extractor, Llm};

/// A scripted outcome for one call.
#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Ok(T),
    Err(ExtractionErrorKind, String),
}

/// `Extractor` double that returns a queued sequence of outcomes per
/// `file_type`, falling back to echoing the bytes as text once the queue
/// for that type is exhausted.
#[derive(Default)]
pub struct MockExtractor {
    queued: Mutex<HashMap<String, Vec<Scripted<String>>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a sequence of outcomes for calls with the given `file_type`.
    /// Consumed front-to-back; later calls after the queue is drained
    /// default to a plaintext echo.
    pub fn queue(&self, file_type: &str, outcomes: Vec<Scripted<String>>) {
        self.queued.lock().unwrap().insert(file_type.to_string(), outcomes);
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract_text(&self, bytes: &[u8], file_type: &str) -> ExtractionResult<String> {
        let mut queued = self.queued.lock().unwrap();
        if let Some(outcomes) = queued.get_mut(file_type) {
            if !outcomes.is_empty() {
                return match outcomes.remove(0) {
                    Scripted::Ok(text) => Ok(text),
                    Scripted::Err(kind, message) => Err(ExtractionError::new(kind, message)),
                };
            }
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// `Llm` double mirroring [`MockExtractor`]'s scripting model, keyed by
/// `source_name`.
#[derive(Default)]
pub struct MockLlm {
    queued: Mutex<HashMap<String, Vec<Scripted<Value>>>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, source_name: &str, outcomes: Vec<Scripted<Value>>) {
        self.queued.lock().unwrap().insert(source_name.to_string(), outcomes);
    }
}

#[async_trait]
impl Llm for MockLlm {
    async fn extract_structured(&self, chunk: &str, source_name: &str) -> ExtractionResult<Value> {
        let mut queued = self.queued.lock().unwrap();
        if let Some(outcomes) = queued.get_mut(source_name) {
            if !outcomes.is_empty() {
                return match outcomes.remove(0) {
                    Scripted::Ok(value) => Ok(value),
                    Scripted::Err(kind, message) => Err(ExtractionError::new(kind, message)),
                };
            }
        }
        Ok(json!({ "source_document": source_name, "text": chunk }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extractor_replays_queued_outcomes_in_order() {
        let extractor = MockExtractor::new();
        extractor.queue(
            "pdf",
            vec![
                Scripted::Err(ExtractionErrorKind::RateLimit, "rate limited".into()),
                Scripted::Ok("recovered text".into()),
            ],
        );

        let first = extractor.extract_text(b"x", "pdf").await;
        assert!(first.is_err());
        let second = extractor.extract_text(b"x", "pdf").await.unwrap();
        assert_eq!(second, "recovered text");
    }

    #[tokio::test]
    async fn llm_falls_back_to_echo_once_drained() {
        let llm = MockLlm::new();
        llm.queue("a.pdf", vec![Scripted::Ok(json!({"k": "v"}))]);

        let first = llm.extract_structured("chunk", "a.pdf").await.unwrap();
        assert_eq!(first["k"], "v");
        let second = llm.extract_structured("chunk", "a.pdf").await.unwrap();
        assert_eq!(second["text"], "chunk");
    }
}
