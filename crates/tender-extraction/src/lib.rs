//! External extraction contracts: file-to-text parsing and LLM structured
//! extraction. The Worker calls through the [`Extractor`]/[`Llm`] traits
//! and never depends on a concrete parser or model client directly.

pub mod echo_llm;
pub mod error;
pub mod mock;
pub mod plaintext;
pub mod traits;

pub use echo_llm::EchoLlm;
pub use error::{ExtractionError, ExtractionErrorKind, ExtractionResult};
pub use mock::{MockExtractor, MockLlm, Scripted};
pub use plaintext::PlaintextExtractor;
pub use traits::{chunk_text, Extractor, Llm};
