//! The generative-text collaborator.
//!
//! The oracle is an opaque text-in/text-out function: one prompt, one
//! unstructured reply, no streaming, no structured-output guarantee. Whether
//! the reply contains a usable JSON array is the extraction parser's problem.

pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

/// Errors from the text-generation service.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("model reply contained no text")]
    EmptyReply,
}

/// Text-in/text-out generation seam. Production uses [`GeminiClient`]; tests
/// substitute canned replies.
#[async_trait]
pub trait TextOracle: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;
}
