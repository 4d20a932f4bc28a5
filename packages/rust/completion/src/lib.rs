//! Text generation backends.
//!
//! [`CompletionClient`] is the seam the chat session calls through;
//! [`GeminiClient`] implements it against the Generative Language API.

mod gemini;

use async_trait::async_trait;

use docchat_shared::Result;

pub use gemini::GeminiClient;

/// A remote text-generation service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one fully composed prompt and return the generated text.
    ///
    /// Transport, auth, quota and safety-block failures are all
    /// `GenerationFailed`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logs and status lines.
    fn model(&self) -> &str;
}
