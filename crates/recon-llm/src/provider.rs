use std::future::Future;
use std::pin::Pin;

use crate::embed::EmbedderHealth;
use crate::error::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns batches of text into fixed-dimension vectors.
///
/// Implementations must return exactly one vector per input text, in input order.
pub trait EmbeddingProvider: Send + Sync {
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

    /// Embed a single text.
    fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
        Box::pin(async move {
            let texts = [text.to_owned()];
            let mut vectors = self.embed_batch(&texts).await?;
            vectors.pop().ok_or(crate::LlmError::EmptyResponse {
                service: "embedder",
            })
        })
    }

    fn health(&self) -> BoxFuture<'_, Result<EmbedderHealth>>;
}

/// Generates text from a prompt.
pub trait CompletionProvider: Send + Sync {
    /// Returns the trimmed generated text. Empty output is reported as
    /// `LlmError::EmptyResponse`.
    fn complete<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;

    fn health(&self) -> BoxFuture<'_, Result<()>>;
}
