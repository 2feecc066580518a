//! HTTP clients for the embedding and completion services.
//!
//! Both services are consumed as plain network endpoints: the embedding server
//! turns batches of text into fixed-dimension vectors, the completion server
//! turns a prompt into generated text. Every call carries an explicit timeout
//! and runs under a capped retry policy.

pub mod completion;
pub mod embed;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod provider;
pub mod retry;

pub use completion::{CompletionClient, GenerationParams};
pub use embed::{EmbedderHealth, EmbeddingClient};
pub use error::{LlmError, Result};
pub use provider::{CompletionProvider, EmbeddingProvider};
pub use retry::RetryPolicy;
