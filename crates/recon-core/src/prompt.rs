//! Context window assembly and the grounded-answer prompt.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub extension: String,
    pub file_size: u64,
    pub total_chunks: u64,
}

/// A retrieved chunk with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    pub path: String,
    pub chunk: u64,
    pub score: f32,
    pub text: String,
    pub metadata: ContextMetadata,
}

impl ContextResult {
    /// Build from a search hit payload. Missing fields fall back to
    /// `"unknown"` path, chunk 0, empty text and a single total chunk.
    #[must_use]
    pub fn from_payload(score: f32, payload: &std::collections::HashMap<String, Value>) -> Self {
        let str_field = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_owned);
        let u64_field = |key: &str| payload.get(key).and_then(Value::as_u64);

        Self {
            path: str_field("path").unwrap_or_else(|| "unknown".into()),
            chunk: u64_field("chunk").unwrap_or(0),
            score,
            text: str_field("text").unwrap_or_default(),
            metadata: ContextMetadata {
                extension: str_field("extension").unwrap_or_default(),
                file_size: u64_field("file_size").unwrap_or(0),
                total_chunks: u64_field("total_chunks").unwrap_or(1),
            },
        }
    }
}

fn attributed(ctx: &ContextResult) -> String {
    format!(
        "// Source: {} (chunk {}, score: {:.3})\n{}",
        ctx.path, ctx.chunk, ctx.score, ctx.text
    )
}

/// Join attributed contexts in the given order until the next one would push
/// the cumulative length past `max_chars`. Contexts are never truncated.
#[must_use]
pub fn assemble_context(contexts: &[ContextResult], max_chars: usize) -> String {
    let mut parts = Vec::new();
    let mut total = 0usize;

    for ctx in contexts {
        let part = attributed(ctx);
        let len = part.chars().count();
        if total + len > max_chars {
            break;
        }
        total += len;
        parts.push(part);
    }

    parts.join("\n\n")
}

#[must_use]
pub fn build_prompt(query: &str, context_text: &str) -> String {
    format!(
        "You are an expert software architect analyzing the Strategic Khaos sovereignty architecture.

Use ONLY the provided code context to answer questions accurately and comprehensively.
If the context doesn't contain relevant information, say so clearly.

Context:
{context_text}

Question: {query}

Provide a detailed, technical answer based on the code context above:"
    )
}
