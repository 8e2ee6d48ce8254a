pub mod error;
pub mod guardrail;
pub mod llm;
pub mod prompt;
pub mod qa;
pub mod retriever;

#[cfg(test)]
mod testing;

pub use error::{QueryError, Result};
pub use guardrail::{Guardrail, GuardrailVerdict};
pub use llm::{ChatCompletionClient, CompletionService, QueryLLM};
pub use qa::{NO_RELEVANT_INFO, QaConfig, QaRecord, QaResponse, QaSystem};
pub use retriever::{CONTEXT_DELIMITER, DEFAULT_K, RetrievedContext, Retriever, SourceCitation};
