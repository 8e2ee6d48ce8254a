use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::{QueryError, Result};
use crate::guardrail::Guardrail;
use crate::llm::CompletionService;
use crate::prompt::{build_qa_prompt, build_summary_prompt, truncate_chars};
use crate::retriever::{Retriever, SourceCitation};

pub const NO_RELEVANT_INFO: &str = "I cannot find relevant information in the document";

const SUMMARY_QUERY: &str = "main topics summary overview";
const SUMMARY_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QaConfig {
    /// Context budget handed to the model, in chars
    pub max_context_chars: usize,
    /// Oldest records are dropped past this; `None` keeps everything
    pub max_history: Option<usize>,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 3000,
            max_history: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceCitation>,
    pub num_sources: usize,
    pub guardrail_triggered: bool,
}

impl QaResponse {
    fn without_sources(question: &str, answer: String, guardrail_triggered: bool) -> Self {
        Self {
            question: question.to_string(),
            answer,
            sources: Vec::new(),
            num_sources: 0,
            guardrail_triggered,
        }
    }
}

/// Guardrail -> retrieval -> prompt -> completion, with a running Q/A log
pub struct QaSystem {
    retriever: Retriever,
    llm: Arc<dyn CompletionService>,
    guardrail: Guardrail,
    config: QaConfig,
    history: Mutex<VecDeque<QaRecord>>,
}

impl QaSystem {
    pub fn new(retriever: Retriever, llm: Arc<dyn CompletionService>, config: QaConfig) -> Self {
        Self {
            retriever,
            llm,
            guardrail: Guardrail::new(),
            config,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn ask(&self, question: &str, k: usize) -> Result<QaResponse> {
        let verdict = self.guardrail.check(question);
        if !verdict.passed {
            info!(reason = %verdict.reason, "guardrail rejected question");
            return Ok(QaResponse::without_sources(
                question,
                format!("Warning: {}", verdict.reason),
                true,
            ));
        }

        let retrieved = self.retriever.retrieve(question, k).await?;
        if retrieved.is_empty() {
            info!(index = self.retriever.document().name(), "no relevant chunks");
            return Ok(QaResponse::without_sources(
                question,
                NO_RELEVANT_INFO.to_string(),
                false,
            ));
        }

        let context = truncate_chars(&retrieved.context, self.config.max_context_chars);
        let prompt = build_qa_prompt(context, question);

        let answer = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|e| QueryError::ExternalService(e.context("generating answer")))?
            .trim()
            .to_string();

        self.record(question, &answer).await;

        info!(
            index = self.retriever.document().name(),
            sources = retrieved.sources.len(),
            context_chars = context.chars().count(),
            "answered question"
        );

        Ok(QaResponse {
            question: question.to_string(),
            answer,
            num_sources: retrieved.sources.len(),
            sources: retrieved.sources,
            guardrail_triggered: false,
        })
    }

    pub async fn summarize(&self) -> Result<String> {
        let hits = self.retriever.search(SUMMARY_QUERY, SUMMARY_K).await?;
        if hits.is_empty() {
            return Ok(NO_RELEVANT_INFO.to_string());
        }

        let combined = hits
            .iter()
            .map(|hit| hit.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = build_summary_prompt(truncate_chars(&combined, self.config.max_context_chars));

        let summary = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|e| QueryError::ExternalService(e.context("generating summary")))?;

        Ok(summary.trim().to_string())
    }

    pub async fn history(&self) -> Vec<QaRecord> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    async fn record(&self, question: &str, answer: &str) {
        let mut history = self.history.lock().await;
        history.push_back(QaRecord {
            question: question.to_string(),
            answer: answer.to_string(),
        });

        if let Some(max) = self.config.max_history {
            while history.len() > max {
                history.pop_front();
            }
        }
    }
}
