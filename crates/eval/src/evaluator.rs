use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use query::{DEFAULT_K, QaSystem};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::test_set::{EvalCase, Quality, score_answer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerMetrics {
    pub keyword_score: f64,
    pub answer_length: usize,
    pub num_sources: usize,
    pub guardrail: bool,
    pub quality: Quality,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub question: String,
    pub answer: String,
    pub metrics: AnswerMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSummary {
    pub total_questions: usize,
    pub good_answers: usize,
    pub success_rate: f64,
    pub avg_keyword_score: f64,
    pub avg_sources: f64,
    pub p50_latency_ms: f64,
    pub p95_latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub timestamp: DateTime<Utc>,
    pub summary: EvalSummary,
    pub detailed_results: Vec<CaseResult>,
}

impl EvalReport {
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        Ok(())
    }
}

pub struct Evaluator {
    qa: QaSystem,
    k: usize,
}

impl Evaluator {
    pub fn new(qa: QaSystem) -> Self {
        Self { qa, k: DEFAULT_K }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub async fn run(&self, cases: &[EvalCase]) -> Result<EvalReport> {
        let mut results = Vec::with_capacity(cases.len());

        for (i, case) in cases.iter().enumerate() {
            let start = Instant::now();
            let response = self
                .qa
                .ask(&case.question, self.k)
                .await
                .with_context(|| format!("question {} failed: {}", i + 1, case.question))?;
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

            let keyword_score = score_answer(&response.answer, &case.expected_keywords);
            let metrics = AnswerMetrics {
                keyword_score,
                answer_length: response.answer.chars().count(),
                num_sources: response.num_sources,
                guardrail: response.guardrail_triggered,
                quality: Quality::classify(&response.answer, keyword_score),
                latency_ms,
            };

            info!(
                case = i + 1,
                keyword_score,
                quality = ?metrics.quality,
                latency_ms,
                "evaluated question"
            );

            results.push(CaseResult {
                question: case.question.clone(),
                answer: response.answer,
                metrics,
            });
        }

        Ok(EvalReport {
            timestamp: Utc::now(),
            summary: summarize(&results),
            detailed_results: results,
        })
    }
}

pub fn summarize(results: &[CaseResult]) -> EvalSummary {
    let total = results.len();
    if total == 0 {
        return EvalSummary {
            total_questions: 0,
            good_answers: 0,
            success_rate: 0.0,
            avg_keyword_score: 0.0,
            avg_sources: 0.0,
            p50_latency_ms: 0.0,
            p95_latency_ms: 0.0,
        };
    }

    let good = results
        .iter()
        .filter(|r| r.metrics.quality == Quality::Good)
        .count();
    let avg_score = results.iter().map(|r| r.metrics.keyword_score).sum::<f64>() / total as f64;
    let avg_sources = results.iter().map(|r| r.metrics.num_sources).sum::<usize>() as f64 / total as f64;

    let mut latencies: Vec<f64> = results.iter().map(|r| r.metrics.latency_ms).collect();
    latencies.sort_by(f64::total_cmp);

    EvalSummary {
        total_questions: total,
        good_answers: good,
        success_rate: round2(good as f64 / total as f64),
        avg_keyword_score: round2(avg_score),
        avg_sources: round2(avg_sources),
        p50_latency_ms: percentile(&latencies, 50),
        p95_latency_ms: percentile(&latencies, 95),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentile(sorted_data: &[f64], p: usize) -> f64 {
    let index = (p as f64 / 100.0 * sorted_data.len() as f64) as usize;
    sorted_data[index.min(sorted_data.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use index::{Embedder, FlatIndex, IndexedDocument, Manifest};
    use ingest::Chunk;
    use query::{CompletionService, QaConfig, Retriever};
    use std::sync::Arc;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn model_name(&self) -> &str {
            "length"
        }
    }

    /// Answers from a fixed question -> answer table
    struct TableLLM;

    #[async_trait]
    impl CompletionService for TableLLM {
        async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            let answer = if prompt.contains("Question: Who are the parties") {
                "The parties are ABC Corporation and XYZ Limited."
            } else if prompt.contains("Question: What is the contract duration") {
                "The contract lasts 12 months."
            } else {
                "I cannot find this information in the document."
            };
            Ok(answer.to_string())
        }

        fn model_name(&self) -> &str {
            "table"
        }
    }

    async fn qa_system() -> QaSystem {
        let texts = [
            "This agreement is made between ABC Corporation and XYZ Limited.",
            "The term of this agreement is 12 months.",
        ];
        let embedder: Arc<dyn Embedder> = Arc::new(LengthEmbedder);

        let mut chunks = Vec::new();
        let mut index = FlatIndex::new();
        for (i, text) in texts.iter().enumerate() {
            chunks.push(Chunk::new(text.to_string(), "contract.pdf".to_string(), i));
            index.add(embedder.embed(text).await.unwrap()).unwrap();
        }
        let document = IndexedDocument {
            manifest: Manifest {
                name: "eval_doc".to_string(),
                source: "contract.pdf".to_string(),
                source_sha256: String::new(),
                chunk_count: chunks.len(),
                chunk_size: 800,
                chunk_overlap: 150,
                embedding_model: "length".to_string(),
            },
            chunks,
            index,
        };

        QaSystem::new(
            Retriever::new(Arc::new(document), embedder),
            Arc::new(TableLLM),
            QaConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_run_scores_each_case() {
        let evaluator = Evaluator::new(qa_system().await);
        let report = evaluator.run(&crate::contract_test_set()).await.unwrap();

        assert_eq!(report.detailed_results.len(), 5);
        let parties = &report.detailed_results[0].metrics;
        assert_eq!(parties.keyword_score, 1.0);
        assert_eq!(parties.quality, Quality::Good);
        assert_eq!(parties.num_sources, 2);
        assert!(!parties.guardrail);

        let value = &report.detailed_results[2].metrics;
        assert_eq!(value.quality, Quality::Poor);

        let summary = &report.summary;
        assert_eq!(summary.total_questions, 5);
        assert_eq!(summary.good_answers, 2);
        assert_eq!(summary.success_rate, 0.4);
        assert_eq!(summary.avg_sources, 2.0);
        assert!(summary.p50_latency_ms <= summary.p95_latency_ms);
    }

    #[tokio::test]
    async fn test_report_is_written_as_json() {
        let evaluator = Evaluator::new(qa_system().await).with_k(1);
        let report = evaluator.run(&crate::contract_test_set()[..1]).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evaluation_report.json");
        report.save(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["summary"]["total_questions"], 1);
        assert_eq!(written["detailed_results"][0]["metrics"]["quality"], "good");
        assert_eq!(written["detailed_results"][0]["metrics"]["num_sources"], 1);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_questions, 0);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn test_percentile() {
        let data = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&data, 50), 30.0);
        assert_eq!(percentile(&data, 95), 40.0);
    }
}
