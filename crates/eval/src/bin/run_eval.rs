use anyhow::{Context, Result};
use api::{AppConfig, AppState, services};
use eval::{EvalReport, Evaluator, contract_test_set};
use std::path::{Path, PathBuf};

const INDEX_NAME: &str = "eval_doc";
const REPORT_PATH: &str = "evaluation_report.json";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    api::init_tracing();

    let file = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/test_contract.pdf"));

    println!("=== Contract QA Evaluation ===\n");
    println!("Document: {}", file.display());

    let config = AppConfig::from_env().context("invalid configuration")?;
    let embedder = services::build_embedder(&config)?;
    let llm = services::build_llm(&config)?;
    let pipeline = services::build_pipeline(&config, embedder)?;
    let state = AppState::new(config, pipeline, llm);

    let document = state
        .pipeline
        .ingest(&file, INDEX_NAME)
        .await
        .with_context(|| format!("Failed to ingest {}", file.display()))?;
    println!("Indexed {} chunks\n", document.len());

    let cases = contract_test_set();
    let evaluator = Evaluator::new(state.qa_for(document)).with_k(state.config.answer.default_k);
    let report = evaluator.run(&cases).await?;

    print_report(&report);

    report.save(Path::new(REPORT_PATH))?;
    println!("\nReport saved: {}", REPORT_PATH);

    Ok(())
}

fn print_report(report: &EvalReport) {
    for (i, result) in report.detailed_results.iter().enumerate() {
        println!("[{}] {}", i + 1, result.question);
        println!("    answer:  {}", result.answer);
        println!(
            "    score:   {:.0}%  quality: {:?}  sources: {}  latency: {:.0}ms",
            result.metrics.keyword_score * 100.0,
            result.metrics.quality,
            result.metrics.num_sources,
            result.metrics.latency_ms
        );
    }

    let s = &report.summary;
    println!("\nEvaluation Summary");
    println!("{}", "=".repeat(60));
    println!("Total Questions: {}", s.total_questions);
    println!(
        "Good Answers: {}/{} ({:.0}%)",
        s.good_answers,
        s.total_questions,
        s.success_rate * 100.0
    );
    println!("Average Accuracy: {:.0}%", s.avg_keyword_score * 100.0);
    println!("Average Sources: {:.1}", s.avg_sources);
    println!("Latency p50/p95: {:.0}ms / {:.0}ms", s.p50_latency_ms, s.p95_latency_ms);
    println!("{}", "=".repeat(60));
}
