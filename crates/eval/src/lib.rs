pub mod evaluator;
pub mod test_set;

pub use evaluator::{AnswerMetrics, CaseResult, EvalReport, EvalSummary, Evaluator};
pub use test_set::{EvalCase, Quality, contract_test_set, score_answer};
