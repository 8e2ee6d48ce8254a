use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    pub question: String,
    /// Matched case-insensitively as substrings of the answer
    pub expected_keywords: Vec<String>,
}

impl EvalCase {
    fn new(question: &str, keywords: &[&str]) -> Self {
        Self {
            question: question.to_string(),
            expected_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Fair,
    Poor,
}

impl Quality {
    /// Refusals and near-empty answers are poor whatever they mention
    pub fn classify(answer: &str, keyword_score: f64) -> Self {
        if answer.chars().count() < 10 || answer.to_lowercase().contains("cannot find") {
            Quality::Poor
        } else if keyword_score >= 0.5 {
            Quality::Good
        } else {
            Quality::Fair
        }
    }
}

/// Questions for a standard two-party service contract
pub fn contract_test_set() -> Vec<EvalCase> {
    vec![
        EvalCase::new("Who are the parties in this contract?", &["ABC", "XYZ"]),
        EvalCase::new("What is the contract duration?", &["12", "months"]),
        EvalCase::new("What is the total value?", &["50,000", "$"]),
        EvalCase::new("What are the termination conditions?", &["30", "notice"]),
        EvalCase::new("Who is responsible for damages?", &["ABC"]),
    ]
}

/// Fraction of `keywords` found in `answer`; 0.0 for an empty keyword list
pub fn score_answer(answer: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let answer = answer.to_lowercase();
    let found = keywords
        .iter()
        .filter(|k| answer.contains(&k.to_lowercase()))
        .count();
    found as f64 / keywords.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(k: &[&str]) -> Vec<String> {
        k.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_score_answer() {
        let kw = keywords(&["ABC", "XYZ"]);
        assert_eq!(score_answer("The parties are abc Corp and XYZ Ltd.", &kw), 1.0);
        assert_eq!(score_answer("ABC Corp is the supplier.", &kw), 0.5);
        assert_eq!(score_answer("Nobody.", &kw), 0.0);
        assert_eq!(score_answer("anything", &[]), 0.0);
    }

    #[test]
    fn test_quality_rules() {
        assert_eq!(Quality::classify("12 months", 1.0), Quality::Poor);
        assert_eq!(
            Quality::classify("I cannot find this information in the document.", 1.0),
            Quality::Poor
        );
        assert_eq!(Quality::classify("The term is twelve months.", 0.5), Quality::Good);
        assert_eq!(Quality::classify("The term is one year long.", 0.0), Quality::Fair);
    }

    #[test]
    fn test_contract_set() {
        let cases = contract_test_set();
        assert_eq!(cases.len(), 5);
        assert!(cases.iter().all(|c| !c.expected_keywords.is_empty()));
        assert_eq!(cases[2].expected_keywords, keywords(&["50,000", "$"]));
    }
}
