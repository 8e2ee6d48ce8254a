use serde::{Deserialize, Serialize};

/// Topics rejected on sight. Plain substring match, so "drugstore" is
/// rejected too.
pub const FORBIDDEN_TOPICS: &[&str] = &[
    "password", "hack", "weapon", "illegal", "drug", "violence", "exploit",
];

pub const MIN_QUESTION_CHARS: usize = 3;
pub const MAX_QUESTION_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    pub passed: bool,
    /// Empty when passed
    pub reason: String,
}

impl GuardrailVerdict {
    fn pass() -> Self {
        Self {
            passed: true,
            reason: String::new(),
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }
}

/// Lexical pre-filter run before any retrieval or model call
#[derive(Debug, Clone, Copy, Default)]
pub struct Guardrail;

impl Guardrail {
    pub fn new() -> Self {
        Self
    }

    /// First failing rule wins: denylist, then too short, then too long.
    pub fn check(&self, question: &str) -> GuardrailVerdict {
        let lowered = question.to_lowercase();
        if let Some(topic) = FORBIDDEN_TOPICS.iter().find(|t| lowered.contains(*t)) {
            return GuardrailVerdict::fail(format!("Question contains forbidden topic: {}", topic));
        }

        if question.trim().chars().count() < MIN_QUESTION_CHARS {
            return GuardrailVerdict::fail("Question too short");
        }

        if question.chars().count() > MAX_QUESTION_CHARS {
            return GuardrailVerdict::fail("Question too long");
        }

        GuardrailVerdict::pass()
    }
}
