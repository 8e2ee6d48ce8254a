/// Sentence the model is told to emit when the context lacks the answer
pub const FALLBACK_SENTENCE: &str = "I cannot find this information in the document.";

pub fn build_qa_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are a helpful assistant analyzing documents.
Answer ONLY based on the context provided.
If the answer is not in the context, say exactly: "{}"
Do not make up information.

Context:
{}

Question: {}

Answer:"#,
        FALLBACK_SENTENCE, context, question
    )
}

pub fn build_summary_prompt(content: &str) -> String {
    format!(
        r#"Summarize the following document in simple clear points:

{}

Summary:"#,
        content
    )
}

/// First `max_chars` chars of `text`. Chars, not model tokens.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
