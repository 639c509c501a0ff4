//! Tree-summarize answer synthesis.
//!
//! Retrieved chunks are packed into as few prompts as the generation model's
//! context window allows. Each prompt is answered; when more than one partial
//! answer comes back, the partial answers are packed and answered again until
//! a single answer remains.

use crate::error::Error;
use crate::qa::client::{GenerationParams, ProviderClient};

/// Answer returned when there is no indexed context at all
pub const EMPTY_RESPONSE: &str = "Empty Response";

/// Rough characters-per-token ratio for English prose
const CHARS_PER_TOKEN: usize = 4;

/// Tokens reserved for the prompt template itself
const TEMPLATE_OVERHEAD_TOKENS: usize = 128;

/// Smallest context budget ever used, in characters
const MIN_BUDGET_CHARS: usize = 256;

const PACK_SEPARATOR: &str = "\n\n";

/// Characters of context that fit in one prompt
pub(crate) fn context_budget_chars(
    context_window_tokens: usize,
    max_output_tokens: u32,
    question: &str,
) -> usize {
    let question_tokens = question.chars().count() / CHARS_PER_TOKEN + 1;
    let available = context_window_tokens
        .saturating_sub(max_output_tokens as usize)
        .saturating_sub(TEMPLATE_OVERHEAD_TOKENS)
        .saturating_sub(question_tokens);
    (available * CHARS_PER_TOKEN).max(MIN_BUDGET_CHARS)
}

pub(crate) fn summary_prompt(context: &str, question: &str) -> String {
    format!(
        "Context information from multiple sources is below.\n\
         ---------------------\n\
         {}\n\
         ---------------------\n\
         Given the information from multiple sources and not prior knowledge, answer the query.\n\
         Query: {}\n\
         Answer: ",
        context, question
    )
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Split a text that exceeds the budget at word boundaries
fn split_to_budget(text: &str, budget: usize) -> Vec<String> {
    if char_len(text) <= budget {
        return vec![text.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let word = if char_len(word) > budget {
            truncate_chars(word, budget)
        } else {
            word.to_string()
        };

        if current.is_empty() {
            current = word;
        } else if char_len(&current) + 1 + char_len(&word) <= budget {
            current.push(' ');
            current.push_str(&word);
        } else {
            pieces.push(std::mem::replace(&mut current, word));
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Greedily pack texts, in order, into contexts of at most `budget` characters
pub(crate) fn pack(texts: &[String], budget: usize) -> Vec<String> {
    let mut packs = Vec::new();
    let mut current = String::new();

    for piece in texts.iter().flat_map(|t| split_to_budget(t, budget)) {
        if current.is_empty() {
            current = piece;
        } else if char_len(&current) + PACK_SEPARATOR.len() + char_len(&piece) <= budget {
            current.push_str(PACK_SEPARATOR);
            current.push_str(&piece);
        } else {
            packs.push(std::mem::replace(&mut current, piece));
        }
    }
    if !current.is_empty() {
        packs.push(current);
    }
    packs
}

/// Answer `question` from `texts` by recursive summarization
pub(crate) async fn tree_summarize(
    client: &ProviderClient,
    params: GenerationParams,
    question: &str,
    texts: Vec<String>,
    budget: usize,
) -> Result<String, Error> {
    let mut texts = texts;
    let mut round = 0;

    loop {
        round += 1;
        let packs = pack(&texts, budget);
        tracing::debug!(
            "Synthesis round {}: {} text(s) in {} prompt(s)",
            round,
            texts.len(),
            packs.len()
        );

        let mut answers = Vec::with_capacity(packs.len());
        for context in &packs {
            let answer = client
                .complete(&summary_prompt(context, question), params)
                .await?;
            answers.push(answer.trim().to_string());
        }

        if answers.len() <= 1 {
            return Ok(answers.pop().unwrap_or_default());
        }

        texts = if answers.len() >= texts.len() {
            // Partial answers too long to combine; force a final round
            vec![truncate_chars(&answers.join(PACK_SEPARATOR), budget)]
        } else {
            answers
        };
    }
}
