// Sentence Splitting Service
// Deterministic rule-based tokenizer used for sentence-level validation.

use std::collections::HashSet;

/// Splits text into an ordered sequence of sentences.
///
/// Implementations must be deterministic and preserve original sentence
/// order; empty input yields an empty sequence.
pub trait SentenceSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Quote- and decimal-aware rule splitter for Chinese/English text.
#[derive(Debug, Default, Clone)]
pub struct RuleSentenceSplitter;

impl RuleSentenceSplitter {
    pub fn new() -> Self {
        Self
    }
}

impl SentenceSplitter for RuleSentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return vec![];
        }

        let mut sentences = Vec::new();
        let chars: Vec<char> = text.chars().collect();
        // Double quotes only: apostrophes in contractions and possessives
        // are unpaired and would leave the quote state stuck open.
        let quote_chars: HashSet<char> = ['"', '\u{201c}', '\u{201d}'].iter().cloned().collect();

        let mut buffer = String::new();
        let mut in_quote = false;
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            buffer.push(ch);

            // Track quote state
            if quote_chars.contains(&ch) {
                in_quote = !in_quote;
            }

            let mut is_sentence_end = false;
            if ['。', '！', '？', '.', '!', '?'].contains(&ch) {
                // Don't split inside quotes
                if in_quote {
                    i += 1;
                    continue;
                }

                // Check for decimal numbers
                if ch == '.' && i > 0 && i < chars.len() - 1 {
                    if chars[i - 1].is_ascii_digit() && chars[i + 1].is_ascii_digit() {
                        i += 1;
                        continue;
                    }
                }

                is_sentence_end = true;
            }

            if is_sentence_end {
                // Absorb trailing ellipsis-style punctuation runs
                while i < chars.len() - 1 && ['。', '！', '？', '.', '!', '?'].contains(&chars[i + 1]) {
                    i += 1;
                    buffer.push(chars[i]);
                }

                // Skip trailing whitespace
                while i < chars.len() - 1 && [' ', '\t'].contains(&chars[i + 1]) {
                    i += 1;
                    buffer.push(chars[i]);
                }

                let sentence_text = buffer.trim().to_string();
                if !sentence_text.is_empty() {
                    sentences.push(sentence_text);
                }
                buffer.clear();
            }

            i += 1;
        }

        // Handle remaining buffer
        let remaining = buffer.trim().to_string();
        if !remaining.is_empty() {
            sentences.push(remaining);
        }

        sentences
    }
}
