//! Context compaction
//!
//! Bounds arbitrary text to a hard size limit before it reaches an LLM call.
//! Splitting prefers the most meaningful boundary available (paragraph, line,
//! sentence, word) and falls back to raw character windows, so the bound
//! holds for any input, including text with no boundaries at all.
//!
//! All sizes are measured in Unicode scalar values, never bytes, so
//! multi-byte text cannot be cut inside a code point.

use fathom_core::CompactionConfig;
use std::collections::VecDeque;
use tracing::debug;

/// Boundary separators tried in order of preference.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn truncate_chars(text: &str, budget: usize) -> String {
    text.chars().take(budget).collect()
}

/// Recursive boundary-preferring splitter.
///
/// Produces chunks of at most `chunk_size` characters; consecutive chunks
/// from the same run share up to `chunk_overlap` trailing characters of
/// context.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// Create a splitter. Overlap is clamped below the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        let chunk_overlap = chunk_overlap.min(chunk_size.saturating_sub(1));
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split `text` into chunks of at most `chunk_size` characters.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some((sep, finer)) = separators.split_first() else {
            return self.char_windows(text);
        };
        if !text.contains(sep) {
            return self.split_with(text, finer);
        }

        // Merge runs of small pieces greedily; an oversized piece ends the
        // run and is split again at the next finer boundary.
        let mut chunks = Vec::new();
        let mut run: Vec<&str> = Vec::new();
        for piece in text.split(sep) {
            if char_len(piece) <= self.chunk_size {
                run.push(piece);
            } else {
                if !run.is_empty() {
                    chunks.extend(self.merge_run(&run, sep));
                    run.clear();
                }
                chunks.extend(self.split_with(piece, finer));
            }
        }
        if !run.is_empty() {
            chunks.extend(self.merge_run(&run, sep));
        }
        chunks.retain(|chunk| !chunk.is_empty());
        chunks
    }

    /// Greedy merge of pieces already known to fit one chunk each.
    ///
    /// When the next piece would push the current chunk past `chunk_size`,
    /// the chunk is emitted and pieces shed from the front until the carried
    /// tail is within `chunk_overlap` and the next piece fits.
    fn merge_run(&self, pieces: &[&str], sep: &str) -> Vec<String> {
        let sep_len = char_len(sep);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let piece_len = char_len(piece);
            if !current.is_empty() && total + sep_len + piece_len > self.chunk_size {
                chunks.push(join_pieces(&current, sep));
                while total > self.chunk_overlap
                    || (total + sep_len + piece_len > self.chunk_size && total > 0)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front);
                    if !current.is_empty() {
                        total -= sep_len;
                    }
                }
            }
            if !current.is_empty() {
                total += sep_len;
            }
            current.push_back(piece);
            total += piece_len;
        }
        if !current.is_empty() {
            chunks.push(join_pieces(&current, sep));
        }
        chunks
    }

    /// Last resort for boundary-free text: fixed character windows.
    fn char_windows(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let stride = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        chunks
    }
}

fn join_pieces(pieces: &VecDeque<&str>, sep: &str) -> String {
    pieces.iter().copied().collect::<Vec<_>>().join(sep)
}

/// Deterministic text bounding for LLM prompts.
///
/// `compact` never exceeds its budget and never fails, whatever the input.
#[derive(Debug, Clone)]
pub struct Compactor {
    config: CompactionConfig,
}

impl Compactor {
    pub fn new(config: CompactionConfig) -> Self {
        Self { config }
    }

    /// Bound `text` to at most `budget` characters.
    ///
    /// Splits at the best available boundary and keeps the leading chunk.
    /// When even the leading chunk exceeds the budget, the target chunk size
    /// halves and splitting repeats; at the floor the text is hard-truncated.
    pub fn compact(&self, text: &str, budget: usize) -> String {
        if budget == 0 {
            return String::new();
        }
        if char_len(text) <= budget {
            return text.to_string();
        }

        let mut target = self.config.chunk_size.max(self.config.min_chunk_size);
        loop {
            let overlap = self.config.chunk_overlap.min(target / 2);
            let splitter = RecursiveSplitter::new(target, overlap);
            if let Some(first) = splitter.split(text).into_iter().next() {
                if char_len(&first) <= budget {
                    debug!(
                        budget = budget,
                        target = target,
                        kept = char_len(&first),
                        "Compacted text at boundary"
                    );
                    return first;
                }
            }
            if target <= self.config.min_chunk_size {
                return truncate_chars(text, budget);
            }
            target = (target / 2).max(self.config.min_chunk_size);
        }
    }

    /// Compact `text` until it fits a token budget for `model`.
    ///
    /// Token overflow converts to a character budget (roughly three
    /// characters per token) and the result is re-counted with the real
    /// tokenizer until it fits.
    pub fn bound_to_model_context(&self, text: &str, model: &str, max_tokens: usize) -> String {
        const CHARS_PER_TOKEN: usize = 3;
        let counter = crate::token::get_token_counter(model);
        let mut current = text.to_string();
        loop {
            let tokens = counter.count_tokens(&current);
            if tokens <= max_tokens {
                return current;
            }
            let overflow = tokens - max_tokens;
            let len = char_len(&current);
            let budget = len.saturating_sub(overflow * CHARS_PER_TOKEN);
            if budget <= self.config.min_chunk_size {
                return truncate_chars(&current, self.config.min_chunk_size.min(len));
            }
            current = self.compact(&current, budget);
        }
    }
}

impl Default for Compactor {
    fn default() -> Self {
        Self::new(CompactionConfig::default())
    }
}
