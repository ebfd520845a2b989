//! Token heuristics
//!
//! Token counts here are an explicit approximation: one token per four
//! characters. They do not match any vendor tokenizer. The estimate is
//! deterministic and monotonic in text length, which is all callers rely on.

use devguide_types::Document;
use serde::Serialize;
use std::collections::BTreeMap;

/// Characters assumed per token
pub const CHARS_PER_TOKEN: usize = 4;

/// Appended to content shortened by [`truncate_to_budget`]
pub const TRUNCATION_NOTICE: &str = "\n\n... (content truncated for token optimization)";

const OUTLINE_MAX_HEADERS: usize = 10;

/// Approximate token count of `text`
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Shorten `text` so that its estimate fits in `budget`.
///
/// Returns `text` unchanged when it already fits. Otherwise keeps a prefix
/// cut at a line boundary, or at a word boundary inside the first line that
/// does not fit. Only a single word longer than the whole budget is split.
pub fn truncate_to_budget(text: &str, budget: usize) -> String {
    if estimate_tokens(text) <= budget {
        return text.to_string();
    }

    let max_chars = budget.saturating_mul(CHARS_PER_TOKEN);
    let notice_chars = TRUNCATION_NOTICE.chars().count();
    let with_notice = max_chars > notice_chars * 2;
    let room = if with_notice {
        max_chars - notice_chars
    } else {
        max_chars
    };

    let mut kept = take_prefix(text, room);
    if with_notice {
        kept.push_str(TRUNCATION_NOTICE);
    }
    kept
}

fn take_prefix(text: &str, room: usize) -> String {
    let mut out = String::new();
    let mut used = 0;

    for line in text.split_inclusive('\n') {
        let len = line.chars().count();
        if used + len <= room {
            out.push_str(line);
            used += len;
            continue;
        }

        for word in line.split_inclusive(char::is_whitespace) {
            let len = word.chars().count();
            if used + len > room {
                break;
            }
            out.push_str(word);
            used += len;
        }

        if out.is_empty() {
            // a single word longer than the budget
            out.extend(line.chars().take(room));
        }
        break;
    }

    out.truncate(out.trim_end().len());
    out
}

/// Table of contents built from the first markdown headers, or a text
/// prefix when the content has none. At most `max_chars` characters plus
/// an ellipsis.
pub fn outline(text: &str, max_chars: usize) -> String {
    let headers: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with('#'))
        .take(OUTLINE_MAX_HEADERS)
        .collect();

    let summary = if headers.is_empty() {
        text.chars().take(max_chars).collect::<String>()
    } else {
        format!("Table of Contents:\n{}", headers.join("\n"))
    };

    if summary.chars().count() > max_chars {
        let mut cut: String = summary.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    } else {
        summary
    }
}

/// Size statistics for a piece of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentStats {
    pub characters: usize,
    pub estimated_tokens: usize,
    pub lines: usize,
    pub words: usize,
    pub code_blocks: usize,
    pub headers: usize,
}

impl ContentStats {
    pub fn of(text: &str) -> Self {
        Self {
            characters: text.chars().count(),
            estimated_tokens: estimate_tokens(text),
            lines: text.split('\n').count(),
            words: text.split_whitespace().count(),
            code_blocks: text.matches("```").count() / 2,
            headers: text
                .lines()
                .filter(|l| l.trim_start().starts_with('#'))
                .count(),
        }
    }
}

/// Per-document entry of a [`TokenReport`]
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    #[serde(flatten)]
    pub stats: ContentStats,
    pub avg_tokens_per_line: f64,
    pub suggestions: Vec<String>,
}

/// Token usage report across the served documents
#[derive(Debug, Clone, Serialize)]
pub struct TokenReport {
    pub documents: BTreeMap<String, DocumentReport>,
    pub total_estimated_tokens: usize,
    pub total_characters: usize,
}

/// Response sizing with an optional global cap
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOptimizer {
    max_tokens: Option<usize>,
}

impl TokenOptimizer {
    pub fn new(max_tokens: Option<usize>) -> Self {
        Self { max_tokens }
    }

    pub fn max_tokens(&self) -> Option<usize> {
        self.max_tokens
    }

    pub fn estimate(&self, text: &str) -> usize {
        estimate_tokens(text)
    }

    pub fn truncate_to_budget(&self, text: &str, budget: usize) -> String {
        truncate_to_budget(text, budget)
    }

    /// Apply the configured cap, if any
    pub fn optimize(&self, text: &str) -> String {
        match self.max_tokens {
            Some(budget) => truncate_to_budget(text, budget),
            None => text.to_string(),
        }
    }

    /// Build a sizing report with optimization suggestions
    pub fn report<'a>(&self, documents: impl IntoIterator<Item = &'a Document>) -> TokenReport {
        let mut entries = BTreeMap::new();

        for document in documents {
            let stats = ContentStats::of(&document.content);
            let mut suggestions = Vec::new();

            if stats.estimated_tokens > 3000 {
                suggestions.push("Consider splitting into multiple smaller documents".to_string());
            }
            if stats.characters / stats.lines > 200 {
                suggestions.push("Lines are long - consider breaking into paragraphs".to_string());
            }
            let fences = document.content.matches("```").count();
            if fences > 10 {
                suggestions.push(format!(
                    "Many code examples ({}) - consider external references",
                    fences / 2
                ));
            }

            entries.insert(
                document.name.to_string(),
                DocumentReport {
                    avg_tokens_per_line: stats.estimated_tokens as f64 / stats.lines as f64,
                    stats,
                    suggestions,
                },
            );
        }

        TokenReport {
            total_estimated_tokens: entries.values().map(|d| d.stats.estimated_tokens).sum(),
            total_characters: entries.values().map(|d| d.stats.characters).sum(),
            documents: entries,
        }
    }
}
