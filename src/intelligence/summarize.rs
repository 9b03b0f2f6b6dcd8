//! Extractive summaries for previews and search
//!
//! Provides:
//! - **Summarize**: first three substantial sentences, hard-capped in length
//! - **Truncate**: UTF-8 safe character truncation with ellipsis
//! - **Sentence splitting** shared with fact extraction

/// Default summary length cap in characters
pub const DEFAULT_SUMMARY_LENGTH: usize = 150;

/// Sentences shorter than this (trimmed, in characters) are skipped
pub const MIN_SENTENCE_CHARS: usize = 10;

/// Number of sentences kept in a summary
pub const SUMMARY_SENTENCES: usize = 3;

const ELLIPSIS: &str = "...";

/// Split text into trimmed, non-empty sentences on `.`, `!` and `?`
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(&['.', '!', '?'][..])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Cut `text` to at most `max_chars` characters, ending in "..." when cut
///
/// # Example
///
/// ```
/// use localbrain::intelligence::summarize::truncate_chars;
///
/// assert_eq!(truncate_chars("short", 10), "short");
/// assert_eq!(truncate_chars("abcdefghij", 8), "abcde...");
/// ```
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    // Byte index of the keep'th character (UTF-8 safe)
    let byte_end = text
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(text.len());

    format!("{}{}", &text[..byte_end], ELLIPSIS)
}

/// Summarize content for previews
///
/// Takes the first three sentences of at least ten characters, joins them
/// with ". " and truncates to `max_length`. Content without any such
/// sentence is truncated as-is.
pub fn summarize(content: &str, max_length: usize) -> String {
    let sentences: Vec<&str> = split_sentences(content)
        .into_iter()
        .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
        .take(SUMMARY_SENTENCES)
        .collect();

    let summary = if sentences.is_empty() {
        content.trim().to_string()
    } else {
        sentences.join(". ")
    };

    truncate_chars(&summary, max_length)
}
