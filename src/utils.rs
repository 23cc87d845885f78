//! Text cleanup and small filesystem helpers shared by the adapters and the store.
//!
//! - Markup stripping, entity decoding and whitespace collapsing for titles
//!   and summaries
//! - Word-boundary truncation of summaries
//! - Title normalization for deduplication
//! - Keyword relevance check for listings that mix AI and non-AI products
//! - Writability check for the data directory

use crate::error::StoreError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument};

/// Default summary bound, in characters.
pub const SUMMARY_MAX_CHARS: usize = 250;

static RE_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script.*?</script>|<style.*?</style>|</?[a-z!][^>]*>").unwrap());

static RE_AI_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(ai|artificial intelligence|machine learning|ml|deep learning|neural networks?|llms?|gpt|transformers?|nlp|computer vision|reinforcement learning|generative|diffusion|models?|datasets?|training|inference|embeddings?|attention|agents?|agentic|chatbots?|claude|openai|anthropic|hugging face|pytorch|tensorflow|keras|scikit|langchain|prompts?|copilot|assistant)\b",
    )
    .unwrap()
});

/// Strip markup, decode entities and collapse whitespace.
///
/// Entities are decoded twice around the tag strip so that feeds shipping
/// escaped HTML (`&lt;p&gt;`) lose their tags too.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_text("<p>Hello&nbsp;&amp;\n  world</p>"), "Hello & world");
/// ```
pub fn clean_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let decoded = html_escape::decode_html_entities(raw);
    let stripped = RE_TAGS.replace_all(&decoded, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    collapse_whitespace(&decoded)
}

/// Collapse runs of whitespace (NBSP included) into single spaces and trim.
///
/// For text that is already plain, such as DOM text nodes from `scraper`
/// or XML-unescaped feed titles. Use [`clean_text`] for raw HTML bodies.
pub fn collapse_whitespace(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate already-clean text to at most `max_chars` characters plus a `...` marker.
///
/// The cut lands on the last word boundary inside the limit; a single word
/// longer than the limit is cut mid-word.
pub fn truncate_summary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let head: String = text.chars().take(max_chars).collect();
    let cut = match head.rfind(' ') {
        Some(idx) if idx > 0 => &head[..idx],
        _ => head.as_str(),
    };
    format!("{}...", cut.trim_end())
}

/// Normalize a title into its deduplication key.
///
/// Lowercases, removes punctuation and collapses whitespace, so
/// `"Don't Panic: GPT-5"` and `"dont panic   gpt5"` share a key. A title made
/// only of punctuation keys on its lowercased, whitespace-collapsed form
/// instead of the empty string.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    let key = collapse_whitespace(&stripped);
    if key.is_empty() {
        collapse_whitespace(&lowered)
    } else {
        key
    }
}

/// Whether `text` mentions any AI-related keyword as a whole word.
pub fn is_ai_related(text: &str) -> bool {
    RE_AI_KEYWORDS.is_match(text)
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` bytes (backed off to a char boundary) with
/// the dropped byte count appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a scratch file.
///
/// # Errors
///
/// [`StoreError::Io`] if the directory cannot be created or written to.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;

    let scratch_path = path.join("..__write_check__");
    stdfs::File::create(&scratch_path).map_err(|e| StoreError::io(&scratch_path, e))?;
    let _ = stdfs::remove_file(&scratch_path);
    debug!("Data directory is writable");
    Ok(())
}
