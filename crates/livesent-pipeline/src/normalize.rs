//! Text cleanup applied before text reaches a model.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::stopwords::is_stopword;

/// `scheme://…` or `www.…` up to the next whitespace.
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[a-z][a-z0-9+.\-]*://|www\.)\S+").expect("valid regex"));

/// Normalize article text for classification.
///
/// Steps, in order: lowercase, strip URLs, strip ASCII punctuation, fold to
/// ASCII (when `strip_non_ascii`), drop English stopwords (when
/// `remove_stopwords`), collapse whitespace and trim.
///
/// Total and idempotent: empty input yields empty output and
/// `normalize(normalize(x)) == normalize(x)` for the same flags.
#[must_use]
pub fn normalize(text: &str, remove_stopwords: bool, strip_non_ascii: bool) -> String {
    let lowered = text.to_lowercase();
    let without_urls = URL_RE.replace_all(&lowered, " ");
    let mut cleaned: String = without_urls
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();

    if strip_non_ascii {
        cleaned = fold_to_ascii(&cleaned);
    }

    cleaned
        .split_whitespace()
        .filter(|word| !(remove_stopwords && is_stopword(word)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Default normalization: keep stopwords, fold to ASCII.
#[must_use]
pub fn normalize_default(text: &str) -> String {
    normalize(text, false, true)
}

/// Collapse runs of whitespace (including newlines) into single spaces.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// NFKD-decompose and keep only ASCII.
///
/// Compatibility decomposition can emit uppercase letters or ASCII
/// punctuation (`ℌ` → `H`, `…` → `...`), so both are cleaned up again here.
fn fold_to_ascii(text: &str) -> String {
    text.nfkd()
        .filter(char::is_ascii)
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| !c.is_ascii_punctuation())
        .collect()
}
