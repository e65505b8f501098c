//! Token-text checks that don't depend on scopes.

use super::bucket::Bucket;
use super::lang::keyword_table;
use regex::Regex;
use std::sync::LazyLock;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:0[xob][0-9a-f_]+|[0-9][0-9_]*(?:\.[0-9][0-9_]*)?(?:e[+-]?[0-9]+)?)$")
        .expect("valid number regex")
});

static SHELL_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-[A-Za-z0-9][A-Za-z0-9-]*$").expect("valid option regex"));

const GLOBAL_LITERALS: &[&str] = &[
    "true",
    "false",
    "null",
    "undefined",
    "nan",
    "inf",
    "none",
    "nil",
];

/// Shell `test` operators that read as keywords rather than flags.
pub const SHELL_TEST_OPERATORS: &[&str] = &["-n", "-z", "-gt", "-lt", "-ge", "-le", "-eq", "-ne"];

const PUNCTUATION_CHARS: &str = "()[]{}<>.,;:!?~`'\"@#$%^&*+=|/\\-";

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

fn is_word_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

/// `[A-Za-z_$][A-Za-z0-9_$]*`
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_word_start(first) => chars.all(is_word_char),
        _ => false,
    }
}

/// An identifier optionally ending in `!` or `?` (Ruby and Rust macros).
pub fn is_function_like(text: &str) -> bool {
    let body = text
        .strip_suffix('!')
        .or_else(|| text.strip_suffix('?'))
        .unwrap_or(text);
    is_identifier(body)
}

/// Non-empty and made only of ASCII punctuation.
pub fn is_punctuation(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| PUNCTUATION_CHARS.contains(ch))
}

pub fn is_shell_option(text: &str) -> bool {
    SHELL_OPTION.is_match(text)
}

pub fn is_number(text: &str) -> bool {
    NUMBER.is_match(text)
}

pub fn is_shell_lang(lang_key: &str) -> bool {
    matches!(lang_key, "bash" | "shellscript")
}

pub fn is_hcl_lang(lang_key: &str) -> bool {
    matches!(lang_key, "hcl" | "terraform")
}

/// Lowercase with internal whitespace runs collapsed to one space.
pub fn fold_token(trimmed: &str) -> String {
    trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Classify a token purely from its text and language.
pub fn classify_token(content: &str, lang_key: &str) -> Option<Bucket> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Some(Bucket::Text);
    }
    let folded = fold_token(trimmed);
    if folded.starts_with("#!") {
        return Some(Bucket::Meta);
    }
    if lang_key != "sql" && GLOBAL_LITERALS.contains(&folded.as_str()) {
        return Some(Bucket::Literal);
    }
    if is_number(&folded) {
        return Some(Bucket::Number);
    }
    if keyword_table(lang_key).is_some_and(|table| table.contains(&folded.as_str())) {
        return Some(Bucket::Keyword);
    }
    if lang_key == "css" && folded.starts_with('@') {
        return Some(Bucket::Keyword);
    }
    if is_punctuation(trimmed) {
        return Some(Bucket::Punctuation);
    }
    None
}
