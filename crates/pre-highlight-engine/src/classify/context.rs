use super::lexical::{is_identifier, is_punctuation};
use super::scope_table::scopes_contain_any;

/// Everything the refinement passes look at for one token.
#[derive(Debug, Clone)]
pub struct TokenContext<'a> {
    pub lang_key: &'a str,
    pub lower_scopes: Vec<String>,
    pub content: &'a str,
    pub trimmed: &'a str,
    /// Trimmed token, lowercased.
    pub lower: String,
    pub is_identifier: bool,
    pub is_punctuation: bool,
}

impl<'a> TokenContext<'a> {
    pub fn new(lang_key: &'a str, scope_candidates: &[String], content: &'a str) -> Self {
        let trimmed = content.trim();
        Self {
            lang_key,
            lower_scopes: scope_candidates.iter().map(|s| s.to_lowercase()).collect(),
            content,
            trimmed,
            lower: trimmed.to_lowercase(),
            is_identifier: is_identifier(trimmed),
            is_punctuation: is_punctuation(trimmed),
        }
    }

    /// True when any scope in the chain contains any of `patterns`.
    pub fn any(&self, patterns: &[&str]) -> bool {
        scopes_contain_any(&self.lower_scopes, patterns)
    }

    pub fn has(&self, pattern: &str) -> bool {
        self.any(&[pattern])
    }
}
