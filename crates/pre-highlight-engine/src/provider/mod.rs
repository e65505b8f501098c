//! Highlighter outputs and their conversion to [`TokenEntry`] lists.
//!
//! A provider is any tokenizer that can describe a code block in one of four
//! shapes: themed token lines, an emitter tree, highlighted HTML, or explicit
//! ranges. Everything downstream only sees entries with UTF-16 offsets.

pub mod emitter;
pub mod html;
pub mod ranges;
pub mod tokens;

pub use emitter::EmitterNode;
pub use ranges::{CustomRange, CustomRanges, ScopeRef, ScopeStyleTable};
pub use tokens::{ExplanationScope, ThemedToken, TokenExplanation};

use crate::classify::{ScopeClassifier, ScopeMode};
use crate::payload::TokenEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Highlighter failed for language '{lang}': {message}")]
    Failed { lang: String, message: String },
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Invalid range [{start}, {end}]")]
    InvalidRange { start: i64, end: i64 },
    #[error("Malformed highlighter output: {0}")]
    Malformed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a highlighter produced for one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProviderOutput {
    TokenLines { lines: Vec<Vec<ThemedToken>> },
    EmitterTree { root: EmitterNode },
    Html { html: String },
    Ranges(CustomRanges),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderRequest<'a> {
    pub lang: &'a str,
    /// Theme name for token-line providers; `None` means the provider default.
    pub theme: Option<&'a str>,
}

/// A synchronous tokenizer.
pub trait HighlightProvider {
    /// Short engine name, used as the label prefix and payload `engine`.
    fn engine(&self) -> &str;

    /// Language to retry with when highlighting the requested one fails.
    fn plain_language(&self) -> &str {
        "text"
    }

    fn highlight(
        &self,
        code: &str,
        request: &ProviderRequest<'_>,
    ) -> Result<ProviderOutput, ProviderError>;

    /// Internal language aliases the highlighter knows about, merged into
    /// keyword-mode language resolution.
    fn language_aliases(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Settings that shape entries produced from provider output.
#[derive(Debug, Clone, Copy)]
pub struct EntryOptions<'a> {
    pub classifier: &'a ScopeClassifier,
    pub scope_mode: ScopeMode,
    pub include_styles: bool,
}

/// Convert provider output to entries for `lang`.
pub fn entries_from_output(
    output: ProviderOutput,
    lang: &str,
    engine: &str,
    options: &EntryOptions<'_>,
) -> Result<Vec<TokenEntry>, ProviderError> {
    match output {
        ProviderOutput::TokenLines { lines } => {
            Ok(tokens::entries_from_token_lines(&lines, lang, engine, options))
        }
        ProviderOutput::EmitterTree { root } => Ok(emitter::entries_from_emitter(&root, lang, engine)),
        ProviderOutput::Html { html } => Ok(html::entries_from_html(&html, lang, engine)),
        ProviderOutput::Ranges(ranges) => ranges::entries_from_custom(ranges),
    }
}

/// Highlight `code` and convert the result, retrying once with the
/// provider's plain language when the requested language fails.
pub fn collect_entries(
    provider: &dyn HighlightProvider,
    code: &str,
    request: &ProviderRequest<'_>,
    options: &EntryOptions<'_>,
) -> Result<Vec<TokenEntry>, ProviderError> {
    let plain = provider.plain_language();
    let output = match provider.highlight(code, request) {
        Ok(output) => output,
        Err(err) if request.lang != plain => {
            log::debug!(
                "{} failed for '{}', retrying as '{plain}': {err}",
                provider.engine(),
                request.lang
            );
            let retry = ProviderRequest {
                lang: plain,
                ..*request
            };
            provider.highlight(code, &retry)?
        }
        Err(err) => return Err(err),
    };
    entries_from_output(output, request.lang, provider.engine(), options)
}
