//! Versioned range payloads.
//!
//! A payload describes one code block's highlighting as a table of scope
//! names plus `[scopeIndex, start, end]` tuples over the block's text. Offsets
//! are UTF-16 code units so they line up with DOM text offsets.

pub mod builder;
pub mod lines;
pub mod names;
pub mod style;
pub mod variants;

pub use builder::build_payload;
pub use lines::{
    COMMENT_LINE_SCOPE, EMPHASIS_SCOPE, LineFeatures, LineRange, line_feature_entries,
    parse_emphasis,
};
pub use names::{sanitize_highlight_name, sanitize_with_prefix};
pub use style::ScopeStyle;
pub use variants::{ThemeVariant, merge_dual_theme};

use crate::provider::ProviderError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: u32 = 1;
pub const SUPPORTED_VERSIONS: &[u32] = &[SCHEMA_VERSION];

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// One highlighted span before scopes are deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEntry {
    pub scope: String,
    pub start: usize,
    pub end: usize,
    pub style: Option<ScopeStyle>,
}

impl TokenEntry {
    pub fn new(scope: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            scope: scope.into(),
            start,
            end,
            style: None,
        }
    }

    pub fn with_style(mut self, style: Option<ScopeStyle>) -> Self {
        self.style = style;
        self
    }
}

/// `[scopeIndex, start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeTuple(pub usize, pub usize, pub usize);

impl RangeTuple {
    pub fn scope_index(&self) -> usize {
        self.0
    }

    pub fn start(&self) -> usize {
        self.1
    }

    pub fn end(&self) -> usize {
        self.2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetEncoding {
    #[default]
    Utf16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Newline {
    #[default]
    Lf,
}

/// Fields of a theme variant that differ from the base payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Vec<RangeTuple>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_styles: Option<Vec<Option<ScopeStyle>>>,
}

impl VariantRecord {
    pub fn is_empty(&self) -> bool {
        self.scopes.is_none() && self.ranges.is_none() && self.scope_styles.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightPayload {
    pub v: u32,
    pub engine: String,
    pub lang: String,
    pub offset_encoding: OffsetEncoding,
    pub newline: Newline,
    pub text_length: usize,
    pub scopes: Vec<String>,
    pub ranges: Vec<RangeTuple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_styles: Option<Vec<Option<ScopeStyle>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<BTreeMap<String, VariantRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_variant: Option<String>,
}

impl HighlightPayload {
    /// Scopes, ranges and styles as seen through a variant record.
    pub fn expand_variant(&self, key: &str) -> Option<(Vec<String>, Vec<RangeTuple>, Option<Vec<Option<ScopeStyle>>>)> {
        let record = self.variants.as_ref()?.get(key)?;
        let scopes = record.scopes.clone().unwrap_or_else(|| self.scopes.clone());
        let ranges = record.ranges.clone().unwrap_or_else(|| self.ranges.clone());
        let styles = match &record.scope_styles {
            Some(styles) if styles.is_empty() => None,
            Some(styles) => Some(styles.clone()),
            None => self.scope_styles.clone(),
        };
        Some((scopes, ranges, styles))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid range [{start}, {end}] for text of length {text_length}")]
    InvalidRange {
        start: i64,
        end: i64,
        text_length: usize,
    },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
