use crate::diagnostics::Diagnostic;
use pre_highlight_engine::fence::DATA_SCRIPT_ID;
use pre_highlight_engine::payload::SUPPORTED_VERSIONS;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Payloads keyed by block id. `Arc` identity lets the incremental cache
/// recognise a payload it has already digested.
pub type PayloadMap = BTreeMap<String, Arc<Value>>;

pub type PrefersDarkHook = Arc<dyn Fn() -> bool + Send + Sync>;

pub type DiagnosticHook = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    Light,
    Dark,
    #[default]
    Auto,
}

impl ColorScheme {
    /// Case-insensitive; anything unrecognised means `auto`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "light" => ColorScheme::Light,
            "dark" => ColorScheme::Dark,
            _ => ColorScheme::Auto,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColorScheme::Light => "light",
            ColorScheme::Dark => "dark",
            ColorScheme::Auto => "auto",
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Default)]
pub struct ApplyOptions {
    pub color_scheme: ColorScheme,
    /// Keep per-root state and skip work that has not changed.
    pub incremental: bool,
    /// Payloads to use instead of the ones embedded in the document.
    pub payload_map: Option<PayloadMap>,
    /// Id of the aggregate payload script. Defaults to `pre-highlight-data`.
    pub data_script_id: Option<String>,
    /// Caller-computed digest of the payload map, to skip hashing it.
    pub payload_digest: Option<String>,
    /// Always accept the built-in schema versions.
    pub strict_version: bool,
    pub supported_version: Option<i64>,
    pub supported_versions: Vec<i64>,
    /// Replaces the host's color-scheme media query.
    pub prefers_dark: Option<PrefersDarkHook>,
    pub on_diagnostic: Option<DiagnosticHook>,
}

impl fmt::Debug for ApplyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplyOptions")
            .field("color_scheme", &self.color_scheme)
            .field("incremental", &self.incremental)
            .field("payload_map", &self.payload_map.as_ref().map(BTreeMap::len))
            .field("data_script_id", &self.data_script_id)
            .field("payload_digest", &self.payload_digest.is_some())
            .field("strict_version", &self.strict_version)
            .field("supported_version", &self.supported_version)
            .field("supported_versions", &self.supported_versions)
            .field("prefers_dark", &self.prefers_dark.is_some())
            .field("on_diagnostic", &self.on_diagnostic.is_some())
            .finish()
    }
}

impl ApplyOptions {
    pub fn data_script_id(&self) -> &str {
        self.data_script_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DATA_SCRIPT_ID)
    }

    /// Payload versions this pass accepts.
    ///
    /// Explicit versions are accepted, plus the built-in ones when
    /// `strict_version` is set. With no policy at all the built-in versions
    /// apply.
    pub fn accepted_versions(&self) -> BTreeSet<i64> {
        let mut versions = BTreeSet::new();
        if self.strict_version {
            versions.extend(SUPPORTED_VERSIONS.iter().map(|v| i64::from(*v)));
        }
        versions.extend(self.supported_version);
        versions.extend(self.supported_versions.iter().copied());
        if versions.is_empty() {
            versions.extend(SUPPORTED_VERSIONS.iter().map(|v| i64::from(*v)));
        }
        versions
    }

    pub(crate) fn emit(&self, diagnostic: Diagnostic) {
        log::debug!("runtime skip: {diagnostic:?}");
        if let Some(hook) = &self.on_diagnostic {
            hook(&diagnostic);
        }
    }
}
