use crate::classify::{ClassifierOptions, ScopeMode};
use crate::payload::ThemeVariant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// What a fence renders as when its payload cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackMode {
    /// Escaped text with no payload.
    #[default]
    Plain,
    /// The plain markup path, without block binding.
    Markup,
}

/// Why a block degraded. Only reasons in the allow-set trigger the
/// configured fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackReason {
    ApiUnsupported,
    ProviderError,
    RangeInvalid,
    ApplyError,
}

pub const DEFAULT_FALLBACK_ON: [FallbackReason; 4] = [
    FallbackReason::ApiUnsupported,
    FallbackReason::ProviderError,
    FallbackReason::RangeInvalid,
    FallbackReason::ApplyError,
];

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackReason::ApiUnsupported => "api-unsupported",
            FallbackReason::ProviderError => "provider-error",
            FallbackReason::RangeInvalid => "range-invalid",
            FallbackReason::ApplyError => "apply-error",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DEFAULT_FALLBACK_ON
            .into_iter()
            .find(|reason| reason.as_str() == s.trim())
            .ok_or_else(|| format!("unknown fallback reason: {s}"))
    }
}

/// Where payloads go once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// Collected in the render environment for one aggregate script.
    #[default]
    Env,
    /// A `<script type="application/json">` right after each block.
    InlineScript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineFeatureStrategy {
    /// Emphasis and comment lines become payload ranges.
    #[default]
    Hybrid,
    Disable,
}

impl LineFeatureStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            LineFeatureStrategy::Hybrid => "hybrid",
            LineFeatureStrategy::Disable => "disable",
        }
    }
}

/// Theme passed to token-line providers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ThemeSelection {
    #[default]
    ProviderDefault,
    Single(String),
    Dual {
        light: String,
        dark: String,
        default: ThemeVariant,
    },
}

impl ThemeSelection {
    /// Normalize a light/dark pair. A missing half collapses to a single
    /// theme; blank names count as missing.
    pub fn pair(light: Option<&str>, dark: Option<&str>, default: ThemeVariant) -> Self {
        let light = light.map(str::trim).filter(|s| !s.is_empty());
        let dark = dark.map(str::trim).filter(|s| !s.is_empty());
        match (light, dark) {
            (Some(light), Some(dark)) => ThemeSelection::Dual {
                light: light.to_string(),
                dark: dark.to_string(),
                default,
            },
            (Some(single), None) | (None, Some(single)) => {
                ThemeSelection::Single(single.to_string())
            }
            (None, None) => ThemeSelection::ProviderDefault,
        }
    }

    pub fn single(name: &str) -> Self {
        let name = name.trim();
        if name.is_empty() {
            ThemeSelection::ProviderDefault
        } else {
            ThemeSelection::Single(name.to_string())
        }
    }

    pub fn single_name(&self) -> Option<&str> {
        match self {
            ThemeSelection::Single(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HighlightOptions {
    pub fallback: FallbackMode,
    pub fallback_on: BTreeSet<FallbackReason>,
    pub transport: Transport,
    pub id_prefix: String,
    pub line_feature_strategy: LineFeatureStrategy,
    pub scope_prefix: String,
    pub include_scope_styles: bool,
    pub scope_mode: ScopeMode,
    pub theme: ThemeSelection,
    /// Language used for fences that declare none.
    pub default_lang: Option<String>,
    /// Class prefix on `<code>`, e.g. `language-rust`.
    pub lang_prefix: String,
    /// Languages rendered inside `<samp>` instead of `<code>`.
    pub samp_langs: Vec<String>,
    pub classifier: ClassifierOptions,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            fallback: FallbackMode::Plain,
            fallback_on: DEFAULT_FALLBACK_ON.into_iter().collect(),
            transport: Transport::Env,
            id_prefix: "hl-".to_string(),
            line_feature_strategy: LineFeatureStrategy::Hybrid,
            scope_prefix: "hl".to_string(),
            include_scope_styles: true,
            scope_mode: ScopeMode::Auto,
            theme: ThemeSelection::ProviderDefault,
            default_lang: None,
            lang_prefix: "language-".to_string(),
            samp_langs: vec![
                "samp".to_string(),
                "shell-session".to_string(),
                "console".to_string(),
            ],
            classifier: ClassifierOptions::default(),
        }
    }
}

impl HighlightOptions {
    pub fn falls_back_on(&self, reason: FallbackReason) -> bool {
        self.fallback_on.contains(&reason)
    }

    pub fn is_samp(&self, lang: &str) -> bool {
        self.samp_langs.iter().any(|samp| samp == lang)
    }
}
