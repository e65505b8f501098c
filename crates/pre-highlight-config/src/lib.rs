use pre_highlight_engine::classify::{
    ClassifierOptions, LanguageAliases, ScopeMode, normalize_alias_map,
};
use pre_highlight_engine::fence::{
    FallbackMode, FallbackReason, HighlightOptions, LineFeatureStrategy, ThemeSelection, Transport,
};
use pre_highlight_engine::payload::ThemeVariant;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

static WARNED: LazyLock<Mutex<HashSet<String>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

/// Log a normalization warning the first time it is seen.
fn warn_once(message: String) {
    let first = WARNED
        .lock()
        .map(|mut warned| warned.insert(message.clone()))
        .unwrap_or(true);
    if first {
        log::warn!("{message}");
    }
}

/// `theme = "github-light"` or `theme = { light = "...", dark = "..." }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThemeConfig {
    Single(String),
    Pair {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        light: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dark: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
}

/// Build options as written in `config.toml`.
///
/// Values are kept as written and only checked by [`HighlightConfig::into_options`],
/// so a typo in one key degrades that key to its default instead of
/// rejecting the whole file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HighlightConfig {
    /// External highlighter command used when none is given on the command
    /// line. Split into words with shell quoting, so a path with spaces
    /// needs quotes: `"'/opt/My Tools/hl' --json"`. Each block is run with
    /// `--theme <name>` (when a theme is set) and the language appended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_on: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_feature_strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_scope_styles: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeConfig>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub lang_aliases: BTreeMap<String, String>,
}

impl HighlightConfig {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: HighlightConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.provider = config
            .provider
            .map(|cmd| Self::expand(&cmd).unwrap_or(cmd));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/pre-highlight");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Expand `~` and environment variables in a user-supplied path.
    pub fn expand_path(path: &Path) -> Option<PathBuf> {
        Self::expand(&path.to_string_lossy()).map(PathBuf::from)
    }

    fn expand(value: &str) -> Option<String> {
        match shellexpand::full(value) {
            Ok(expanded) => Some(expanded.into_owned()),
            Err(_) => None,
        }
    }

    /// Renderer options, with unknown or invalid values replaced by their
    /// defaults.
    pub fn into_options(self) -> HighlightOptions {
        let defaults = HighlightOptions::default();

        let fallback = match self.fallback.as_deref().map(str::trim) {
            None | Some("plain") => FallbackMode::Plain,
            Some("markup") => FallbackMode::Markup,
            Some(other) => {
                warn_once(format!("unknown fallback '{other}', using plain"));
                FallbackMode::Plain
            }
        };

        let fallback_on = match self.fallback_on {
            None => defaults.fallback_on,
            Some(reasons) => {
                let parsed: BTreeSet<FallbackReason> = reasons
                    .iter()
                    .filter_map(|raw| match raw.parse() {
                        Ok(reason) => Some(reason),
                        Err(err) => {
                            warn_once(format!("ignoring fallback-on entry: {err}"));
                            None
                        }
                    })
                    .collect();
                if parsed.is_empty() && !reasons.is_empty() {
                    warn_once("no usable fallback-on entries, using all reasons".to_string());
                    defaults.fallback_on
                } else {
                    parsed
                }
            }
        };

        let transport = match self.transport.as_deref().map(str::trim) {
            None | Some("env") => Transport::Env,
            Some("inline-script") => Transport::InlineScript,
            Some(other) => {
                warn_once(format!("unknown transport '{other}', using env"));
                Transport::Env
            }
        };

        let line_feature_strategy = match self.line_feature_strategy.as_deref().map(str::trim) {
            None | Some("hybrid") => LineFeatureStrategy::Hybrid,
            Some("disable") => LineFeatureStrategy::Disable,
            Some(other) => {
                warn_once(format!("unknown line-feature-strategy '{other}', using hybrid"));
                LineFeatureStrategy::Hybrid
            }
        };

        let scope_mode = match self.scope_mode.as_deref() {
            None => ScopeMode::Auto,
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                warn_once(format!("{err}, using auto"));
                ScopeMode::Auto
            }),
        };

        let theme = match self.theme {
            None => ThemeSelection::ProviderDefault,
            Some(ThemeConfig::Single(name)) => ThemeSelection::single(&name),
            Some(ThemeConfig::Pair {
                light,
                dark,
                default,
            }) => {
                let default = match default.as_deref().map(str::trim) {
                    None | Some("light") => ThemeVariant::Light,
                    Some("dark") => ThemeVariant::Dark,
                    Some(other) => {
                        warn_once(format!("unknown default theme '{other}', using light"));
                        ThemeVariant::Light
                    }
                };
                ThemeSelection::pair(light.as_deref(), dark.as_deref(), default)
            }
        };

        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        HighlightOptions {
            fallback,
            fallback_on,
            transport,
            id_prefix: non_blank(self.id_prefix).unwrap_or(defaults.id_prefix),
            line_feature_strategy,
            scope_prefix: non_blank(self.scope_prefix).unwrap_or(defaults.scope_prefix),
            include_scope_styles: self
                .include_scope_styles
                .unwrap_or(defaults.include_scope_styles),
            scope_mode,
            theme,
            default_lang: non_blank(self.default_lang),
            classifier: ClassifierOptions {
                aliases: LanguageAliases {
                    custom: normalize_alias_map(self.lang_aliases),
                    ..Default::default()
                },
                ..defaults.classifier
            },
            ..defaults
        }
    }
}
