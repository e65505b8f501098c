//! Scope classification.
//!
//! Turns a highlighter's scope chain for one token into the label used as
//! the token's highlight scope. Four naming modes are supported; `keyword`
//! mode reduces every grammar to the small [`Bucket`] vocabulary.

pub mod bucket;
pub mod context;
pub mod lang;
pub mod lexical;
pub mod post_rules;
pub mod rules;
pub mod scope_table;

pub use bucket::Bucket;
pub use lang::{LanguageAliases, normalize_alias_map, normalize_lang_key, resolve_language};
pub use rules::{ClassificationRule, RulePredicate, RuleSet, TokenKind};

use context::TokenContext;
use scope_table::ScopeBucketCache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How a token's scope label is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeMode {
    /// Foreground color first, then raw scope.
    Color,
    /// Raw scope first, then color.
    Semantic,
    /// Canonical bucket.
    Keyword,
    #[default]
    Auto,
}

impl FromStr for ScopeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "color" => Ok(ScopeMode::Color),
            "semantic" => Ok(ScopeMode::Semantic),
            "keyword" => Ok(ScopeMode::Keyword),
            "auto" => Ok(ScopeMode::Auto),
            other => Err(format!("unknown scope mode: {other}")),
        }
    }
}

/// Picks a language key from the declared language and the scope chain.
pub type LanguageResolverHook = Arc<dyn Fn(&str, &[String]) -> Option<String> + Send + Sync>;

/// Replaces the built-in bucket in keyword mode when it returns a name.
pub type KeywordClassifierHook =
    Arc<dyn Fn(&ScopeQuery<'_>, &str) -> Option<String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ClassifierOptions {
    pub aliases: LanguageAliases,
    pub language_resolver: Option<LanguageResolverHook>,
    pub keyword_classifier: Option<KeywordClassifierHook>,
    pub extra_global_rules: Vec<ClassificationRule>,
    pub extra_language_rules: Vec<(String, Vec<ClassificationRule>)>,
}

impl fmt::Debug for ClassifierOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierOptions")
            .field("aliases", &self.aliases)
            .field("language_resolver", &self.language_resolver.is_some())
            .field("keyword_classifier", &self.keyword_classifier.is_some())
            .field("extra_global_rules", &self.extra_global_rules.len())
            .field("extra_language_rules", &self.extra_language_rules.len())
            .finish()
    }
}

/// One token as seen by the classifier.
#[derive(Debug, Clone, Copy)]
pub struct ScopeQuery<'a> {
    /// Scope names, innermost first, without duplicates.
    pub candidates: &'a [String],
    pub text: &'a str,
    pub color: Option<&'a str>,
    pub font_style: Option<u8>,
}

impl<'a> ScopeQuery<'a> {
    pub fn new(candidates: &'a [String], text: &'a str) -> Self {
        Self {
            candidates,
            text,
            color: None,
            font_style: None,
        }
    }

    pub fn with_color(mut self, color: Option<&'a str>, font_style: Option<u8>) -> Self {
        self.color = color;
        self.font_style = font_style;
        self
    }

    pub fn raw_scope(&self) -> Option<&'a str> {
        self.candidates.first().map(String::as_str)
    }

    fn color_key(&self) -> Option<String> {
        let color = self.color.filter(|c| !c.is_empty())?;
        let mut key = String::with_capacity(color.len() + 4);
        let mut in_unsafe_run = false;
        for ch in color.to_lowercase().chars() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                key.push(ch);
                in_unsafe_run = false;
            } else if !in_unsafe_run {
                key.push('-');
                in_unsafe_run = true;
            }
        }
        if let Some(font_style) = self.font_style {
            key.push_str(&format!("-f{font_style}"));
        }
        Some(key)
    }
}

pub struct ScopeClassifier {
    options: ClassifierOptions,
    rules: RuleSet,
    cache: ScopeBucketCache,
}

impl fmt::Debug for ScopeClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeClassifier")
            .field("options", &self.options)
            .field("cached_scopes", &self.cache.len())
            .finish()
    }
}

impl Default for ScopeClassifier {
    fn default() -> Self {
        Self::new(ClassifierOptions::default())
    }
}

impl ScopeClassifier {
    pub fn new(options: ClassifierOptions) -> Self {
        let mut rules = RuleSet::builtin();
        rules.extend(
            options.extra_global_rules.clone(),
            options.extra_language_rules.clone(),
        );
        Self {
            options,
            rules,
            cache: ScopeBucketCache::new(),
        }
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    /// Resolve the keyword language once for a whole fence.
    ///
    /// Returns `None` when a resolver hook is installed, since the hook may
    /// answer differently per token.
    pub fn resolve_fence_language(&self, lang: &str) -> Option<String> {
        if self.options.language_resolver.is_some() {
            return None;
        }
        Some(resolve_language(None, lang, &[], &self.options.aliases))
    }

    fn resolve_token_language(&self, lang: &str, candidates: &[String]) -> String {
        let hint = self
            .options
            .language_resolver
            .as_ref()
            .and_then(|hook| hook(lang, candidates))
            .filter(|hint| !hint.is_empty());
        resolve_language(hint.as_deref(), lang, candidates, &self.options.aliases)
    }

    /// Canonical bucket for one token.
    ///
    /// `fence_lang_key` is the result of [`Self::resolve_fence_language`]
    /// when available; an empty key falls back to per-token resolution.
    pub fn bucket(&self, query: &ScopeQuery<'_>, lang: &str, fence_lang_key: Option<&str>) -> Bucket {
        if query.text.trim().is_empty() {
            return Bucket::Text;
        }
        let lang_key = match fence_lang_key.filter(|key| !key.is_empty()) {
            Some(key) => key.to_string(),
            None => self.resolve_token_language(lang, query.candidates),
        };
        let ctx = TokenContext::new(&lang_key, query.candidates, query.text);
        let base = self.base_bucket(&ctx);
        let refined = post_rules::apply_post_rules(base, &ctx);
        self.rules.apply(refined, &ctx)
    }

    fn base_bucket(&self, ctx: &TokenContext<'_>) -> Bucket {
        if lexical::is_hcl_lang(ctx.lang_key)
            && let Some(bucket) = scope_table::classify_hcl(&ctx.lower_scopes)
        {
            return bucket;
        }
        if scope_table::is_json_yaml_property_name(&ctx.lower_scopes) {
            return Bucket::Type;
        }
        if ctx.lang_key == "yaml" && ctx.has("entity.name.tag.yaml") {
            return Bucket::Tag;
        }

        let mut best = Bucket::Text;
        for scope in &ctx.lower_scopes {
            let bucket = self.cache.classify(scope);
            if bucket.score() > best.score() {
                best = bucket;
            }
        }
        if let Some(lexical) = lexical::classify_token(ctx.content, ctx.lang_key)
            && lexical.score() + 1 > best.score()
        {
            best = lexical;
        }
        best
    }

    /// Scope label for a token under `mode`, before engine prefixing and
    /// sanitizing.
    pub fn classify(
        &self,
        query: &ScopeQuery<'_>,
        lang: &str,
        mode: ScopeMode,
        fence_lang_key: Option<&str>,
    ) -> String {
        let raw = query.raw_scope().filter(|s| !s.is_empty());
        let lang_label = || {
            if lang.is_empty() {
                "plain".to_string()
            } else {
                lang.to_string()
            }
        };
        match mode {
            ScopeMode::Keyword => {
                if let Some(hook) = &self.options.keyword_classifier
                    && let Some(name) = hook(query, lang).filter(|n| !n.is_empty())
                {
                    return name;
                }
                self.bucket(query, lang, fence_lang_key).as_str().to_string()
            }
            ScopeMode::Color => query
                .color_key()
                .or_else(|| raw.map(str::to_string))
                .unwrap_or_else(lang_label),
            ScopeMode::Semantic | ScopeMode::Auto => raw
                .map(str::to_string)
                .or_else(|| query.color_key())
                .unwrap_or_else(lang_label),
        }
    }

    /// Drop memoized scope results. Outcomes are unaffected.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
