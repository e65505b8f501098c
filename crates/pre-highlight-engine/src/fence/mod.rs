//! Fenced code block rendering.
//!
//! A fence becomes a `<pre>` bound to a payload by block id. When the payload
//! cannot be built the fallback policy decides between escaped plain text
//! and the markup path.

pub mod info;
pub mod options;
pub mod transport;

pub use info::FenceInfo;
pub use options::{
    DEFAULT_FALLBACK_ON, FallbackMode, FallbackReason, HighlightOptions, LineFeatureStrategy,
    ThemeSelection, Transport,
};
pub use transport::{
    APPLIED_ATTR, BLOCK_ATTR, DATA_SCRIPT_ID, RenderEnv, SCOPE_STYLE_TAG_ID,
    escape_json_for_script, inline_payload_script, render_payload_script,
    render_scope_style_tag,
};

use crate::classify::{ScopeClassifier, ScopeMode, normalize_alias_map};
use crate::payload::lines::normalize_emphasis;
use crate::payload::{
    BuildError, COMMENT_LINE_SCOPE, EMPHASIS_SCOPE, HighlightPayload, LineFeatures, TokenEntry,
    build_payload, line_feature_entries, merge_dual_theme,
};
use crate::provider::{
    EntryOptions, HighlightProvider, ProviderError, ProviderRequest, collect_entries,
};
use serde::Serialize;
use transport::escape_html_attr;

#[derive(Debug, thiserror::Error)]
pub enum FenceError {
    #[error("Could not build highlight payload ({reason}): {source}")]
    Build {
        reason: FallbackReason,
        #[source]
        source: BuildError,
    },
    #[error("Could not serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl FenceError {
    pub fn reason(&self) -> FallbackReason {
        match self {
            FenceError::Build { reason, .. } => *reason,
            FenceError::Serialize(_) => FallbackReason::ProviderError,
        }
    }
}

impl From<BuildError> for FenceError {
    fn from(source: BuildError) -> Self {
        let reason = match &source {
            BuildError::InvalidRange { .. }
            | BuildError::Provider(ProviderError::InvalidRange { .. }) => {
                FallbackReason::RangeInvalid
            }
            BuildError::Provider(_) => FallbackReason::ProviderError,
        };
        FenceError::Build { reason, source }
    }
}

impl From<ProviderError> for FenceError {
    fn from(source: ProviderError) -> Self {
        BuildError::from(source).into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Renderer {
    Api,
    Markup,
}

/// How one fence was rendered, for logging and callers that audit output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FenceDecision {
    pub renderer: Renderer,
    pub include_payload: bool,
    pub fallback_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FallbackReason>,
    pub line_feature_strategy: LineFeatureStrategy,
    pub disabled_features: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FenceOutput {
    pub html: String,
    pub block_id: Option<String>,
    pub decision: FenceDecision,
}

#[derive(Debug)]
pub struct FenceRenderer {
    options: HighlightOptions,
    classifier: ScopeClassifier,
}

impl Default for FenceRenderer {
    fn default() -> Self {
        Self::new(HighlightOptions::default())
    }
}

impl FenceRenderer {
    pub fn new(options: HighlightOptions) -> Self {
        let classifier = ScopeClassifier::new(options.classifier.clone());
        Self {
            options,
            classifier,
        }
    }

    /// Renderer whose keyword-mode language resolution also knows the
    /// provider's own aliases.
    pub fn for_provider(mut options: HighlightOptions, provider: &dyn HighlightProvider) -> Self {
        if options.scope_mode == ScopeMode::Keyword {
            options.classifier.aliases.internal = normalize_alias_map(provider.language_aliases());
        }
        Self::new(options)
    }

    pub fn options(&self) -> &HighlightOptions {
        &self.options
    }

    pub fn classifier(&self) -> &ScopeClassifier {
        &self.classifier
    }

    fn line_entries(&self, fence: &FenceInfo, content: &str) -> Vec<TokenEntry> {
        if self.options.line_feature_strategy == LineFeatureStrategy::Disable {
            return Vec::new();
        }
        line_feature_entries(
            content,
            &LineFeatures {
                emphasize: &fence.emphasize,
                comment_mark: fence.comment_mark.as_deref(),
            },
        )
    }

    fn provider_entries(
        &self,
        provider: &dyn HighlightProvider,
        content: &str,
        lang: &str,
        theme: Option<&str>,
    ) -> Result<Vec<TokenEntry>, ProviderError> {
        let request_lang = if lang.is_empty() {
            self.options
                .default_lang
                .as_deref()
                .filter(|l| !l.is_empty())
                .unwrap_or(provider.plain_language())
        } else {
            lang
        };
        let request = ProviderRequest {
            lang: request_lang,
            theme,
        };
        let entry_options = EntryOptions {
            classifier: &self.classifier,
            scope_mode: self.options.scope_mode,
            include_styles: self.options.include_scope_styles,
        };
        collect_entries(provider, content, &request, &entry_options)
    }

    fn build_variant(
        &self,
        fence: &FenceInfo,
        content: &str,
        provider: &dyn HighlightProvider,
        line_entries: &[TokenEntry],
        theme: Option<&str>,
        include_styles: bool,
    ) -> Result<HighlightPayload, FenceError> {
        let mut entries = self.provider_entries(provider, content, &fence.lang, theme)?;
        entries.extend_from_slice(line_entries);
        let payload = build_payload(
            &entries,
            content,
            &fence.lang,
            provider.engine(),
            &self.options.scope_prefix,
            include_styles,
        )?;
        Ok(payload)
    }

    /// Build the payload for one fence without any fallback handling.
    pub fn build_payload(
        &self,
        fence: &FenceInfo,
        content: &str,
        provider: &dyn HighlightProvider,
    ) -> Result<HighlightPayload, FenceError> {
        let opts = &self.options;
        let line_entries = self.line_entries(fence, content);
        let build = |theme: Option<&str>, include_styles: bool| {
            self.build_variant(fence, content, provider, &line_entries, theme, include_styles)
        };

        let payload = match &opts.theme {
            ThemeSelection::Dual {
                light,
                dark,
                default,
            } if opts.include_scope_styles => {
                let light = build(Some(light), true)?;
                let dark = build(Some(dark), true)?;
                merge_dual_theme(light, dark, *default)
            }
            theme => build(theme.single_name(), opts.include_scope_styles)?,
        };
        Ok(payload)
    }

    fn open_tags(&self, lang: &str, block_id: Option<&str>) -> (String, &'static str) {
        let tag = if self.options.is_samp(lang) {
            "samp"
        } else {
            "code"
        };
        let pre_attrs = block_id
            .map(|id| format!(" {BLOCK_ATTR}=\"{}\"", escape_html_attr(id)))
            .unwrap_or_default();
        let code_attrs = if lang.is_empty() || lang == "samp" {
            String::new()
        } else {
            format!(
                " class=\"{}\"",
                escape_html_attr(&format!("{}{lang}", self.options.lang_prefix))
            )
        };
        (format!("<pre{pre_attrs}><{tag}{code_attrs}>"), tag)
    }

    fn block_html(&self, lang: &str, block_id: Option<&str>, body: &str) -> String {
        let (open, tag) = self.open_tags(lang, block_id);
        format!("{open}{body}</{tag}></pre>\n")
    }

    fn api_decision(&self, include_payload: bool) -> FenceDecision {
        let strategy = self.options.line_feature_strategy;
        FenceDecision {
            renderer: Renderer::Api,
            include_payload,
            fallback_used: false,
            fallback: None,
            reason: None,
            line_feature_strategy: strategy,
            disabled_features: match strategy {
                LineFeatureStrategy::Disable => vec!["emphasize-lines", "comment-line"],
                LineFeatureStrategy::Hybrid => Vec::new(),
            },
        }
    }

    /// Render one fence, binding it to a payload or degrading per policy.
    pub fn render(
        &self,
        fence: &FenceInfo,
        content: &str,
        provider: &dyn HighlightProvider,
        env: &mut RenderEnv,
    ) -> FenceOutput {
        let escaped = html_escape::encode_text(content);
        let attempt = self.build_payload(fence, content, provider).and_then(|payload| {
            let block_id = env.next_block_id(&self.options.id_prefix);
            let script = match self.options.transport {
                Transport::InlineScript => inline_payload_script(&block_id, &payload)?,
                Transport::Env => {
                    env.payloads.insert(block_id.clone(), payload);
                    String::new()
                }
            };
            Ok((block_id, script))
        });

        match attempt {
            Ok((block_id, script)) => {
                let mut html = self.block_html(&fence.lang, Some(&block_id), &escaped);
                html.push_str(&script);
                let decision = self.api_decision(true);
                log::debug!("fence {block_id}: {decision:?}");
                FenceOutput {
                    html,
                    block_id: Some(block_id),
                    decision,
                }
            }
            Err(err) => self.render_fallback(fence, content, &escaped, err),
        }
    }

    fn render_fallback(
        &self,
        fence: &FenceInfo,
        content: &str,
        escaped: &str,
        err: FenceError,
    ) -> FenceOutput {
        let reason = err.reason();
        log::debug!("fence '{}' degraded: {err}", fence.lang);
        if self.options.fallback == FallbackMode::Plain && self.options.falls_back_on(reason) {
            let decision = FenceDecision {
                fallback_used: true,
                fallback: Some(FallbackMode::Plain),
                reason: Some(reason),
                disabled_features: Vec::new(),
                ..self.api_decision(false)
            };
            log::debug!("fence fallback: {decision:?}");
            return FenceOutput {
                html: self.block_html(&fence.lang, None, escaped),
                block_id: None,
                decision,
            };
        }

        let decision = FenceDecision {
            renderer: Renderer::Markup,
            include_payload: false,
            fallback_used: true,
            fallback: Some(FallbackMode::Markup),
            reason: Some(reason),
            line_feature_strategy: self.options.line_feature_strategy,
            disabled_features: Vec::new(),
        };
        log::debug!("fence fallback: {decision:?}");
        FenceOutput {
            html: self.block_html(&fence.lang, None, &markup_lines(fence, content)),
            block_id: None,
            decision,
        }
    }
}

/// Escaped text with emphasized and comment lines wrapped in spans.
fn markup_lines(fence: &FenceInfo, content: &str) -> String {
    let mut lines: Vec<String> = content
        .split('\n')
        .map(|line| html_escape::encode_text(line).into_owned())
        .collect();
    let logical = if content.ends_with('\n') {
        lines.len() - 1
    } else {
        lines.len()
    };

    if let Some(mark) = fence.comment_mark.as_deref().filter(|m| !m.is_empty()) {
        for (raw, line) in content.split('\n').zip(lines.iter_mut()).take(logical) {
            if raw.trim_start().starts_with(mark) {
                *line = format!("<span class=\"{COMMENT_LINE_SCOPE}\">{line}</span>");
            }
        }
    }
    for (start, end) in normalize_emphasis(&fence.emphasize, logical) {
        lines[start - 1].insert_str(0, &format!("<span class=\"{EMPHASIS_SCOPE}\">"));
        lines[end - 1].push_str("</span>");
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{LineRange, ScopeStyle, ThemeVariant};
    use crate::provider::{CustomRange, CustomRanges, ProviderOutput, ScopeRef, ThemedToken};
    use pretty_assertions::assert_eq;

    struct KeywordProvider;

    impl HighlightProvider for KeywordProvider {
        fn engine(&self) -> &str {
            "custom"
        }

        fn highlight(
            &self,
            _code: &str,
            _request: &ProviderRequest<'_>,
        ) -> Result<ProviderOutput, ProviderError> {
            Ok(ProviderOutput::Ranges(CustomRanges::from(vec![
                CustomRange::Plain(ScopeRef::Name("keyword".into()), 0, 5),
            ])))
        }
    }

    struct BrokenProvider;

    impl HighlightProvider for BrokenProvider {
        fn engine(&self) -> &str {
            "custom"
        }

        fn highlight(
            &self,
            _code: &str,
            request: &ProviderRequest<'_>,
        ) -> Result<ProviderOutput, ProviderError> {
            Err(ProviderError::UnsupportedLanguage(request.lang.to_string()))
        }
    }

    struct OverlongProvider;

    impl HighlightProvider for OverlongProvider {
        fn engine(&self) -> &str {
            "custom"
        }

        fn highlight(
            &self,
            _code: &str,
            _request: &ProviderRequest<'_>,
        ) -> Result<ProviderOutput, ProviderError> {
            Ok(ProviderOutput::Ranges(CustomRanges::from(vec![
                CustomRange::Plain(ScopeRef::Name("kw".into()), 0, 99),
            ])))
        }
    }

    struct ThemedProvider;

    impl HighlightProvider for ThemedProvider {
        fn engine(&self) -> &str {
            "shiki"
        }

        fn highlight(
            &self,
            code: &str,
            request: &ProviderRequest<'_>,
        ) -> Result<ProviderOutput, ProviderError> {
            let color = match request.theme {
                Some("night") => "#eee",
                _ => "#111",
            };
            Ok(ProviderOutput::TokenLines {
                lines: vec![vec![ThemedToken {
                    color: Some(color.into()),
                    scopes: Some(vec!["keyword.js".into()]),
                    ..ThemedToken::new(code)
                }]],
            })
        }
    }

    #[test]
    fn env_transport_binds_block() {
        let renderer = FenceRenderer::default();
        let mut env = RenderEnv::new();
        let out = renderer.render(&FenceInfo::new("js"), "const x = 1", &KeywordProvider, &mut env);
        assert_eq!(
            out.html,
            "<pre data-pre-highlight=\"hl-1\"><code class=\"language-js\">const x = 1</code></pre>\n"
        );
        assert_eq!(out.block_id.as_deref(), Some("hl-1"));
        assert_eq!(env.payloads["hl-1"].scopes, vec!["hl-keyword"]);
        assert!(out.decision.include_payload);
    }

    #[test]
    fn inline_transport_appends_script() {
        let options = HighlightOptions {
            transport: Transport::InlineScript,
            ..Default::default()
        };
        let renderer = FenceRenderer::new(options);
        let mut env = RenderEnv::new();
        let out = renderer.render(&FenceInfo::new("js"), "const x = 1", &KeywordProvider, &mut env);
        assert!(env.is_empty());
        assert!(out.html.contains("<script type=\"application/json\" id=\"pre-highlight-data-hl-1\" data-pre-highlight=\"hl-1\">"));
    }

    #[test]
    fn provider_error_falls_back_to_plain() {
        let renderer = FenceRenderer::default();
        let mut env = RenderEnv::new();
        let out = renderer.render(&FenceInfo::new("js"), "a < b", &BrokenProvider, &mut env);
        assert_eq!(
            out.html,
            "<pre><code class=\"language-js\">a &lt; b</code></pre>\n"
        );
        assert_eq!(out.decision.reason, Some(FallbackReason::ProviderError));
        assert_eq!(out.decision.fallback, Some(FallbackMode::Plain));
        assert!(env.is_empty());
    }

    #[test]
    fn reason_outside_allow_set_takes_markup_path() {
        let options = HighlightOptions {
            fallback_on: [FallbackReason::ProviderError].into_iter().collect(),
            ..Default::default()
        };
        let renderer = FenceRenderer::new(options);
        let mut env = RenderEnv::new();
        let fence = FenceInfo {
            emphasize: vec![LineRange::line(1)],
            ..FenceInfo::new("js")
        };
        let out = renderer.render(&fence, "abc\ndef\n", &OverlongProvider, &mut env);
        assert_eq!(out.decision.renderer, Renderer::Markup);
        assert_eq!(out.decision.reason, Some(FallbackReason::RangeInvalid));
        assert_eq!(
            out.html,
            "<pre><code class=\"language-js\"><span class=\"pre-lines-emphasis\">abc</span>\ndef\n</code></pre>\n"
        );
    }

    #[test]
    fn samp_languages_use_samp_tag() {
        let renderer = FenceRenderer::default();
        let mut env = RenderEnv::new();
        let out = renderer.render(&FenceInfo::new("console"), "const", &KeywordProvider, &mut env);
        assert!(out.html.starts_with("<pre data-pre-highlight=\"hl-1\"><samp class=\"language-console\">"));
        assert!(out.html.ends_with("</samp></pre>\n"));
    }

    #[test]
    fn dual_theme_stores_variant_diff() {
        let options = HighlightOptions {
            theme: ThemeSelection::pair(Some("day"), Some("night"), ThemeVariant::Dark),
            ..Default::default()
        };
        let renderer = FenceRenderer::new(options);
        let payload = renderer
            .build_payload(&FenceInfo::new("js"), "let", &ThemedProvider)
            .unwrap();
        assert_eq!(payload.default_variant.as_deref(), Some("dark"));
        assert_eq!(
            payload.scope_styles,
            Some(vec![Some(ScopeStyle::color("#eee"))])
        );
        let light = &payload.variants.as_ref().unwrap()["light"];
        assert_eq!(light.scope_styles, Some(vec![Some(ScopeStyle::color("#111"))]));
    }

    #[test]
    fn disabled_line_features_skip_emphasis() {
        let options = HighlightOptions {
            line_feature_strategy: LineFeatureStrategy::Disable,
            ..Default::default()
        };
        let renderer = FenceRenderer::new(options);
        let fence = FenceInfo::parse("js {emphasize-lines=\"1\"}");
        let payload = renderer
            .build_payload(&fence, "const x = 1", &KeywordProvider)
            .unwrap();
        assert_eq!(payload.scopes, vec!["hl-keyword"]);
    }
}
