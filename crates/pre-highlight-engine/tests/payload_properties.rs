use pre_highlight_engine::classify::{Bucket, ScopeClassifier, ScopeMode, ScopeQuery};
use pre_highlight_engine::fence::{FenceInfo, FenceRenderer, HighlightOptions, ThemeSelection};
use pre_highlight_engine::payload::{HighlightPayload, ThemeVariant, utf16_len};
use pre_highlight_engine::provider::{
    HighlightProvider, ProviderError, ProviderOutput, ProviderRequest, ThemedToken,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::HashSet;

/// Splits each line on spaces and tags words with a fake grammar scope and a
/// per-theme color.
struct WordProvider;

impl HighlightProvider for WordProvider {
    fn engine(&self) -> &str {
        "shiki"
    }

    fn highlight(
        &self,
        code: &str,
        request: &ProviderRequest<'_>,
    ) -> Result<ProviderOutput, ProviderError> {
        let dark = request.theme == Some("night");
        let lines = code
            .split('\n')
            .map(|line| {
                let mut tokens = Vec::new();
                for (i, word) in line.split(' ').enumerate() {
                    if i > 0 {
                        tokens.push(ThemedToken::new(" "));
                    }
                    if word.is_empty() {
                        continue;
                    }
                    let (scope, light, night) = match word {
                        "const" | "let" | "fn" => ("storage.type", "#d73a49", "#f97583"),
                        w if w.chars().all(|c| c.is_ascii_digit()) => {
                            ("constant.numeric", "#005cc5", "#79b8ff")
                        }
                        w if w.starts_with("//") => ("comment.line", "#6a737d", "#6a737d"),
                        _ => ("variable.other", "#24292e", "#e1e4e8"),
                    };
                    tokens.push(ThemedToken {
                        color: Some(if dark { night } else { light }.to_string()),
                        scopes: Some(vec!["source.js".into(), format!("{scope}.js")]),
                        ..ThemedToken::new(word)
                    });
                }
                tokens
            })
            .collect();
        Ok(ProviderOutput::TokenLines { lines })
    }
}

fn renderer(mode: ScopeMode, theme: ThemeSelection) -> FenceRenderer {
    FenceRenderer::new(HighlightOptions {
        scope_mode: mode,
        theme,
        ..Default::default()
    })
}

fn build(mode: ScopeMode, theme: ThemeSelection, fence: &str, text: &str) -> HighlightPayload {
    renderer(mode, theme)
        .build_payload(&FenceInfo::parse(fence), text, &WordProvider)
        .unwrap()
}

fn is_sanitized(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

const SAMPLES: &[&str] = &[
    "const x = 1",
    "let café = 42\n// naïve ✓\nfn 😀 7\n",
    "\n\n  \n",
    "const a = 1\nlet b = 2\nconst c = 3\nlet d = 4",
];

#[rstest]
#[case(ScopeMode::Auto, "js {emphasize-lines=\"2-3\" comment-line=\"//\"}")]
#[case(ScopeMode::Color, "js")]
#[case(ScopeMode::Semantic, "js {em-lines=\"-2\"}")]
#[case(ScopeMode::Keyword, "javascript {comment-line=\"//\"}")]
fn payloads_are_well_formed(#[case] mode: ScopeMode, #[case] fence: &str) {
    for text in SAMPLES {
        let payload = build(mode, ThemeSelection::single("day"), fence, text);
        assert_eq!(payload.text_length, utf16_len(text));

        let unique: HashSet<_> = payload.scopes.iter().collect();
        assert_eq!(unique.len(), payload.scopes.len(), "duplicate scopes in {text:?}");
        for name in &payload.scopes {
            assert!(is_sanitized(name), "unsanitized scope {name:?}");
        }
        for range in &payload.ranges {
            assert!(range.scope_index() < payload.scopes.len());
            assert!(range.start() < range.end());
            assert!(range.end() <= payload.text_length);
        }
        if let Some(styles) = &payload.scope_styles {
            assert_eq!(styles.len(), payload.scopes.len());
            assert!(styles.iter().any(Option::is_some));
        }
    }
}

#[test]
fn identical_inputs_serialize_identically() {
    let fence = "js {emphasize-lines=\"1,3\"}";
    let text = SAMPLES[3];
    let theme = || ThemeSelection::pair(Some("day"), Some("night"), ThemeVariant::Light);
    let first = serde_json::to_string(&build(ScopeMode::Auto, theme(), fence, text)).unwrap();
    let second = serde_json::to_string(&build(ScopeMode::Auto, theme(), fence, text)).unwrap();
    assert_eq!(first, second);
}

#[rstest]
#[case(ThemeVariant::Light)]
#[case(ThemeVariant::Dark)]
fn dual_theme_variants_expand_to_single_builds(#[case] default: ThemeVariant) {
    let text = SAMPLES[1];
    let dual = build(
        ScopeMode::Color,
        ThemeSelection::pair(Some("day"), Some("night"), default),
        "js",
        text,
    );
    assert_eq!(dual.default_variant.as_deref(), Some(default.as_str()));

    for (key, theme) in [("light", "day"), ("dark", "night")] {
        let single = build(ScopeMode::Color, ThemeSelection::single(theme), "js", text);
        let (scopes, ranges, styles) = dual.expand_variant(key).unwrap();
        assert_eq!(scopes, single.scopes, "{key} scopes");
        assert_eq!(ranges, single.ranges, "{key} ranges");
        assert_eq!(styles, single.scope_styles, "{key} styles");
    }
}

type Token = (&'static str, Vec<String>, &'static str);

fn buckets<'a>(classifier: &ScopeClassifier, tokens: impl Iterator<Item = &'a Token>) -> Vec<Bucket> {
    tokens
        .map(|(lang, scopes, text)| classifier.bucket(&ScopeQuery::new(scopes, text), lang, None))
        .collect()
}

#[test]
fn classifier_is_deterministic_across_cache_states() {
    let tokens: Vec<Token> = vec![
        ("rust", vec!["keyword.control.rust".into(), "source.rust".into()], "fn"),
        ("python", vec!["string.quoted.single.python".into()], "'x'"),
        ("bash", vec!["meta.function-call.shell".into()], "echo"),
        ("yaml", vec!["entity.name.tag.yaml".into()], "key"),
        ("js", vec!["variable.other.readwrite.js".into()], "value"),
        ("css", vec!["source.css".into()], "@media"),
        ("", vec![], "42"),
    ];
    let classifier = ScopeClassifier::default();

    let cold = buckets(&classifier, tokens.iter());
    let warm = buckets(&classifier, tokens.iter());
    classifier.clear_cache();
    let mut reversed = buckets(&classifier, tokens.iter().rev());
    reversed.reverse();
    let fresh = buckets(&classifier, tokens.iter());

    assert_eq!(cold, warm);
    assert_eq!(cold, reversed);
    assert_eq!(cold, fresh);
}

#[test]
fn keyword_mode_labels_are_engine_prefixed_buckets() {
    let payload = build(
        ScopeMode::Keyword,
        ThemeSelection::ProviderDefault,
        "javascript",
        "const x = 1",
    );
    for name in &payload.scopes {
        assert!(name.starts_with("hl-shiki-"), "{name}");
    }
    assert!(payload.scopes.iter().any(|s| s == "hl-shiki-number"));
}
