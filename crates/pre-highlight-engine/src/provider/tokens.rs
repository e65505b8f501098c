use super::EntryOptions;
use crate::classify::{ScopeMode, ScopeQuery};
use crate::payload::{ScopeStyle, TokenEntry, utf16_len};
use serde::{Deserialize, Serialize};

const FONT_STYLE_UNDERLINE: u8 = 4;

/// One token from a themed tokenizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemedToken {
    pub content: String,
    /// UTF-16 offset into the whole block, when the tokenizer reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Bit flags: 1 italic, 2 bold, 4 underline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<u8>,
    /// Scope chain, outermost first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Vec<TokenExplanation>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExplanation {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub scopes: Vec<ExplanationScope>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExplanationScope {
    Name(String),
    Named {
        #[serde(rename = "scopeName")]
        scope_name: String,
    },
}

impl ExplanationScope {
    pub fn name(&self) -> &str {
        match self {
            ExplanationScope::Name(name) => name,
            ExplanationScope::Named { scope_name } => scope_name,
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

impl ThemedToken {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Innermost scope name the token carries.
    pub fn raw_scope(&self) -> Option<&str> {
        if let Some(last) = self.scopes.as_ref().and_then(|s| s.last()) {
            return non_empty(last);
        }
        if let Some(scope) = self.scope.as_deref().and_then(non_empty) {
            return Some(scope);
        }
        self.explanation
            .iter()
            .flatten()
            .rev()
            .flat_map(|exp| exp.scopes.iter().rev())
            .map(ExplanationScope::name)
            .find(|name| !name.is_empty())
    }

    /// Raw scope first, then every other scope the token mentions,
    /// innermost first, without duplicates.
    pub fn scope_candidates(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |scope: &str| {
            if !scope.is_empty() && !out.iter().any(|s| s == scope) {
                out.push(scope.to_string());
            }
        };
        if let Some(raw) = self.raw_scope() {
            push(raw);
        }
        for scope in self.scopes.iter().flatten().rev() {
            push(scope);
        }
        if let Some(scope) = &self.scope {
            push(scope);
        }
        for exp in self.explanation.iter().flatten() {
            for scope in exp.scopes.iter().rev() {
                push(scope.name());
            }
        }
        out
    }

    /// Paint properties that survive into a payload: color and underline.
    pub fn style(&self) -> Option<ScopeStyle> {
        let underline = self
            .font_style
            .is_some_and(|fs| fs & FONT_STYLE_UNDERLINE != 0);
        ScopeStyle {
            color: self.color.clone(),
            text_decoration: underline.then(|| "underline".to_string()),
            ..ScopeStyle::default()
        }
        .normalized()
    }
}

/// Entries for themed token lines.
///
/// Without offsets, tokens are laid end to end and each line break counts one
/// code unit. Empty tokens are skipped.
pub fn entries_from_token_lines(
    lines: &[Vec<ThemedToken>],
    lang: &str,
    engine: &str,
    options: &EntryOptions<'_>,
) -> Vec<TokenEntry> {
    let has_offsets = lines.iter().flatten().any(|tok| tok.offset.is_some());
    let fence_lang_key = match options.scope_mode {
        ScopeMode::Keyword => options.classifier.resolve_fence_language(lang),
        _ => None,
    };

    let mut entries = Vec::new();
    let mut cursor = 0;
    for (i, line) in lines.iter().enumerate() {
        for tok in line {
            if tok.content.is_empty() {
                continue;
            }
            let start = tok.offset.unwrap_or(cursor);
            let end = start + utf16_len(&tok.content);
            let style = tok.style();
            let candidates = tok.scope_candidates();
            let query = ScopeQuery::new(&candidates, &tok.content).with_color(
                style.as_ref().and_then(|s| s.color.as_deref()),
                tok.font_style,
            );
            let label = options.classifier.classify(
                &query,
                lang,
                options.scope_mode,
                fence_lang_key.as_deref(),
            );
            let style = if options.include_styles { style } else { None };
            entries.push(TokenEntry::new(format!("{engine}-{label}"), start, end).with_style(style));
            cursor = end;
        }
        if !has_offsets && i + 1 < lines.len() {
            cursor += 1;
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ScopeClassifier;
    use pretty_assertions::assert_eq;

    fn token(content: &str, scopes: &[&str], color: Option<&str>) -> ThemedToken {
        ThemedToken {
            scopes: Some(scopes.iter().map(|s| s.to_string()).collect()),
            color: color.map(str::to_string),
            ..ThemedToken::new(content)
        }
    }

    fn entries(lines: &[Vec<ThemedToken>], mode: ScopeMode) -> Vec<TokenEntry> {
        let classifier = ScopeClassifier::default();
        let options = EntryOptions {
            classifier: &classifier,
            scope_mode: mode,
            include_styles: true,
        };
        entries_from_token_lines(lines, "js", "shiki", &options)
    }

    #[test]
    fn cursor_advances_across_lines() {
        let lines = vec![
            vec![
                token("const", &["source.js", "storage.type.js"], Some("#F00")),
                token(" ", &["source.js"], None),
            ],
            vec![token("x", &["source.js", "variable.other.js"], None)],
        ];
        let got = entries(&lines, ScopeMode::Auto);
        assert_eq!(
            got,
            vec![
                TokenEntry::new("shiki-storage.type.js", 0, 5)
                    .with_style(Some(ScopeStyle::color("#F00"))),
                TokenEntry::new("shiki-source.js", 5, 6),
                TokenEntry::new("shiki-variable.other.js", 7, 8),
            ]
        );
    }

    #[test]
    fn explicit_offsets_win() {
        let mut first = token("a", &["x"], None);
        first.offset = Some(0);
        let mut second = token("b", &["y"], None);
        second.offset = Some(4);
        let got = entries(&[vec![first], vec![second]], ScopeMode::Auto);
        assert_eq!(got[1].start, 4);
        assert_eq!(got[1].end, 5);
    }

    #[test]
    fn color_mode_uses_color_and_font_style() {
        let mut tok = token("fn", &["keyword"], Some("#AbC"));
        tok.font_style = Some(4);
        let got = entries(&[vec![tok]], ScopeMode::Color);
        assert_eq!(got[0].scope, "shiki--abc-f4");
        assert_eq!(
            got[0].style.as_ref().and_then(|s| s.text_decoration.as_deref()),
            Some("underline")
        );
    }

    #[test]
    fn keyword_mode_buckets_scopes() {
        let lines = vec![vec![token(
            "// x",
            &["source.js", "comment.line.double-slash.js"],
            None,
        )]];
        let got = entries(&lines, ScopeMode::Keyword);
        assert_eq!(got[0].scope, "shiki-comment");
    }

    #[test]
    fn raw_scope_falls_back_to_explanation() {
        let tok = ThemedToken {
            explanation: Some(vec![TokenExplanation {
                content: "x".into(),
                scopes: vec![
                    ExplanationScope::Name("source.js".into()),
                    ExplanationScope::Named {
                        scope_name: "variable.other.js".into(),
                    },
                ],
            }]),
            ..ThemedToken::new("x")
        };
        assert_eq!(tok.raw_scope(), Some("variable.other.js"));
        assert_eq!(
            tok.scope_candidates(),
            vec!["variable.other.js".to_string(), "source.js".to_string()]
        );
    }

    #[test]
    fn unstyled_tokens_without_scope_use_language() {
        let got = entries(&[vec![ThemedToken::new("x")]], ScopeMode::Semantic);
        assert_eq!(got[0].scope, "shiki-js");
        assert_eq!(got[0].style, None);
    }
}
