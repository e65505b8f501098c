use crate::payload::{TokenEntry, utf16_len};
use serde::{Deserialize, Serialize};

/// Node of a highlighter's emitter tree: bare text or a scoped group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmitterNode {
    Text(String),
    Scope {
        #[serde(default)]
        scope: Option<String>,
        #[serde(default)]
        children: Vec<EmitterNode>,
    },
}

/// Label for an engine scope: dots become hyphens under an `{engine}-`
/// prefix. Already-prefixed scopes pass through; an empty scope names the
/// language.
pub fn engine_scope_label(engine: &str, scope: &str, lang: &str) -> String {
    let raw = scope.trim();
    if raw.is_empty() {
        let lang = if lang.is_empty() { "plain" } else { lang };
        return format!("{engine}-{lang}");
    }
    if raw
        .strip_prefix(engine)
        .is_some_and(|rest| rest.starts_with('-'))
    {
        return raw.to_string();
    }
    format!("{engine}-{}", raw.replace('.', "-"))
}

/// Entries for text under a scoped node. Unscoped text still advances the
/// offset.
pub fn entries_from_emitter(root: &EmitterNode, lang: &str, engine: &str) -> Vec<TokenEntry> {
    let mut entries = Vec::new();
    let mut cursor = 0;
    walk(root, None, &mut cursor, &mut entries, lang, engine);
    entries
}

fn walk(
    node: &EmitterNode,
    active: Option<&str>,
    cursor: &mut usize,
    entries: &mut Vec<TokenEntry>,
    lang: &str,
    engine: &str,
) {
    match node {
        EmitterNode::Text(text) => {
            let len = utf16_len(text);
            if len > 0
                && let Some(scope) = active
            {
                entries.push(TokenEntry::new(scope, *cursor, *cursor + len));
            }
            *cursor += len;
        }
        EmitterNode::Scope { scope, children } => {
            let label = scope
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| engine_scope_label(engine, s, lang));
            let next = label.as_deref().or(active);
            for child in children {
                walk(child, next, cursor, entries, lang, engine);
            }
        }
    }
}
