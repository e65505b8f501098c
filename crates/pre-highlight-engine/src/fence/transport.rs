use crate::payload::{HighlightPayload, sanitize_highlight_name};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub const BLOCK_ATTR: &str = "data-pre-highlight";
pub const APPLIED_ATTR: &str = "data-pre-highlight-applied";
pub const DATA_SCRIPT_ID: &str = "pre-highlight-data";
pub const SCOPE_STYLE_TAG_ID: &str = "pre-highlight-scope-style";

/// Per-document render state: payloads gathered for env transport and the
/// block id sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderEnv {
    pub payloads: BTreeMap<String, HighlightPayload>,
    seq: usize,
}

impl RenderEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_block_id(&mut self, prefix: &str) -> String {
        self.seq += 1;
        format!("{prefix}{}", self.seq)
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

/// JSON safe to embed in a `<script>` element.
pub fn escape_json_for_script<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    Ok(out)
}

pub fn escape_html_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Script element carrying one block's payload next to the block.
pub fn inline_payload_script(block_id: &str, payload: &HighlightPayload) -> serde_json::Result<String> {
    let json = escape_json_for_script(payload)?;
    let id = escape_html_attr(block_id);
    Ok(format!(
        "<script type=\"application/json\" id=\"{DATA_SCRIPT_ID}-{id}\" {BLOCK_ATTR}=\"{id}\">{json}</script>\n"
    ))
}

/// One script element holding every env-transported payload, keyed by block
/// id. Empty when nothing was collected.
pub fn render_payload_script(env: &RenderEnv, script_id: &str) -> serde_json::Result<String> {
    if env.is_empty() {
        return Ok(String::new());
    }
    let script_id = if script_id.is_empty() {
        DATA_SCRIPT_ID
    } else {
        script_id
    };
    let json = escape_json_for_script(&env.payloads)?;
    Ok(format!(
        "<script type=\"application/json\" id=\"{}\">{json}</script>",
        escape_html_attr(script_id)
    ))
}

/// Build-time `::highlight()` rules for every styled scope, one rule per
/// runtime name. Empty when no scope carries a usable style.
pub fn render_scope_style_tag(env: &RenderEnv, style_tag_id: &str) -> String {
    let mut used = HashSet::new();
    let mut rules = Vec::new();
    for payload in env.payloads.values() {
        let Some(styles) = &payload.scope_styles else {
            continue;
        };
        for (name, style) in payload.scopes.iter().zip(styles) {
            if name.is_empty() {
                continue;
            }
            let runtime_name = sanitize_highlight_name(name);
            if used.contains(&runtime_name) {
                continue;
            }
            let css = style.as_ref().map(|s| s.to_css()).unwrap_or_default();
            if css.is_empty() {
                continue;
            }
            rules.push(format!("::highlight({runtime_name}){{{css};}}"));
            used.insert(runtime_name);
        }
    }
    if rules.is_empty() {
        return String::new();
    }
    let style_tag_id = if style_tag_id.is_empty() {
        SCOPE_STYLE_TAG_ID
    } else {
        style_tag_id
    };
    format!(
        "<style id=\"{}\">\n{}\n</style>",
        escape_html_attr(style_tag_id),
        rules.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{ScopeStyle, TokenEntry, build_payload};

    fn payload(text: &str, scope: &str, color: Option<&str>) -> HighlightPayload {
        let entry = TokenEntry::new(scope, 0, 1).with_style(color.map(ScopeStyle::color));
        build_payload(&[entry], text, "js", "custom", "hl", true).unwrap()
    }

    #[test]
    fn script_json_escapes_markup_characters() {
        let escaped = escape_json_for_script("</script><b>&\u{2028}").unwrap();
        assert_eq!(escaped, r#""\u003C/script\u003E\u003Cb\u003E\u0026\u2028""#);
    }

    #[test]
    fn block_ids_count_up_per_env() {
        let mut env = RenderEnv::new();
        assert_eq!(env.next_block_id("hl-"), "hl-1");
        assert_eq!(env.next_block_id("hl-"), "hl-2");
        assert_eq!(RenderEnv::new().next_block_id("x"), "x1");
    }

    #[test]
    fn inline_script_names_block() {
        let script = inline_payload_script("hl-1", &payload("a<b", "kw", None)).unwrap();
        insta::assert_snapshot!(script.trim_end(), @r#"<script type="application/json" id="pre-highlight-data-hl-1" data-pre-highlight="hl-1">{"v":1,"engine":"custom","lang":"js","offsetEncoding":"utf16","newline":"lf","textLength":3,"scopes":["hl-kw"],"ranges":[[0,0,1]]}</script>"#);
    }

    #[test]
    fn aggregate_script_is_empty_without_payloads() {
        assert_eq!(render_payload_script(&RenderEnv::new(), "").unwrap(), "");
    }

    #[test]
    fn style_tag_dedupes_runtime_names() {
        let mut env = RenderEnv::new();
        env.payloads
            .insert("hl-1".into(), payload("a", "kw", Some("#f00")));
        env.payloads
            .insert("hl-2".into(), payload("b", "kw", Some("#0f0")));
        env.payloads.insert("hl-3".into(), payload("c", "plain", None));
        insta::assert_snapshot!(render_scope_style_tag(&env, ""), @r##"
        <style id="pre-highlight-scope-style">
        ::highlight(hl-kw){color:#f00;}
        </style>
        "##);
    }
}
