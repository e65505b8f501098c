use super::emitter::engine_scope_label;
use crate::payload::{TokenEntry, utf16_len};
use regex::Regex;
use std::sync::LazyLock;

static PRE_CODE_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)^\s*<pre\b(?:[^>"']|"[^"]*"|'[^']*')*>\s*<code\b(?:[^>"']|"[^"]*"|'[^']*')*>(.*?)</code>\s*</pre>\s*$"#,
    )
    .expect("valid pre/code wrapper regex")
});

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("valid class attribute regex")
});

/// Inner HTML of a `<pre><code>` wrapper, or the input when unwrapped.
pub fn strip_pre_code_wrapper(html: &str) -> &str {
    PRE_CODE_WRAPPER
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map_or(html, |m| m.as_str())
}

fn decode_entities(text: &str) -> String {
    if text.contains('&') {
        html_escape::decode_html_entities(text).into_owned()
    } else {
        text.to_string()
    }
}

/// `None` for a span without classes; its text stays unscoped.
fn scope_from_class(class_text: &str, lang: &str, engine: &str) -> Option<String> {
    let prefix = format!("{engine}-");
    let classes: Vec<&str> = class_text.split_whitespace().collect();
    if let Some(prefixed) = classes.iter().find(|c| c.starts_with(&prefix)) {
        return Some((*prefixed).to_string());
    }
    match classes.first() {
        None => None,
        Some(first) if *first != engine => Some(engine_scope_label(engine, first, lang)),
        Some(_) => Some(engine_scope_label(engine, "", lang)),
    }
}

fn class_text(tag_body: &str) -> &str {
    CLASS_ATTR
        .captures(tag_body)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map_or("", |m| m.as_str())
}

struct Scanner<'a> {
    stack: Vec<Option<String>>,
    cursor: usize,
    entries: Vec<TokenEntry>,
    lang: &'a str,
    engine: &'a str,
}

impl Scanner<'_> {
    fn text(&mut self, raw: &str) {
        let len = utf16_len(&decode_entities(raw));
        self.advance(len);
    }

    fn advance(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        if let Some(Some(scope)) = self.stack.last() {
            self.entries
                .push(TokenEntry::new(scope.clone(), self.cursor, self.cursor + len));
        }
        self.cursor += len;
    }

    fn tag(&mut self, body: &str) {
        let body = body.trim();
        if let Some(closing) = body.strip_prefix('/') {
            if closing.trim_start().to_ascii_lowercase().starts_with("span") {
                self.stack.pop();
            }
            return;
        }
        let name = body
            .split(' ')
            .next()
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_ascii_lowercase();
        match name.as_str() {
            "span" => {
                let scope = scope_from_class(class_text(body), self.lang, self.engine);
                self.stack.push(scope);
            }
            "br" => self.advance(1),
            _ => {}
        }
    }
}

/// Entries for highlighted HTML.
///
/// Only classed `<span>` nesting carries scope. Other tags are ignored
/// except `<br>`, which counts as one newline. A `<` with no closing `>` is literal text.
pub fn entries_from_html(html: &str, lang: &str, engine: &str) -> Vec<TokenEntry> {
    let source = strip_pre_code_wrapper(html);
    let mut scanner = Scanner {
        stack: Vec::new(),
        cursor: 0,
        entries: Vec::new(),
        lang,
        engine,
    };

    let mut rest = source;
    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            scanner.text(rest);
            break;
        };
        scanner.text(&rest[..lt]);
        let after = &rest[lt + 1..];
        let Some(gt) = after.find('>') else {
            scanner.text(&rest[lt..]);
            break;
        };
        scanner.tag(&after[..gt]);
        rest = &after[gt + 1..];
    }
    scanner.entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn spans_map_to_prefixed_classes() {
        let html = r#"<span class="hljs-keyword">let</span> x = <span class="hljs-string">&quot;a&lt;b&quot;</span>;"#;
        let entries = entries_from_html(html, "js", "hljs");
        assert_eq!(
            entries,
            vec![
                TokenEntry::new("hljs-keyword", 0, 3),
                TokenEntry::new("hljs-string", 8, 13),
            ]
        );
    }

    #[test]
    fn wrapper_is_stripped_and_br_counts_one() {
        let html = "<pre class=\"x\"><code class='language-js'><span class=\"hljs-comment\">a<br/>b</span></code></pre>\n";
        let entries = entries_from_html(html, "js", "hljs");
        assert_eq!(
            entries,
            vec![
                TokenEntry::new("hljs-comment", 0, 1),
                TokenEntry::new("hljs-comment", 1, 2),
                TokenEntry::new("hljs-comment", 2, 3),
            ]
        );
    }

    #[test]
    fn unprefixed_and_missing_classes_fall_back() {
        let html = r#"<span class=title.class>A</span><span>b</span><span class="hljs">c</span>"#;
        let entries = entries_from_html(html, "", "hljs");
        assert_eq!(
            entries,
            vec![
                TokenEntry::new("hljs-title-class", 0, 1),
                TokenEntry::new("hljs-plain", 2, 3),
            ]
        );
    }

    #[test]
    fn nested_spans_restore_outer_scope() {
        let html = r#"<span class="hljs-function">fn <span class="hljs-title">f</span>()</span>"#;
        let entries = entries_from_html(html, "rust", "hljs");
        assert_eq!(
            entries,
            vec![
                TokenEntry::new("hljs-function", 0, 3),
                TokenEntry::new("hljs-title", 3, 4),
                TokenEntry::new("hljs-function", 4, 6),
            ]
        );
    }

    #[test]
    fn unterminated_tag_is_literal_text() {
        let html = r#"<span class="hljs-operator">a <b</span"#;
        let entries = entries_from_html(html, "js", "hljs");
        assert_eq!(
            entries,
            vec![
                TokenEntry::new("hljs-operator", 0, 2),
                TokenEntry::new("hljs-operator", 2, 10),
            ]
        );
        let tail = entries_from_html("x < y", "js", "hljs");
        assert!(tail.is_empty());
    }
}
