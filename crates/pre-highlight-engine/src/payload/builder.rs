use super::names::{UniqueNames, sanitize_with_prefix};
use super::{
    BuildError, HighlightPayload, Newline, OffsetEncoding, RangeTuple, SCHEMA_VERSION, TokenEntry,
    utf16_len,
};
use std::collections::HashMap;

/// Turn provider entries into a deduplicated payload.
///
/// Entries sharing a scope (and, when `include_styles` is set, the same style)
/// share one slot in `scopes`. Every entry must satisfy
/// `start < end <= textLength` or the whole build fails.
pub fn build_payload(
    entries: &[TokenEntry],
    text: &str,
    lang: &str,
    engine: &str,
    scope_prefix: &str,
    include_styles: bool,
) -> Result<HighlightPayload, BuildError> {
    let text_length = utf16_len(text);
    let mut scopes = Vec::new();
    let mut styles = Vec::new();
    let mut ranges = Vec::with_capacity(entries.len());
    let mut index_by_key: HashMap<String, usize> = HashMap::new();
    let mut names = UniqueNames::new();

    for entry in entries {
        if entry.end <= entry.start || entry.end > text_length {
            return Err(BuildError::InvalidRange {
                start: entry.start as i64,
                end: entry.end as i64,
                text_length,
            });
        }

        let style = if include_styles {
            entry.style.clone().and_then(|s| s.normalized())
        } else {
            None
        };
        let key = match (&style, include_styles) {
            (_, false) => entry.scope.clone(),
            (Some(style), true) => format!("{}\u{1}{}", entry.scope, style.fingerprint()),
            (None, true) => format!("{}\u{1}", entry.scope),
        };

        let index = match index_by_key.get(&key) {
            Some(&index) => index,
            None => {
                let index = scopes.len();
                scopes.push(names.claim(sanitize_with_prefix(&entry.scope, scope_prefix)));
                styles.push(style);
                index_by_key.insert(key, index);
                index
            }
        };
        ranges.push(RangeTuple(index, entry.start, entry.end));
    }

    let scope_styles = (include_styles && styles.iter().any(Option::is_some)).then_some(styles);

    log::trace!(
        "built payload: engine={engine} lang={lang} scopes={} ranges={}",
        scopes.len(),
        ranges.len()
    );

    Ok(HighlightPayload {
        v: SCHEMA_VERSION,
        engine: engine.to_string(),
        lang: lang.to_string(),
        offset_encoding: OffsetEncoding::Utf16,
        newline: Newline::Lf,
        text_length,
        scopes,
        ranges,
        scope_styles,
        variants: None,
        default_variant: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{LineFeatures, ScopeStyle, line_feature_entries, parse_emphasis};
    use pretty_assertions::assert_eq;

    fn json(payload: &HighlightPayload) -> String {
        serde_json::to_string(payload).unwrap()
    }

    #[test]
    fn single_keyword_range() {
        let entries = [TokenEntry::new("keyword", 0, 5)];
        let payload = build_payload(&entries, "const x = 1", "js", "custom", "prefix", true).unwrap();
        insta::assert_snapshot!(json(&payload), @r#"{"v":1,"engine":"custom","lang":"js","offsetEncoding":"utf16","newline":"lf","textLength":11,"scopes":["prefix-keyword"],"ranges":[[0,0,5]]}"#);
    }

    #[test]
    fn emphasis_lines_become_prefixed_ranges() {
        let text = "a\nb\nc\nd";
        let emphasize = parse_emphasis("2-3");
        let entries = line_feature_entries(
            text,
            &LineFeatures {
                emphasize: &emphasize,
                comment_mark: None,
            },
        );
        let payload = build_payload(&entries, text, "text", "custom", "hl", true).unwrap();
        assert_eq!(payload.scopes, vec!["hl-pre-lines-emphasis"]);
        assert_eq!(payload.ranges, vec![RangeTuple(0, 2, 5)]);
        assert_eq!(payload.scope_styles, None);
    }

    #[test]
    fn same_scope_with_different_styles_gets_distinct_names() {
        let entries = [
            TokenEntry::new("kw", 0, 1).with_style(Some(ScopeStyle::color("#f00"))),
            TokenEntry::new("kw", 1, 2).with_style(Some(ScopeStyle::color("#0f0"))),
            TokenEntry::new("kw", 2, 3).with_style(Some(ScopeStyle::color("#f00"))),
        ];
        let payload = build_payload(&entries, "abc", "js", "shiki", "hl", true).unwrap();
        assert_eq!(payload.scopes, vec!["hl-kw", "hl-kw-2"]);
        assert_eq!(
            payload.ranges,
            vec![RangeTuple(0, 0, 1), RangeTuple(1, 1, 2), RangeTuple(0, 2, 3)]
        );
        assert_eq!(
            payload.scope_styles,
            Some(vec![
                Some(ScopeStyle::color("#f00")),
                Some(ScopeStyle::color("#0f0")),
            ])
        );
    }

    #[test]
    fn styles_are_ignored_when_disabled() {
        let entries = [
            TokenEntry::new("kw", 0, 1).with_style(Some(ScopeStyle::color("#f00"))),
            TokenEntry::new("kw", 1, 2).with_style(Some(ScopeStyle::color("#0f0"))),
        ];
        let payload = build_payload(&entries, "ab", "js", "shiki", "hl", false).unwrap();
        assert_eq!(payload.scopes, vec!["hl-kw"]);
        assert_eq!(payload.scope_styles, None);
    }

    #[test]
    fn text_length_counts_utf16_units() {
        let entries = [TokenEntry::new("emoji", 0, 2)];
        let payload = build_payload(&entries, "😀", "", "custom", "", true).unwrap();
        assert_eq!(payload.text_length, 2);
        assert_eq!(payload.scopes, vec!["emoji"]);
    }

    #[test]
    fn rejects_empty_and_out_of_bounds_ranges() {
        let empty = [TokenEntry::new("kw", 3, 3)];
        assert!(matches!(
            build_payload(&empty, "abcd", "js", "custom", "hl", true),
            Err(BuildError::InvalidRange { start: 3, end: 3, .. })
        ));
        let past_end = [TokenEntry::new("kw", 0, 5)];
        assert!(matches!(
            build_payload(&past_end, "abcd", "js", "custom", "hl", true),
            Err(BuildError::InvalidRange { text_length: 4, .. })
        ));
    }

    #[test]
    fn empty_input_builds_empty_payload() {
        let payload = build_payload(&[], "", "", "custom", "hl", true).unwrap();
        assert_eq!(payload.text_length, 0);
        assert!(payload.scopes.is_empty());
        assert!(payload.ranges.is_empty());
    }
}
