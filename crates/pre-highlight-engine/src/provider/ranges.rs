use super::ProviderError;
use crate::payload::{ScopeStyle, TokenEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A range's scope: an index into the `scopes` table or a literal name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeRef {
    Index(usize),
    Name(String),
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeRef::Index(i) => write!(f, "{i}"),
            ScopeRef::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CustomRange {
    Styled(ScopeRef, i64, i64, Option<ScopeStyle>),
    Plain(ScopeRef, i64, i64),
    Object {
        scope: ScopeRef,
        start: i64,
        end: i64,
        #[serde(default)]
        style: Option<ScopeStyle>,
    },
}

impl CustomRange {
    fn parts(self) -> (ScopeRef, i64, i64, Option<ScopeStyle>) {
        match self {
            CustomRange::Styled(scope, start, end, style) => (scope, start, end, style),
            CustomRange::Plain(scope, start, end) => (scope, start, end, None),
            CustomRange::Object {
                scope,
                start,
                end,
                style,
            } => (scope, start, end, style),
        }
    }
}

/// Styles keyed by scope index (list) or scope name (map).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeStyleTable {
    List(Vec<Option<ScopeStyle>>),
    Map(BTreeMap<String, ScopeStyle>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRanges {
    pub ranges: Vec<CustomRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_styles: Option<ScopeStyleTable>,
}

impl From<Vec<CustomRange>> for CustomRanges {
    fn from(ranges: Vec<CustomRange>) -> Self {
        Self {
            ranges,
            ..Self::default()
        }
    }
}

impl CustomRanges {
    fn scope_name(&self, scope: &ScopeRef) -> String {
        match scope {
            ScopeRef::Index(i) => self
                .scopes
                .as_ref()
                .and_then(|scopes| scopes.get(*i))
                .cloned()
                .unwrap_or_else(|| i.to_string()),
            ScopeRef::Name(name) => name.clone(),
        }
    }

    fn table_style(&self, scope: &ScopeRef, name: &str) -> Option<ScopeStyle> {
        match (self.scope_styles.as_ref()?, scope) {
            (ScopeStyleTable::List(list), ScopeRef::Index(i)) => list.get(*i).cloned().flatten(),
            (ScopeStyleTable::List(_), ScopeRef::Name(_)) => None,
            (ScopeStyleTable::Map(map), _) => map.get(name).cloned(),
        }
    }
}

/// Entries from explicit ranges.
///
/// Index scopes resolve through `scopes` when present; a range without its
/// own style takes one from `scopeStyles`. Negative bounds are rejected here;
/// the payload builder checks the rest.
pub fn entries_from_custom(custom: CustomRanges) -> Result<Vec<TokenEntry>, ProviderError> {
    let mut entries = Vec::with_capacity(custom.ranges.len());
    for range in &custom.ranges {
        let (scope, start, end, style) = range.clone().parts();
        if start < 0 || end < 0 {
            return Err(ProviderError::InvalidRange { start, end });
        }
        let name = custom.scope_name(&scope);
        let style = style
            .or_else(|| custom.table_style(&scope, &name))
            .and_then(ScopeStyle::normalized);
        entries.push(TokenEntry::new(name, start as usize, end as usize).with_style(style));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> CustomRanges {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn tuple_and_object_ranges_mix() {
        let custom = parse(
            r##"{
                "scopes": ["keyword", "string"],
                "scopeStyles": [{"color": "#f00"}, null],
                "ranges": [
                    [0, 0, 5],
                    [1, 6, 9, {"color": "#0f0"}],
                    {"scope": "number", "start": 10, "end": 11}
                ]
            }"##,
        );
        let entries = entries_from_custom(custom).unwrap();
        assert_eq!(
            entries,
            vec![
                TokenEntry::new("keyword", 0, 5).with_style(Some(ScopeStyle::color("#f00"))),
                TokenEntry::new("string", 6, 9).with_style(Some(ScopeStyle::color("#0f0"))),
                TokenEntry::new("number", 10, 11),
            ]
        );
    }

    #[test]
    fn unknown_index_becomes_its_number() {
        let custom = CustomRanges::from(vec![CustomRange::Plain(ScopeRef::Index(3), 0, 1)]);
        let entries = entries_from_custom(custom).unwrap();
        assert_eq!(entries[0].scope, "3");
    }

    #[test]
    fn map_table_styles_by_name() {
        let custom = parse(
            r##"{"scopeStyles": {"kw": {"textDecoration": "underline"}}, "ranges": [["kw", 0, 2]]}"##,
        );
        let entries = entries_from_custom(custom).unwrap();
        assert_eq!(
            entries[0].style.as_ref().and_then(|s| s.text_decoration.as_deref()),
            Some("underline")
        );
    }

    #[test]
    fn negative_bounds_are_rejected() {
        let custom = parse(r#"{"ranges": [["kw", -1, 2]]}"#);
        assert!(matches!(
            entries_from_custom(custom),
            Err(ProviderError::InvalidRange { start: -1, end: 2 })
        ));
    }
}
