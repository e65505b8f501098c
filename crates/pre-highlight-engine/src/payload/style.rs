use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SAFE_STYLE_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[#(),.%\w\s-]+$").expect("valid style value regex"));

/// Paint properties a range highlight can carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_shadow: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn safe(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|v| SAFE_STYLE_VALUE.is_match(v))
}

impl ScopeStyle {
    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }

    /// Drop empty properties; `None` when nothing is left.
    pub fn normalized(self) -> Option<Self> {
        let style = Self {
            color: non_empty(self.color),
            background_color: non_empty(self.background_color),
            text_decoration: non_empty(self.text_decoration),
            text_shadow: non_empty(self.text_shadow),
        };
        (!style.is_empty()).then_some(style)
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none()
            && self.background_color.is_none()
            && self.text_decoration.is_none()
            && self.text_shadow.is_none()
    }

    /// Stable key distinguishing scopes that share a name but not a style.
    pub fn fingerprint(&self) -> String {
        let mut key = String::new();
        if let Some(v) = &self.color {
            key.push_str(&format!("c:{v};"));
        }
        if let Some(v) = &self.background_color {
            key.push_str(&format!("bg:{v};"));
        }
        if let Some(v) = &self.text_decoration {
            key.push_str(&format!("td:{v};"));
        }
        if let Some(v) = &self.text_shadow {
            key.push_str(&format!("ts:{v};"));
        }
        key
    }

    /// CSS declarations for a `::highlight()` rule.
    ///
    /// Values outside `[#(),.%\w\s-]` are left out so payload text can never
    /// break out of the declaration block.
    pub fn to_css(&self) -> String {
        let mut parts = Vec::new();
        if let Some(v) = safe(&self.color) {
            parts.push(format!("color:{v}"));
        }
        if let Some(v) = safe(&self.background_color) {
            parts.push(format!("background-color:{v}"));
        }
        if let Some(v) = safe(&self.text_decoration) {
            parts.push(format!("text-decoration:{v}"));
        }
        if let Some(v) = safe(&self.text_shadow) {
            parts.push(format!("text-shadow:{v}"));
        }
        parts.join(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_properties_normalize_away() {
        let style = ScopeStyle {
            color: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(style.normalized(), None);
    }

    #[test]
    fn fingerprint_lists_set_properties_in_fixed_order() {
        let style = ScopeStyle {
            color: Some("#fff".into()),
            text_shadow: Some("none".into()),
            ..Default::default()
        };
        assert_eq!(style.fingerprint(), "c:#fff;ts:none;");
    }

    #[test]
    fn css_skips_unsafe_values() {
        let style = ScopeStyle {
            color: Some("rgb(1, 2, 3)".into()),
            background_color: Some("red;}body{display:none".into()),
            text_decoration: Some("underline".into()),
            ..Default::default()
        };
        assert_eq!(style.to_css(), "color:rgb(1, 2, 3);text-decoration:underline");
    }
}
