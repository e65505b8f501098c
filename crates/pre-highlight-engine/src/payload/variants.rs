use super::{HighlightPayload, VariantRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeVariant {
    #[default]
    Light,
    Dark,
}

impl ThemeVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeVariant::Light => "light",
            ThemeVariant::Dark => "dark",
        }
    }

    pub fn other(self) -> Self {
        match self {
            ThemeVariant::Light => ThemeVariant::Dark,
            ThemeVariant::Dark => ThemeVariant::Light,
        }
    }

    /// `dark` (any case, surrounding whitespace allowed) is dark; anything
    /// else is light.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("dark") {
            ThemeVariant::Dark
        } else {
            ThemeVariant::Light
        }
    }
}

impl fmt::Display for ThemeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn diff_record(variant: HighlightPayload, base: &HighlightPayload) -> VariantRecord {
    let mut record = VariantRecord::default();
    if variant.scopes != base.scopes {
        record.scopes = Some(variant.scopes);
    }
    if variant.ranges != base.ranges {
        record.ranges = Some(variant.ranges);
    }
    if variant.scope_styles != base.scope_styles {
        record.scope_styles = match variant.scope_styles {
            Some(styles) => Some(styles),
            None => base.scope_styles.as_ref().map(|_| Vec::new()),
        };
    }
    record
}

/// Fold a light and a dark build of the same block into one payload.
///
/// The `default` build becomes the base. `variants` holds an empty record for
/// the default and, for the other theme, only the fields that differ. An empty
/// `scopeStyles` list means the other theme carries no styles at all.
pub fn merge_dual_theme(
    light: HighlightPayload,
    dark: HighlightPayload,
    default: ThemeVariant,
) -> HighlightPayload {
    let (mut base, other) = match default {
        ThemeVariant::Light => (light, dark),
        ThemeVariant::Dark => (dark, light),
    };
    let record = diff_record(other, &base);
    let mut variants = BTreeMap::new();
    variants.insert(default.as_str().to_string(), VariantRecord::default());
    variants.insert(default.other().as_str().to_string(), record);
    base.variants = Some(variants);
    base.default_variant = Some(default.as_str().to_string());
    base
}
