//! Loose reading of payload JSON.
//!
//! Payloads come from the page and are not trusted to match the schema, so
//! the runtime reads them as [`Value`]s and skips whatever does not fit
//! instead of rejecting the whole map.

use serde_json::Value;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// An integral JSON number within the safe integer range, accepting `1.0`.
pub fn safe_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return (n.unsigned_abs() as f64 <= MAX_SAFE_INTEGER).then_some(n);
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER).then_some(f as i64)
}

/// JavaScript truthiness, which decides whether a variant entry exists.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The scopes, ranges and styles one apply pass uses for a payload.
#[derive(Debug, Clone, Copy)]
pub struct PayloadView<'a> {
    pub scopes: &'a [Value],
    pub ranges: &'a [Value],
    pub scope_styles: Option<&'a [Value]>,
    /// Empty when the payload has no variants.
    pub variant_key: &'a str,
}

fn array<'a>(value: Option<&'a Value>) -> Option<&'a [Value]> {
    value.and_then(Value::as_array).map(Vec::as_slice)
}

/// Base `scopes` and `ranges`, when the payload has both as arrays.
pub fn base_tables(payload: &Value) -> Option<(&[Value], &[Value])> {
    Some((array(payload.get("scopes"))?, array(payload.get("ranges"))?))
}

/// Pick the variant for `scheme`: the scheme itself, then the payload's
/// default, then the first variant key. Fields a variant leaves out come
/// from the base.
pub fn resolve_view<'a>(payload: &'a Value, scheme: &str) -> Option<PayloadView<'a>> {
    let (scopes, ranges) = base_tables(payload)?;
    let base = PayloadView {
        scopes,
        ranges,
        scope_styles: array(payload.get("scopeStyles")),
        variant_key: "",
    };
    let Some(variants) = payload.get("variants").and_then(Value::as_object) else {
        return Some(base);
    };
    let stored_key = |key: &str| {
        variants
            .iter()
            .find(|(k, v)| k.as_str() == key && truthy(v))
            .map(|(k, _)| k.as_str())
    };
    let key = stored_key(scheme).or_else(|| {
        payload
            .get("defaultVariant")
            .and_then(Value::as_str)
            .and_then(stored_key)
    });
    let Some(key) = key.or_else(|| variants.keys().next().map(String::as_str)) else {
        return Some(base);
    };
    let variant = variants.get(key).filter(|v| v.is_object());
    let field = |name: &str| array(variant.and_then(|v| v.get(name)));
    Some(PayloadView {
        scopes: field("scopes").unwrap_or(base.scopes),
        ranges: field("ranges").unwrap_or(base.ranges),
        scope_styles: field("scopeStyles").or(base.scope_styles),
        variant_key: key,
    })
}

/// A scope table entry as a name. Empty strings and non-scalar values
/// count as missing.
pub fn scope_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if truthy(value) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dual() -> Value {
        json!({
            "v": 1,
            "scopes": ["hl-a"],
            "ranges": [[0, 0, 1]],
            "scopeStyles": [{"color": "#000"}],
            "variants": {"dark": {"scopeStyles": [{"color": "#fff"}]}, "light": {}},
            "defaultVariant": "light"
        })
    }

    #[test]
    fn scheme_variant_overrides_styles_only() {
        let payload = dual();
        let view = resolve_view(&payload, "dark").unwrap();
        assert_eq!(view.variant_key, "dark");
        assert_eq!(view.scopes, &[json!("hl-a")]);
        assert_eq!(view.scope_styles.unwrap(), &[json!({"color": "#fff"})]);
    }

    #[test]
    fn unknown_scheme_uses_default_then_first() {
        let payload = dual();
        assert_eq!(resolve_view(&payload, "sepia").unwrap().variant_key, "light");

        let mut no_default = dual();
        no_default["defaultVariant"] = json!("missing");
        assert_eq!(resolve_view(&no_default, "sepia").unwrap().variant_key, "dark");
    }

    #[test]
    fn payload_without_tables_has_no_view() {
        assert!(resolve_view(&json!({"scopes": []}), "light").is_none());
        assert!(resolve_view(&json!("nope"), "light").is_none());
        let plain = json!({"scopes": [], "ranges": []});
        assert_eq!(resolve_view(&plain, "dark").unwrap().variant_key, "");
    }

    #[test]
    fn integers_follow_safe_integer_rules() {
        assert_eq!(safe_integer(&json!(3)), Some(3));
        assert_eq!(safe_integer(&json!(3.0)), Some(3));
        assert_eq!(safe_integer(&json!(-2)), Some(-2));
        assert_eq!(safe_integer(&json!(2.5)), None);
        assert_eq!(safe_integer(&json!(1e300)), None);
        assert_eq!(safe_integer(&json!("3")), None);
    }

    #[test]
    fn scope_names_reject_empty_entries() {
        assert_eq!(scope_name(&json!("kw")), Some("kw".to_string()));
        assert_eq!(scope_name(&json!(7)), Some("7".to_string()));
        assert_eq!(scope_name(&json!("")), None);
        assert_eq!(scope_name(&json!(0)), None);
        assert_eq!(scope_name(&json!(null)), None);
    }
}
