use std::collections::{HashMap, HashSet};

fn collapse_unsafe(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        let ch = if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
            ch
        } else {
            '-'
        };
        if ch == '-' && out.ends_with('-') {
            continue;
        }
        out.push(ch);
    }
    out.trim_matches('-').to_string()
}

/// Make `name` usable as a highlight registry key and CSS ident.
///
/// Runs of characters outside `[A-Za-z0-9_-]` become one hyphen, hyphens are
/// collapsed and trimmed, an empty result becomes `scope`, and a leading
/// digit gets an `x-` prefix.
pub fn sanitize_highlight_name(name: &str) -> String {
    let safe = collapse_unsafe(name);
    if safe.is_empty() {
        return "scope".to_string();
    }
    if safe.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("x-{safe}");
    }
    safe
}

/// Sanitize `name` and join it to an equally sanitized `prefix`.
pub fn sanitize_with_prefix(name: &str, prefix: &str) -> String {
    let prefix = collapse_unsafe(prefix);
    let safe = sanitize_highlight_name(name);
    if prefix.is_empty() {
        safe
    } else {
        format!("{prefix}-{safe}")
    }
}

/// Hands out `base`, then `base-2`, `base-3`, ... for repeats, skipping any
/// suffixed name that was already issued verbatim.
#[derive(Debug, Default)]
pub struct UniqueNames {
    next_suffix: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, base: String) -> String {
        if self.issued.insert(base.clone()) {
            self.next_suffix.insert(base.clone(), 2);
            return base;
        }
        let seq = self.next_suffix.entry(base.clone()).or_insert(2);
        loop {
            let candidate = format!("{base}-{seq}");
            *seq += 1;
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
