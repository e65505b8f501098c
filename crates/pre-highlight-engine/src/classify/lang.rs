//! Language key resolution for keyword classification.
//!
//! Fence languages arrive in many spellings (`language-ts`, `Shell Script`,
//! `objective-c`). Everything is reduced to a normalized key and then matched
//! against the languages that carry a keyword table.

use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static SCOPE_LANG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\.)(?:source|text)\.([A-Za-z0-9_#+-]+)").expect("valid scope language regex")
});

const SHELL_KEYWORDS: &[&str] = &[
    "case", "coproc", "do", "done", "elif", "else", "esac", "export", "fi", "for", "function",
    "if", "in", "local", "readonly", "select", "then", "time", "typeset", "until", "while",
];

const HCL_KEYWORDS: &[&str] = &[
    "terraform", "resource", "data", "module", "provider", "variable", "output", "locals",
    "backend", "dynamic", "for_each", "count", "provisioner", "connection", "if", "for", "in",
];

const JAVASCRIPT_KEYWORDS: &[&str] = &[
    "await", "async", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "export", "extends", "finally", "for", "from", "function",
    "if", "import", "in", "instanceof", "let", "new", "of", "return", "static", "super", "switch",
    "this", "throw", "try", "typeof", "var", "void", "while", "with", "yield",
];

const TYPESCRIPT_KEYWORDS: &[&str] = &[
    "abstract", "as", "asserts", "async", "await", "break", "case", "catch", "class", "const",
    "continue", "debugger", "declare", "default", "delete", "do", "else", "enum", "export",
    "extends", "finally", "for", "from", "function", "if", "implements", "import", "in", "infer",
    "instanceof", "interface", "is", "keyof", "let", "namespace", "new", "of", "override",
    "private", "protected", "public", "readonly", "return", "satisfies", "static", "super",
    "switch", "this", "throw", "try", "type", "typeof", "var", "void", "while", "with", "yield",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

const SQL_KEYWORDS: &[&str] = &[
    "all", "alter", "and", "as", "asc", "between", "by", "create", "delete", "desc", "distinct",
    "drop", "from", "group", "having", "in", "inner", "insert", "into", "join", "left", "limit",
    "not", "null", "offset", "on", "or", "order", "order by", "outer", "right", "select", "set",
    "table", "union", "update", "values", "where", "with",
];

const GO_KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return",
    "select", "struct", "switch", "type", "var",
];

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while",
];

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "break", "case", "catch", "class", "continue", "default", "do", "else",
    "enum", "extends", "final", "finally", "for", "if", "implements", "import", "instanceof",
    "interface", "native", "new", "package", "private", "protected", "public", "return",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "try", "volatile", "while",
];

const RUBY_KEYWORDS: &[&str] = &[
    "alias", "and", "begin", "break", "case", "class", "def", "defined?", "do", "else", "elsif",
    "end", "ensure", "for", "if", "in", "module", "next", "not", "or", "redo", "rescue", "retry",
    "return", "self", "super", "then", "undef", "unless", "until", "when", "while", "yield",
];

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "const", "continue", "default", "do", "else", "enum", "extern",
    "for", "goto", "if", "inline", "register", "restrict", "return", "sizeof", "static",
    "struct", "switch", "typedef", "union", "volatile", "while",
];

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "auto", "break", "case", "catch", "class", "const", "consteval",
    "constexpr", "constinit", "continue", "decltype", "default", "delete", "do", "else", "enum",
    "explicit", "export", "extern", "final", "for", "friend", "goto", "if", "inline", "mutable",
    "namespace", "new", "noexcept", "operator", "override", "private", "protected", "public",
    "return", "sizeof", "static", "struct", "switch", "template", "this", "throw", "try",
    "typedef", "typename", "union", "using", "virtual", "volatile", "while",
];

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "base", "break", "case", "catch", "checked", "class",
    "const", "continue", "default", "delegate", "do", "else", "enum", "event", "explicit",
    "extern", "finally", "fixed", "for", "foreach", "goto", "if", "implicit", "in", "interface",
    "internal", "is", "lock", "namespace", "new", "operator", "out", "override", "params",
    "private", "protected", "public", "readonly", "record", "ref", "return", "sealed", "sizeof",
    "stackalloc", "static", "struct", "switch", "this", "throw", "try", "typeof", "unchecked",
    "unsafe", "using", "virtual", "volatile", "while", "var",
];

const PHP_KEYWORDS: &[&str] = &[
    "abstract", "and", "array", "as", "break", "callable", "case", "catch", "class", "clone",
    "const", "continue", "declare", "default", "do", "echo", "else", "elseif", "enddeclare",
    "endfor", "endforeach", "endif", "endswitch", "endwhile", "extends", "final", "finally",
    "fn", "for", "foreach", "function", "global", "goto", "if", "implements", "include",
    "include_once", "instanceof", "interface", "match", "namespace", "new", "or", "print",
    "private", "protected", "public", "readonly", "require", "require_once", "return",
    "static", "switch", "throw", "trait", "try", "use", "while", "xor", "yield",
];

const CSS_KEYWORDS: &[&str] = &["from", "to"];

/// Keyword table for a resolved language key, if the language has one.
pub fn keyword_table(lang_key: &str) -> Option<&'static [&'static str]> {
    let table = match lang_key {
        "javascript" => JAVASCRIPT_KEYWORDS,
        "typescript" => TYPESCRIPT_KEYWORDS,
        "python" => PYTHON_KEYWORDS,
        "bash" | "shellscript" => SHELL_KEYWORDS,
        "sql" => SQL_KEYWORDS,
        "go" => GO_KEYWORDS,
        "rust" => RUST_KEYWORDS,
        "java" => JAVA_KEYWORDS,
        "ruby" => RUBY_KEYWORDS,
        "c" => C_KEYWORDS,
        "cpp" => CPP_KEYWORDS,
        "csharp" => CSHARP_KEYWORDS,
        "php" => PHP_KEYWORDS,
        "hcl" | "terraform" => HCL_KEYWORDS,
        "css" => CSS_KEYWORDS,
        _ => return None,
    };
    Some(table)
}

fn is_known(lang_key: &str) -> bool {
    keyword_table(lang_key).is_some()
}

/// Normalize a language name into the key space used by the keyword tables.
///
/// Lowercases, drops a `language-` prefix, turns whitespace, `.`, `/` and `_`
/// into hyphens, discards anything outside `[a-z0-9#+-]`, then collapses and
/// trims hyphens.
pub fn normalize_lang_key(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let body = lower.strip_prefix("language-").unwrap_or(&lower);

    let mut out = String::with_capacity(body.len());
    for ch in body.chars() {
        let mapped = if ch.is_whitespace() || matches!(ch, '.' | '/' | '_') {
            '-'
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '#' | '+' | '-')
        {
            ch
        } else {
            continue;
        };
        if mapped == '-' && out.ends_with('-') {
            continue;
        }
        out.push(mapped);
    }
    out.trim_matches('-').to_string()
}

/// Normalize both sides of an alias table, dropping entries that normalize
/// to nothing.
pub fn normalize_alias_map<I, K, V>(input: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    input
        .into_iter()
        .filter_map(|(from, to)| {
            let from = normalize_lang_key(from.as_ref());
            let to = normalize_lang_key(to.as_ref());
            (!from.is_empty() && !to.is_empty()).then_some((from, to))
        })
        .collect()
}

/// `source.<id>` / `text.<id>` language hints embedded in a scope name.
pub fn scope_language_hints(scope: &str) -> impl Iterator<Item = &str> {
    SCOPE_LANG
        .captures_iter(scope)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// Alias tables consulted when a language key has no keyword table of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageAliases {
    /// Caller supplied aliases. Checked first.
    pub custom: BTreeMap<String, String>,
    /// Aliases reported by the highlighter itself.
    pub internal: BTreeMap<String, String>,
}

impl LanguageAliases {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.custom
            .get(key)
            .or_else(|| self.internal.get(key))
            .map(String::as_str)
    }
}

struct CandidateQueue {
    queue: Vec<String>,
    seen: HashSet<String>,
}

impl CandidateQueue {
    fn new() -> Self {
        Self {
            queue: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn push(&mut self, value: &str) {
        let key = normalize_lang_key(value);
        if key.is_empty() || self.seen.contains(&key) {
            return;
        }
        self.seen.insert(key.clone());
        self.queue.push(key);
    }
}

/// Resolve the keyword-table language for a token.
///
/// Candidates are tried in order: the resolver hint, the declared language,
/// then languages named by the scope chain. Each candidate is checked
/// directly, through the alias tables, with hyphens removed and with trailing
/// hyphen segments cut off. Aliases that do not resolve immediately are
/// queued as further candidates. Returns an empty string when nothing matches.
pub fn resolve_language(
    hint: Option<&str>,
    lang: &str,
    scope_candidates: &[String],
    aliases: &LanguageAliases,
) -> String {
    let mut candidates = CandidateQueue::new();
    if let Some(hint) = hint {
        candidates.push(hint);
    }
    candidates.push(lang);
    for scope in scope_candidates {
        for found in scope_language_hints(scope) {
            candidates.push(found);
        }
    }

    let mut i = 0;
    while i < candidates.queue.len() {
        let key = candidates.queue[i].clone();
        i += 1;

        if is_known(&key) {
            return key;
        }
        if let Some(aliased) = aliases.lookup(&key) {
            if is_known(aliased) {
                return aliased.to_string();
            }
            let aliased = aliased.to_string();
            candidates.push(&aliased);
        }

        let compact = key.replace('-', "");
        if is_known(&compact) {
            return compact;
        }
        if let Some(aliased) = aliases.lookup(&compact) {
            if is_known(aliased) {
                return aliased.to_string();
            }
            let aliased = aliased.to_string();
            candidates.push(&aliased);
        }

        let parts: Vec<&str> = key.split('-').collect();
        for n in (1..parts.len()).rev() {
            let head = parts[..n].join("-");
            if is_known(&head) {
                return head;
            }
            if let Some(aliased) = aliases.lookup(&head) {
                if is_known(aliased) {
                    return aliased.to_string();
                }
                let aliased = aliased.to_string();
                candidates.push(&aliased);
            }
        }
    }
    String::new()
}
