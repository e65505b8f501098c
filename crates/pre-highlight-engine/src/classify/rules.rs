//! Priority-ordered override rules.
//!
//! A rule is a list of predicates plus a bucket to assign. Rules are grouped
//! into a global set and per-language sets; each set is sorted once by
//! descending priority and evaluated top-down against the running bucket.

use super::bucket::Bucket;
use super::context::TokenContext;
use regex::Regex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Punctuation,
}

#[derive(Debug, Clone)]
pub enum RulePredicate {
    /// Running bucket must be one of these.
    BaseIn(Vec<Bucket>),
    /// Resolved language key must be one of these.
    Lang(Vec<String>),
    ScopeIncludesAny(Vec<String>),
    ScopeExcludesAny(Vec<String>),
    /// Lowercased, trimmed token must equal one of these.
    TokenEquals(Vec<String>),
    TokenRegex(Regex),
    TokenKind(TokenKind),
}

impl RulePredicate {
    fn matches(&self, current: Bucket, ctx: &TokenContext<'_>) -> bool {
        match self {
            RulePredicate::BaseIn(buckets) => buckets.is_empty() || buckets.contains(&current),
            RulePredicate::Lang(langs) => {
                langs.is_empty() || langs.iter().any(|lang| lang == ctx.lang_key)
            }
            RulePredicate::ScopeIncludesAny(patterns) => {
                patterns.is_empty() || ctx.any(&as_strs(patterns))
            }
            RulePredicate::ScopeExcludesAny(patterns) => {
                patterns.is_empty() || !ctx.any(&as_strs(patterns))
            }
            RulePredicate::TokenEquals(tokens) => {
                tokens.is_empty() || tokens.iter().any(|token| *token == ctx.lower)
            }
            RulePredicate::TokenRegex(regex) => regex.is_match(ctx.trimmed),
            RulePredicate::TokenKind(TokenKind::Identifier) => ctx.is_identifier,
            RulePredicate::TokenKind(TokenKind::Punctuation) => ctx.is_punctuation,
        }
    }
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct ClassificationRule {
    pub id: String,
    pub priority: i32,
    pub predicates: Vec<RulePredicate>,
    /// Bucket assigned on match. `None` keeps the running bucket.
    pub result: Option<Bucket>,
    /// Stop evaluating the rest of this set after a match.
    pub stop_on_match: bool,
}

impl ClassificationRule {
    pub fn new(id: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            priority,
            predicates: Vec::new(),
            result: None,
            stop_on_match: true,
        }
    }

    pub fn base_in(mut self, buckets: &[Bucket]) -> Self {
        self.predicates.push(RulePredicate::BaseIn(buckets.to_vec()));
        self
    }

    pub fn lang(mut self, langs: &[&str]) -> Self {
        self.predicates.push(RulePredicate::Lang(owned(langs)));
        self
    }

    pub fn scope_any(mut self, patterns: &[&str]) -> Self {
        self.predicates
            .push(RulePredicate::ScopeIncludesAny(owned(patterns)));
        self
    }

    pub fn scope_none(mut self, patterns: &[&str]) -> Self {
        self.predicates
            .push(RulePredicate::ScopeExcludesAny(owned(patterns)));
        self
    }

    pub fn token_equals(mut self, tokens: &[&str]) -> Self {
        self.predicates.push(RulePredicate::TokenEquals(owned(tokens)));
        self
    }

    pub fn token_regex(mut self, regex: Regex) -> Self {
        self.predicates.push(RulePredicate::TokenRegex(regex));
        self
    }

    pub fn token_kind(mut self, kind: TokenKind) -> Self {
        self.predicates.push(RulePredicate::TokenKind(kind));
        self
    }

    pub fn set(mut self, bucket: Bucket) -> Self {
        self.result = Some(bucket);
        self
    }

    pub fn continue_on_match(mut self) -> Self {
        self.stop_on_match = false;
        self
    }

    pub fn matches(&self, current: Bucket, ctx: &TokenContext<'_>) -> bool {
        self.predicates.iter().all(|p| p.matches(current, ctx))
    }
}

/// Sorted global and per-language rule sets.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    global: Vec<ClassificationRule>,
    by_lang: HashMap<String, Vec<ClassificationRule>>,
}

impl RuleSet {
    pub fn new(
        global: Vec<ClassificationRule>,
        by_lang: impl IntoIterator<Item = (String, Vec<ClassificationRule>)>,
    ) -> Self {
        let mut set = Self {
            global,
            by_lang: by_lang.into_iter().collect(),
        };
        set.sort();
        set
    }

    /// The rules shipped with the classifier.
    pub fn builtin() -> Self {
        Self::new(builtin_global_rules(), builtin_language_rules())
    }

    /// Merge extra rules in. Sets are re-sorted afterwards.
    pub fn extend(
        &mut self,
        global: Vec<ClassificationRule>,
        by_lang: impl IntoIterator<Item = (String, Vec<ClassificationRule>)>,
    ) {
        self.global.extend(global);
        for (lang, rules) in by_lang {
            self.by_lang.entry(lang).or_default().extend(rules);
        }
        self.sort();
    }

    fn sort(&mut self) {
        // stable: equal priorities keep declaration order
        self.global.sort_by(|a, b| b.priority.cmp(&a.priority));
        for rules in self.by_lang.values_mut() {
            rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        }
    }

    pub fn global(&self) -> &[ClassificationRule] {
        &self.global
    }

    pub fn for_lang(&self, lang_key: &str) -> &[ClassificationRule] {
        self.by_lang.get(lang_key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn apply(&self, current: Bucket, ctx: &TokenContext<'_>) -> Bucket {
        let next = apply_rules(current, &self.global, ctx);
        apply_rules(next, self.for_lang(ctx.lang_key), ctx)
    }
}

fn apply_rules(current: Bucket, rules: &[ClassificationRule], ctx: &TokenContext<'_>) -> Bucket {
    let mut next = current;
    for rule in rules {
        if !rule.matches(next, ctx) {
            continue;
        }
        if let Some(bucket) = rule.result {
            next = bucket;
        }
        if rule.stop_on_match {
            break;
        }
    }
    next
}

fn builtin_global_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new("css-color-name-to-number", 2100)
            .scope_any(&["support.constant.color.w3c-standard-color-name.css"])
            .set(Bucket::Number),
        ClassificationRule::new("rust-lifetime-to-type-name", 2050)
            .lang(&["rust"])
            .scope_any(&["entity.name.type.lifetime.rust"])
            .set(Bucket::TypeName),
        ClassificationRule::new("regex-alternative-operator-keyword", 2040)
            .scope_any(&["keyword.operator.or.regexp"])
            .token_equals(&["|"])
            .set(Bucket::Keyword),
    ]
}

fn builtin_language_rules() -> Vec<(String, Vec<ClassificationRule>)> {
    let record_signature = Regex::new(r"[(),]").expect("valid record signature regex");
    vec![
        (
            "sql".to_string(),
            vec![
                ClassificationRule::new("sql-window-function-blue", 2000)
                    .scope_any(&["support.function.ranking.sql"])
                    .set(Bucket::Type),
                ClassificationRule::new("sql-table-database-name-blue", 1980)
                    .scope_any(&[
                        "constant.other.table-name.sql",
                        "constant.other.database-name.sql",
                    ])
                    .set(Bucket::Type),
            ],
        ),
        (
            "java".to_string(),
            vec![
                ClassificationRule::new("java-record-signature-neutral", 1995)
                    .scope_any(&["meta.record.identifier.java"])
                    .token_regex(record_signature)
                    .set(Bucket::Text),
                ClassificationRule::new("java-package-separator-neutral", 1980)
                    .scope_any(&["punctuation.separator.java"])
                    .set(Bucket::Text),
                ClassificationRule::new("java-generic-bracket-neutral", 1970)
                    .scope_any(&["punctuation.bracket.angle.java"])
                    .set(Bucket::Text),
                ClassificationRule::new("java-record-keyword", 1960)
                    .scope_any(&["storage.modifier.java"])
                    .token_kind(TokenKind::Identifier)
                    .token_equals(&["record"])
                    .set(Bucket::Keyword),
                ClassificationRule::new("java-record-type-name", 1950)
                    .scope_any(&["entity.name.type.record.java"])
                    .token_kind(TokenKind::Identifier)
                    .set(Bucket::TypeName),
                ClassificationRule::new("java-primitive-keyword", 1940)
                    .scope_any(&["storage.type.primitive.java"])
                    .token_kind(TokenKind::Identifier)
                    .set(Bucket::Keyword),
            ],
        ),
        (
            "php".to_string(),
            vec![
                ClassificationRule::new("php-array-func-builtin", 2000)
                    .scope_any(&["support.function.array.php"])
                    .set(Bucket::TitleFunctionBuiltin),
                ClassificationRule::new("php-core-const-blue", 1980)
                    .scope_any(&["support.constant.core.php", "constant.other.php"])
                    .set(Bucket::VariableConst),
                ClassificationRule::new("php-enum-const-blue", 1970)
                    .scope_any(&["constant.enum.php", "constant.other.class.php"])
                    .set(Bucket::VariableConst),
            ],
        ),
        (
            "ruby".to_string(),
            vec![
                ClassificationRule::new("ruby-entity-function-title", 2000)
                    .scope_any(&["entity.name.function.ruby"])
                    .set(Bucket::TitleFunction),
                ClassificationRule::new("ruby-variable-accent", 1980)
                    .scope_any(&["variable.ruby"])
                    .base_in(&[Bucket::VariableMember])
                    .token_kind(TokenKind::Identifier)
                    .set(Bucket::Variable),
            ],
        ),
        (
            "typescript".to_string(),
            vec![
                ClassificationRule::new("ts-support-property-blue", 1950)
                    .scope_any(&["support.variable.property.ts"])
                    .set(Bucket::VariableConst),
            ],
        ),
        (
            "javascript".to_string(),
            vec![
                ClassificationRule::new("js-support-class-blue", 1960)
                    .scope_any(&["support.class."])
                    .set(Bucket::Type),
            ],
        ),
        (
            "go".to_string(),
            vec![
                ClassificationRule::new("go-storage-type-keyword", 1960)
                    .scope_any(&["storage.type.string.go", "storage.type.boolean.go"])
                    .set(Bucket::Keyword),
                ClassificationRule::new("go-format-placeholder-blue", 1940)
                    .scope_any(&["constant.other.placeholder.go"])
                    .set(Bucket::Literal),
            ],
        ),
        (
            "csharp".to_string(),
            vec![
                ClassificationRule::new("csharp-keyword-type-keyword", 1960)
                    .scope_any(&["keyword.type.string.cs"])
                    .set(Bucket::Keyword),
            ],
        ),
        (
            "c".to_string(),
            vec![
                ClassificationRule::new("c-array-bracket-keyword", 1960)
                    .scope_any(&[
                        "storage.modifier.array.bracket.square.c",
                        "storage-modifier-array-bracket-square-c",
                    ])
                    .set(Bucket::Keyword),
                ClassificationRule::new("c-array-bracket-token-keyword", 1955)
                    .base_in(&[Bucket::Type])
                    .token_equals(&["[]"])
                    .set(Bucket::Keyword),
                ClassificationRule::new("c-placeholder-blue", 1950)
                    .scope_any(&["constant.other.placeholder.c"])
                    .set(Bucket::Literal),
            ],
        ),
        (
            "cpp".to_string(),
            vec![
                ClassificationRule::new("cpp-reference-modifier-keyword", 1960)
                    .scope_any(&["storage.modifier.reference.cpp"])
                    .set(Bucket::Keyword),
            ],
        ),
        (
            "python".to_string(),
            vec![
                ClassificationRule::new("python-fstring-conversion-neutral", 1900)
                    .base_in(&[Bucket::String])
                    .scope_any(&["meta.fstring.python"])
                    .token_equals(&["s", "r", "a"])
                    .set(Bucket::Text),
                ClassificationRule::new("python-fstring-identifier-neutral", 1890)
                    .base_in(&[Bucket::String])
                    .scope_any(&["meta.fstring.python"])
                    .token_kind(TokenKind::Identifier)
                    .set(Bucket::Text),
            ],
        ),
        (
            "css".to_string(),
            vec![
                ClassificationRule::new("css-function-type-blue", 1940)
                    .scope_any(&["support.function.calc.css", "support.function.gradient.css"])
                    .set(Bucket::Type),
            ],
        ),
    ]
}
