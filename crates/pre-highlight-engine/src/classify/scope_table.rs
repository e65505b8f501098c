//! Substring table mapping one TextMate-style scope name to a bucket.

use super::bucket::Bucket;
use std::cell::RefCell;
use std::collections::HashMap;

/// Entries held before the memo is dropped wholesale.
pub const CACHE_CEILING: usize = 8192;

/// Classify a single lowercase scope name.
///
/// Order matters: the first matching family wins, so `comment` beats anything
/// else mentioned in the same scope.
pub fn classify_scope(s: &str) -> Bucket {
    if s.is_empty() {
        return Bucket::Text;
    }
    let has = |needle: &str| s.contains(needle);

    if has("comment") {
        return Bucket::Comment;
    }
    if has("meta.shebang") {
        return Bucket::MetaShebang;
    }
    if has("punctuation.definition.tag.begin")
        || has("punctuation.definition.tag.end")
        || has("punctuation.separator.key-value.html")
    {
        return Bucket::TagDelimiter;
    }
    if has("entity.other.attribute-name") || has("attribute-name") {
        return Bucket::Attribute;
    }
    if has("entity.name.tag") {
        return Bucket::Tag;
    }
    if has("string.unquoted") {
        return Bucket::StringUnquoted;
    }
    if has("regexp") || has("regex") || has("string") || has("punctuation.definition.string") {
        return Bucket::String;
    }
    if has("constant.other.color") || has("support.constant.property-value") {
        return Bucket::Number;
    }
    if has("constant.numeric") || has("number") {
        return Bucket::Number;
    }
    if has("constant.language")
        || has("boolean")
        || has("null")
        || has("undefined")
        || has("none")
    {
        return Bucket::Literal;
    }
    if has("entity.name.scope-resolution") || has("entity.name.namespace") {
        return Bucket::Namespace;
    }
    if has("storage.type.function.arrow") || has("keyword.operator") {
        return Bucket::Keyword;
    }
    if has("variable.language.this") {
        return Bucket::VariableThis;
    }
    if has("constant.other.php")
        || has("variable.other.constant")
        || has("variable.other.enummember")
    {
        return Bucket::VariableConst;
    }
    if has("variable.object.property")
        || has("variable.other.property")
        || has("variable.other.member")
        || has("variable.object.c")
        || has("variable.ruby")
    {
        return Bucket::VariableMember;
    }
    if has("variable.parameter") || has("entity.name.variable.parameter") {
        return Bucket::VariableParameter;
    }
    if has("entity.name.variable.local")
        || has("variable.other.readwrite")
        || has("variable.other.normal")
        || has("variable.other.php")
        || (has("variable.other.")
            && !has("variable.other.property")
            && !has("variable.other.member"))
    {
        return Bucket::VariablePlain;
    }
    if has("support.function.builtin")
        || has("support.function.kernel")
        || has("support.function.construct")
    {
        return Bucket::TitleFunctionBuiltin;
    }
    if has("entity.name.function.macro") {
        return Bucket::TitleFunction;
    }
    if has("meta.function") && !has("entity.name.function") && !has("support.function") {
        return Bucket::Meta;
    }
    if has("entity.name.function") || has("support.function") {
        return Bucket::TitleFunction;
    }
    if has("entity.name.class") || has("entity.name.type.class") {
        return Bucket::TitleClass;
    }
    if has("storage.type.built-in.primitive") {
        return Bucket::TypePrimitive;
    }
    if has("entity.name.type.namespace") || has("entity.name.type") || has("support.class") {
        return Bucket::TypeName;
    }
    if has("support.type") || has("storage.modifier") || has("keyword.type") {
        return Bucket::Type;
    }
    if has("storage")
        || has("keyword")
        || has("operator")
        || has("control")
        || has("modifier")
    {
        return Bucket::Keyword;
    }
    if has("variable") {
        return Bucket::Variable;
    }
    if has("punctuation") {
        return Bucket::Punctuation;
    }
    if !has("source.") && has("meta") {
        return Bucket::Meta;
    }
    Bucket::Text
}

/// HCL and Terraform grammars use their own naming; this table is consulted
/// before the general one and its answer is final.
pub fn classify_hcl(lower_scopes: &[String]) -> Option<Bucket> {
    let any = |patterns: &[&str]| scopes_contain_any(lower_scopes, patterns);

    if lower_scopes.is_empty() {
        return None;
    }
    if any(&["entity.name.type.hcl", "entity-name-type-hcl"]) {
        return Some(Bucket::TitleClass);
    }
    if any(&["variable.other.enummember.hcl", "variable-other-enummember-hcl"]) {
        return Some(Bucket::VariableConst);
    }
    if any(&["variable.declaration.hcl", "variable-declaration-hcl"]) {
        return Some(Bucket::VariableParameter);
    }
    if any(&["variable.other.readwrite.hcl", "variable-other-readwrite-hcl"]) {
        return Some(Bucket::VariablePlain);
    }
    if any(&["storage-type-hcl", "keyword-operator-assignment-hcl"]) {
        return Some(Bucket::Keyword);
    }
    if any(&["constant-numeric", "number"]) {
        return Some(Bucket::Number);
    }
    if any(&["string"]) {
        return Some(Bucket::String);
    }
    if any(&["punctuation"]) {
        return Some(Bucket::Punctuation);
    }
    if any(&["meta-block-hcl"]) {
        return Some(Bucket::Text);
    }
    None
}

/// Object keys in JSON and YAML documents.
pub fn is_json_yaml_property_name(lower_scopes: &[String]) -> bool {
    lower_scopes.iter().any(|s| {
        (s.contains("property-name") || s.contains("dictionary-key"))
            && (s.contains(".json")
                || s.contains("-json")
                || s.contains(".yaml")
                || s.contains("-yaml"))
    })
}

pub fn scopes_contain_any(lower_scopes: &[String], patterns: &[&str]) -> bool {
    lower_scopes
        .iter()
        .filter(|s| !s.is_empty())
        .any(|s| patterns.iter().any(|p| s.contains(p)))
}

/// Bounded memo in front of [`classify_scope`].
#[derive(Debug, Default)]
pub struct ScopeBucketCache {
    entries: RefCell<HashMap<String, Bucket>>,
}

impl ScopeBucketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&self, lower_scope: &str) -> Bucket {
        if let Some(bucket) = self.entries.borrow().get(lower_scope) {
            return *bucket;
        }
        let bucket = classify_scope(lower_scope);
        let mut entries = self.entries.borrow_mut();
        entries.insert(lower_scope.to_string(), bucket);
        if entries.len() > CACHE_CEILING {
            entries.clear();
        }
        bucket
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}
