//! Bucket refinements applied after scope scoring.
//!
//! These encode grammar quirks observed across real highlighter output. The
//! order of the checks is load-bearing; tests pin the interesting paths.

use super::bucket::Bucket;
use super::context::TokenContext;
use super::lexical::{
    SHELL_TEST_OPERATORS, classify_token, is_function_like, is_hcl_lang, is_identifier,
    is_punctuation, is_shell_lang, is_shell_option,
};

const SHELL_FUNCTION: &[&str] = &["entity.name.function.shell", "entity.name.command.shell"];
const SHELL_POSITIONAL: &[&str] = &[
    "variable.parameter.positional.shell",
    "variable.language.special.shell",
];
const CONSTANT_SCOPES: &[&str] = &[
    "variable.other.constant",
    "constant.other.php",
    "variable.other.enummember",
];
const MEMBER_SCOPES: &[&str] = &[
    "variable.object.property",
    "variable.other.property",
    "variable.other.member",
    "variable.object.c",
    "variable.ruby",
];

fn shell_test_operator(ctx: &TokenContext<'_>) -> Bucket {
    if SHELL_TEST_OPERATORS.contains(&ctx.lower.as_str()) {
        Bucket::Keyword
    } else {
        Bucket::Literal
    }
}

/// Shell refinements shared by quoted and unquoted strings.
fn refine_shell_string(ctx: &TokenContext<'_>) -> Option<Bucket> {
    if !is_shell_lang(ctx.lang_key) {
        return None;
    }
    if ctx.any(SHELL_FUNCTION) {
        return Some(Bucket::TitleFunction);
    }
    if ctx.any(SHELL_POSITIONAL)
        || is_shell_option(ctx.trimmed)
        || ctx.trimmed.starts_with("${")
        || ctx.trimmed == "}"
    {
        return Some(Bucket::Literal);
    }
    if ctx.has("constant.other.option") {
        return Some(shell_test_operator(ctx));
    }
    None
}

fn refine_string(ctx: &TokenContext<'_>) -> Option<Bucket> {
    if let Some(bucket) = refine_shell_string(ctx) {
        return Some(bucket);
    }
    if ctx.lang_key == "python" && ctx.has("storage.type.string.python") {
        return Some(Bucket::Keyword);
    }
    if ctx.lang_key == "go" && ctx.has("entity.name.import.go") {
        return Some(Bucket::TypeName);
    }
    if ctx.has("keyword.operator.string") {
        return Some(Bucket::Keyword);
    }
    if ctx.any(&[
        "constant.character.escape",
        "constant.character.format.placeholder",
    ]) {
        return Some(Bucket::Number);
    }
    if ctx.any(&["variable.other.", "variable.ruby", "meta.attribute.python"]) {
        return Some(Bucket::VariablePlain);
    }
    None
}

fn refine_unquoted(ctx: &TokenContext<'_>) -> Bucket {
    if let Some(bucket) = refine_shell_string(ctx) {
        return bucket;
    }
    if ctx.has("entity.name.tag.yaml") {
        return Bucket::Tag;
    }
    Bucket::String
}

fn refine_title_function(ctx: &TokenContext<'_>) -> Option<Bucket> {
    if ctx.lang_key == "css" && ctx.has("support.function.misc.css") {
        return Some(Bucket::Type);
    }
    if ctx.any(&[
        "support.function.builtin",
        "support.function.kernel",
        "support.function.construct",
    ]) {
        return Some(Bucket::TitleFunctionBuiltin);
    }
    if ctx.any(&["storage.type.function.arrow", "keyword.operator"]) {
        return Some(Bucket::Keyword);
    }
    if ctx.any(&[
        "punctuation.section.function",
        "punctuation.definition.arguments",
        "meta.function-call.arguments",
    ]) {
        return Some(Bucket::Punctuation);
    }
    if ctx.has("meta.function") && !ctx.any(&["entity.name.function", "support.function"]) {
        return Some(Bucket::Meta);
    }
    if ctx.has("punctuation.accessor") {
        return Some(Bucket::Text);
    }
    if !is_function_like(ctx.trimmed) {
        if is_punctuation(ctx.trimmed) {
            return Some(Bucket::Punctuation);
        }
        if ctx
            .trimmed
            .contains(['.', '[', ']', '(', ')', '{', '}', ':'])
        {
            return Some(Bucket::Text);
        }
    }
    None
}

fn refine_meta(ctx: &TokenContext<'_>) -> Option<Bucket> {
    if ctx.trimmed.starts_with("#!") || ctx.has("meta.shebang") {
        return Some(Bucket::MetaShebang);
    }
    if ctx.any(&["entity.name.scope-resolution", "entity.name.namespace"]) {
        return Some(Bucket::Namespace);
    }
    if ctx.any(&["source.sql", "source.python", "source.ruby", "source.rust"]) {
        return Some(Bucket::Text);
    }
    if ctx.any(&[
        "punctuation.terminator.statement",
        "punctuation.section.block",
        "punctuation.brackets.curly",
        "meta.body.function.definition",
    ]) {
        return Some(Bucket::Punctuation);
    }
    None
}

fn refine_variable(ctx: &TokenContext<'_>) -> Option<Bucket> {
    if ctx.has("meta.type.annotation") && is_punctuation(ctx.trimmed) {
        return Some(Bucket::Punctuation);
    }
    if ctx.has("variable.language.this") {
        return Some(Bucket::VariableThis);
    }
    if ctx.any(CONSTANT_SCOPES) {
        return Some(Bucket::VariableConst);
    }
    if ctx.any(MEMBER_SCOPES) {
        return Some(Bucket::VariableMember);
    }
    if !ctx.any(&["variable.", "entity.name.variable"]) && ctx.has("source.") {
        return Some(Bucket::Text);
    }
    if ctx.any(&[
        "variable.other.readwrite",
        "variable.other.normal",
        "variable.other.php",
        "entity.name.variable.local",
    ]) {
        return Some(Bucket::VariablePlain);
    }
    None
}

fn refine_variable_plain(ctx: &TokenContext<'_>) -> Option<Bucket> {
    if ctx.any(CONSTANT_SCOPES) {
        return Some(Bucket::VariableConst);
    }
    if ctx.has("entity.name.variable.local.cs") {
        return Some(Bucket::TypeName);
    }
    if ctx.any(&["source.sql", "source.python", "source.ruby"]) {
        return Some(Bucket::Text);
    }
    if !is_identifier(ctx.trimmed) && ctx.has("punctuation.") {
        return Some(Bucket::Punctuation);
    }
    None
}

fn refine_variable_member(ctx: &TokenContext<'_>) -> Option<Bucket> {
    if ctx.any(&[
        "variable.object.property.ts",
        "variable-object-property-ts",
        "variable.object.property.js",
        "variable-object-property-js",
    ]) {
        return Some(Bucket::VariableProperty);
    }
    if ctx.has("variable.object.c") {
        return Some(Bucket::VariableParameter);
    }
    None
}

fn refine_variable_parameter(ctx: &TokenContext<'_>) -> Option<Bucket> {
    if ctx.lang_key == "csharp" && ctx.has("entity.name.variable.parameter.cs") {
        return Some(Bucket::TypeName);
    }
    if ctx.any(CONSTANT_SCOPES) {
        return Some(Bucket::VariableConst);
    }
    if ctx.any(MEMBER_SCOPES) {
        return Some(Bucket::VariableMember);
    }
    if ctx.any(&[
        "variable.other.readwrite.hcl",
        "variable.other.normal.shell",
        "meta.block.hcl",
    ]) {
        return Some(Bucket::VariablePlain);
    }
    if ctx.any(&[
        "storage.type.built-in.primitive",
        "keyword.operator.type.annotation",
        "keyword.operator.type",
    ]) {
        return Some(Bucket::Keyword);
    }
    if ctx.any(&["entity.name.type", "support.type"]) {
        return Some(Bucket::TypeName);
    }
    if !is_identifier(ctx.trimmed) {
        return Some(Bucket::Punctuation);
    }
    None
}

/// Run the refinement chain on a scored bucket.
pub fn apply_post_rules(bucket: Bucket, ctx: &TokenContext<'_>) -> Bucket {
    let trimmed = ctx.trimmed;
    if trimmed.is_empty() {
        return Bucket::Text;
    }

    if is_shell_lang(ctx.lang_key) && is_shell_option(trimmed) {
        return shell_test_operator(ctx);
    }
    if is_hcl_lang(ctx.lang_key) && trimmed == "=" {
        return Bucket::Keyword;
    }
    if bucket == Bucket::Comment && trimmed.starts_with("#!") {
        return Bucket::MetaShebang;
    }

    let refined = match bucket {
        Bucket::String => refine_string(ctx),
        Bucket::StringUnquoted => Some(refine_unquoted(ctx)),
        Bucket::TitleFunction => refine_title_function(ctx),
        Bucket::TitleFunctionBuiltin if ctx.has("entity.name.function.macro") => {
            Some(Bucket::TitleFunction)
        }
        Bucket::Type if ctx.lang_key == "csharp" && ctx.has("keyword.type.") => {
            Some(Bucket::Keyword)
        }
        Bucket::Type if ctx.lang_key == "rust" && ctx.has("entity.name.type.numeric.rust") => {
            Some(Bucket::TypeName)
        }
        Bucket::TypeName if ctx.lang_key == "php" && ctx.has("support.class.php") => {
            Some(Bucket::Type)
        }
        Bucket::TypeName if ctx.lang_key == "ruby" && ctx.has("support.class.ruby") => {
            Some(Bucket::Type)
        }
        Bucket::Meta => refine_meta(ctx),
        Bucket::Variable => refine_variable(ctx),
        Bucket::VariablePlain => refine_variable_plain(ctx),
        Bucket::VariableMember => refine_variable_member(ctx),
        Bucket::VariableParameter => refine_variable_parameter(ctx),
        Bucket::VariableProperty
            if ctx.any(&["variable.object.property", "variable.other.property"]) =>
        {
            Some(Bucket::VariableParameter)
        }
        Bucket::Keyword
            if ctx.lang_key == "php" && ctx.has("support.function.construct.output.php") =>
        {
            Some(Bucket::TitleFunctionBuiltin)
        }
        Bucket::Keyword if ctx.has("variable.language.this") => Some(Bucket::VariableThis),
        Bucket::Literal if ctx.lang_key == "sql" => Some(Bucket::Text),
        _ => None,
    };
    if let Some(refined) = refined {
        return refined;
    }

    if bucket == Bucket::Text {
        if let Some(lexical) = classify_token(ctx.content, ctx.lang_key) {
            return lexical;
        }
        if is_identifier(trimmed) {
            return Bucket::VariablePlain;
        }
    }
    if !is_identifier(trimmed)
        && matches!(bucket, Bucket::Text | Bucket::Meta)
        && let Some(lexical) = classify_token(ctx.content, ctx.lang_key)
    {
        return lexical;
    }
    bucket
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn run(bucket: Bucket, lang: &str, scopes: &[&str], token: &str) -> Bucket {
        let scopes: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
        let ctx = TokenContext::new(lang, &scopes, token);
        apply_post_rules(bucket, &ctx)
    }

    #[rstest]
    #[case("-eq", Bucket::Keyword)]
    #[case("-rf", Bucket::Literal)]
    fn shell_options_split_into_tests_and_flags(#[case] token: &str, #[case] expected: Bucket) {
        assert_eq!(run(Bucket::Text, "bash", &["source.shell"], token), expected);
    }

    #[test]
    fn shebang_comment_becomes_meta_shebang() {
        let got = run(Bucket::Comment, "bash", &["comment.line.shebang"], "#!/bin/bash");
        assert_eq!(got, Bucket::MetaShebang);
    }

    #[test]
    fn hcl_assignment_is_keyword() {
        assert_eq!(run(Bucket::Punctuation, "hcl", &[], "="), Bucket::Keyword);
    }

    #[test]
    fn string_escape_reads_as_number() {
        let got = run(
            Bucket::String,
            "javascript",
            &["constant.character.escape.js", "string.quoted.double.js"],
            "\\n",
        );
        assert_eq!(got, Bucket::Number);
    }

    #[test]
    fn unquoted_string_falls_back_to_string() {
        let got = run(Bucket::StringUnquoted, "yaml", &["string.unquoted.plain.out.yaml"], "abc");
        assert_eq!(got, Bucket::String);
    }

    #[test]
    fn title_function_with_accessor_is_neutral() {
        let got = run(
            Bucket::TitleFunction,
            "javascript",
            &["entity.name.function.js", "punctuation.accessor.js"],
            ".",
        );
        assert_eq!(got, Bucket::Text);
    }

    #[test]
    fn member_access_in_ts_is_property() {
        let got = run(
            Bucket::VariableMember,
            "typescript",
            &["variable.object.property.ts"],
            "length",
        );
        assert_eq!(got, Bucket::VariableProperty);
    }

    #[test]
    fn bare_identifier_in_text_is_plain_variable() {
        assert_eq!(run(Bucket::Text, "rust", &["source.rust"], "value"), Bucket::VariablePlain);
    }

    #[test]
    fn sql_literals_are_neutral() {
        assert_eq!(run(Bucket::Literal, "sql", &["source.sql"], "true"), Bucket::Text);
    }

    #[test]
    fn meta_punctuation_falls_back_to_lexical() {
        assert_eq!(run(Bucket::Meta, "javascript", &["meta.block.js"], "{"), Bucket::Punctuation);
    }

    #[test]
    fn whitespace_is_always_text() {
        assert_eq!(run(Bucket::Keyword, "rust", &[], "  "), Bucket::Text);
    }
}
