use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical highlight bucket used by keyword scope mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    Comment,
    MetaShebang,
    TagDelimiter,
    Attribute,
    Tag,
    Keyword,
    TypePrimitive,
    TypeName,
    Type,
    Number,
    Literal,
    String,
    StringUnquoted,
    Namespace,
    TitleFunctionBuiltin,
    TitleFunction,
    TitleClass,
    VariableThis,
    VariableConst,
    VariableMember,
    VariableParameter,
    VariableProperty,
    VariablePlain,
    Variable,
    Punctuation,
    Meta,
    Text,
}

impl Bucket {
    pub const ALL: [Bucket; 27] = [
        Bucket::Comment,
        Bucket::MetaShebang,
        Bucket::TagDelimiter,
        Bucket::Attribute,
        Bucket::Tag,
        Bucket::Keyword,
        Bucket::TypePrimitive,
        Bucket::TypeName,
        Bucket::Type,
        Bucket::Number,
        Bucket::Literal,
        Bucket::String,
        Bucket::StringUnquoted,
        Bucket::Namespace,
        Bucket::TitleFunctionBuiltin,
        Bucket::TitleFunction,
        Bucket::TitleClass,
        Bucket::VariableThis,
        Bucket::VariableConst,
        Bucket::VariableMember,
        Bucket::VariableParameter,
        Bucket::VariableProperty,
        Bucket::VariablePlain,
        Bucket::Variable,
        Bucket::Punctuation,
        Bucket::Meta,
        Bucket::Text,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Comment => "comment",
            Bucket::MetaShebang => "meta-shebang",
            Bucket::TagDelimiter => "tag-delimiter",
            Bucket::Attribute => "attribute",
            Bucket::Tag => "tag",
            Bucket::Keyword => "keyword",
            Bucket::TypePrimitive => "type-primitive",
            Bucket::TypeName => "type-name",
            Bucket::Type => "type",
            Bucket::Number => "number",
            Bucket::Literal => "literal",
            Bucket::String => "string",
            Bucket::StringUnquoted => "string-unquoted",
            Bucket::Namespace => "namespace",
            Bucket::TitleFunctionBuiltin => "title-function-builtin",
            Bucket::TitleFunction => "title-function",
            Bucket::TitleClass => "title-class",
            Bucket::VariableThis => "variable-this",
            Bucket::VariableConst => "variable-const",
            Bucket::VariableMember => "variable-member",
            Bucket::VariableParameter => "variable-parameter",
            Bucket::VariableProperty => "variable-property",
            Bucket::VariablePlain => "variable-plain",
            Bucket::Variable => "variable",
            Bucket::Punctuation => "punctuation",
            Bucket::Meta => "meta",
            Bucket::Text => "text",
        }
    }

    /// Priority used when several scopes in a chain disagree. Higher wins.
    pub fn score(self) -> u16 {
        match self {
            Bucket::Comment => 210,
            Bucket::MetaShebang => 206,
            Bucket::TagDelimiter => 202,
            Bucket::Attribute => 200,
            Bucket::Tag => 198,
            Bucket::Keyword => 194,
            Bucket::TypePrimitive => 192,
            Bucket::TypeName => 190,
            Bucket::Type => 188,
            Bucket::Number => 186,
            Bucket::Literal => 184,
            Bucket::String => 182,
            Bucket::StringUnquoted => 180,
            Bucket::Namespace => 176,
            Bucket::TitleFunctionBuiltin => 174,
            Bucket::TitleFunction => 172,
            Bucket::TitleClass => 170,
            Bucket::VariableThis => 168,
            Bucket::VariableConst => 166,
            Bucket::VariableMember => 164,
            Bucket::VariableParameter => 162,
            Bucket::VariableProperty => 160,
            Bucket::VariablePlain => 158,
            Bucket::Variable => 156,
            Bucket::Punctuation => 140,
            Bucket::Meta => 70,
            Bucket::Text => 10,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown highlight bucket: {0}")]
pub struct UnknownBucket(pub String);

impl FromStr for Bucket {
    type Err = UnknownBucket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bucket::ALL
            .iter()
            .copied()
            .find(|bucket| bucket.as_str() == s)
            .ok_or_else(|| UnknownBucket(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for bucket in Bucket::ALL {
            assert_eq!(bucket.as_str().parse::<Bucket>(), Ok(bucket));
        }
    }

    #[test]
    fn serde_name_matches_display() {
        let json = serde_json::to_string(&Bucket::TitleFunctionBuiltin).unwrap();
        assert_eq!(json, "\"title-function-builtin\"");
    }

    #[test]
    fn comment_outranks_everything_and_text_ranks_last() {
        let max = Bucket::ALL.iter().map(|b| b.score()).max().unwrap();
        let min = Bucket::ALL.iter().map(|b| b.score()).min().unwrap();
        assert_eq!(Bucket::Comment.score(), max);
        assert_eq!(Bucket::Text.score(), min);
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!("keywords".parse::<Bucket>().is_err());
    }
}
