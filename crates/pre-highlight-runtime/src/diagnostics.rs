use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Why the runtime skipped a pass, a block or a single range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    ApiUnsupported,
    Unchanged,
    MissingBlockId,
    MissingPayload,
    UnsupportedVersion,
    EmptyPayload,
    TextLengthMismatch,
    InvalidTuple,
    InvalidRange,
    InvalidScopeIndex,
    MissingScope,
    RangeOutOfBounds,
    RangeCreateFailed,
    NoValidRanges,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::ApiUnsupported => "api-unsupported",
            SkipReason::Unchanged => "unchanged",
            SkipReason::MissingBlockId => "missing-block-id",
            SkipReason::MissingPayload => "missing-payload",
            SkipReason::UnsupportedVersion => "unsupported-version",
            SkipReason::EmptyPayload => "empty-payload",
            SkipReason::TextLengthMismatch => "text-length-mismatch",
            SkipReason::InvalidTuple => "invalid-tuple",
            SkipReason::InvalidRange => "invalid-range",
            SkipReason::InvalidScopeIndex => "invalid-scope-index",
            SkipReason::MissingScope => "missing-scope",
            SkipReason::RangeOutOfBounds => "range-out-of-bounds",
            SkipReason::RangeCreateFailed => "range-create-failed",
            SkipReason::NoValidRanges => "no-valid-ranges",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    RuntimeSkip,
    BlockSkip,
    RangeSkip,
}

/// A skipped item reported to the diagnostic hook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    #[serde(rename = "type")]
    pub kind: DiagnosticKind,
    pub reason: SkipReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuple_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_text_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_text_length: Option<usize>,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, reason: SkipReason) -> Self {
        Self {
            kind,
            reason,
            block_id: None,
            tuple_index: None,
            scope_index: None,
            start: None,
            end: None,
            version: None,
            payload_text_length: None,
            actual_text_length: None,
        }
    }

    pub fn runtime(reason: SkipReason) -> Self {
        Self::new(DiagnosticKind::RuntimeSkip, reason)
    }

    pub fn block(block_id: Option<&str>, reason: SkipReason) -> Self {
        Self {
            block_id: block_id.map(str::to_string),
            ..Self::new(DiagnosticKind::BlockSkip, reason)
        }
    }

    pub fn range(block_id: &str, tuple_index: usize, reason: SkipReason) -> Self {
        Self {
            block_id: Some(block_id.to_string()),
            tuple_index: Some(tuple_index),
            ..Self::new(DiagnosticKind::RangeSkip, reason)
        }
    }
}

/// Result of one apply pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub applied_blocks: usize,
    pub applied_ranges: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
}

impl ApplyOutcome {
    pub fn unsupported() -> Self {
        Self {
            reason: Some(SkipReason::ApiUnsupported),
            ..Self::default()
        }
    }

    pub fn unchanged() -> Self {
        Self {
            skipped: true,
            reason: Some(SkipReason::Unchanged),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    /// Distinct highlight names removed.
    pub cleared: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_serialize_sparse() {
        let diag = Diagnostic {
            start: Some(4),
            end: Some(90),
            ..Diagnostic::range("hl-1", 2, SkipReason::RangeOutOfBounds)
        };
        insta::assert_snapshot!(
            serde_json::to_string(&diag).unwrap(),
            @r#"{"type":"range-skip","reason":"range-out-of-bounds","blockId":"hl-1","tupleIndex":2,"start":4,"end":90}"#
        );
        insta::assert_snapshot!(
            serde_json::to_string(&ApplyOutcome::unchanged()).unwrap(),
            @r#"{"appliedBlocks":0,"appliedRanges":0,"skipped":true,"reason":"unchanged"}"#
        );
    }
}
