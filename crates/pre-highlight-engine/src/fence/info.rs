use crate::payload::{LineRange, parse_emphasis};
use regex::Regex;
use std::sync::LazyLock;

static INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^{\s]*)(?:\s*\{(.*)\})?").expect("valid fence info regex")
});

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w.:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s}]+))"#)
        .expect("valid fence attribute regex")
});

/// What a fence's info string says about the block.
///
/// Only the language word and the `{...}` attributes the payload cares
/// about are kept: `emphasize-lines` (alias `em-lines`) and `comment-line`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FenceInfo {
    pub lang: String,
    pub emphasize: Vec<LineRange>,
    pub comment_mark: Option<String>,
}

impl FenceInfo {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            ..Self::default()
        }
    }

    pub fn parse(info: &str) -> Self {
        let info = info.trim();
        let Some(caps) = INFO.captures(info) else {
            return Self::default();
        };
        let mut fence = Self::new(caps.get(1).map_or("", |m| m.as_str()));
        let Some(attrs) = caps.get(2) else {
            return fence;
        };
        for attr in ATTR.captures_iter(attrs.as_str()) {
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map_or("", |m| m.as_str());
            match &attr[1] {
                "emphasize-lines" | "em-lines" => fence.emphasize = parse_emphasis(value),
                "comment-line" => {
                    fence.comment_mark = (!value.is_empty()).then(|| value.to_string())
                }
                _ => {}
            }
        }
        fence
    }
}
