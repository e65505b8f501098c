//! Whole-line highlight ranges: emphasized lines and comment lines.

use super::{TokenEntry, utf16_len};

pub const EMPHASIS_SCOPE: &str = "pre-lines-emphasis";
pub const COMMENT_LINE_SCOPE: &str = "pre-comment-line";

/// 1-based inclusive line span. Open ends extend to the first or last line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn line(n: usize) -> Self {
        Self::new(n, n)
    }
}

fn parse_line_number(raw: &str) -> Result<Option<usize>, ()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<usize>() {
        Ok(0) | Err(_) => Err(()),
        Ok(n) => Ok(Some(n)),
    }
}

/// Parse `"2-3,5,7-"` style emphasis lists. Malformed parts are skipped.
pub fn parse_emphasis(spec: &str) -> Vec<LineRange> {
    spec.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.split_once('-') {
            None => parse_line_number(part).ok().flatten().map(LineRange::line),
            Some((start, end)) => {
                let start = parse_line_number(start).ok()?;
                let end = parse_line_number(end).ok()?;
                (start.is_some() || end.is_some()).then_some(LineRange { start, end })
            }
        })
        .collect()
}

/// Clamp ranges to `1..=max_line`, swapping reversed bounds and dropping
/// ranges that fall entirely outside.
pub fn normalize_emphasis(ranges: &[LineRange], max_line: usize) -> Vec<(usize, usize)> {
    if max_line == 0 {
        return Vec::new();
    }
    ranges
        .iter()
        .filter_map(|range| {
            let mut s = range.start.unwrap_or(1);
            let mut e = range.end.unwrap_or(max_line);
            if s == 0 || e == 0 {
                return None;
            }
            if s > e {
                std::mem::swap(&mut s, &mut e);
            }
            if s > max_line {
                return None;
            }
            Some((s, e.min(max_line)))
        })
        .collect()
}

/// Lines split on `\n` with a trailing empty line dropped, plus each line's
/// UTF-16 `[start, end)` offsets.
pub fn logical_lines(text: &str) -> Vec<(&str, usize, usize)> {
    let mut raw: Vec<&str> = text.split('\n').collect();
    if raw.last() == Some(&"") {
        raw.pop();
    }
    let mut cursor = 0;
    raw.into_iter()
        .map(|line| {
            let len = utf16_len(line);
            let entry = (line, cursor, cursor + len);
            cursor += len + 1;
            entry
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LineFeatures<'a> {
    pub emphasize: &'a [LineRange],
    pub comment_mark: Option<&'a str>,
}

impl LineFeatures<'_> {
    pub fn is_empty(&self) -> bool {
        self.emphasize.is_empty() && self.comment_mark.is_none_or(str::is_empty)
    }
}

/// Entries for emphasized lines and lines starting with the comment marker.
pub fn line_feature_entries(text: &str, features: &LineFeatures<'_>) -> Vec<TokenEntry> {
    let comment_mark = features
        .comment_mark
        .filter(|mark| !mark.is_empty() && text.contains(*mark));
    if features.emphasize.is_empty() && comment_mark.is_none() {
        return Vec::new();
    }

    let lines = logical_lines(text);
    let mut entries = Vec::new();
    for (s, e) in normalize_emphasis(features.emphasize, lines.len()) {
        let start = lines[s - 1].1;
        let end = lines[e - 1].2;
        if end > start {
            entries.push(TokenEntry::new(EMPHASIS_SCOPE, start, end));
        }
    }
    if let Some(mark) = comment_mark {
        for (line, start, end) in &lines {
            if line.trim_start().starts_with(mark) && end > start {
                entries.push(TokenEntry::new(COMMENT_LINE_SCOPE, *start, *end));
            }
        }
    }
    entries
}
