use crate::host::{HighlightHost, NodeId, TextPosition};

/// A text node's span within its block, in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSegment {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

/// Lay the text nodes under `node` end to end.
pub fn collect_segments<H: HighlightHost + ?Sized>(host: &H, node: NodeId) -> Vec<TextSegment> {
    let mut cursor = 0;
    host.text_nodes(node)
        .into_iter()
        .map(|text| {
            let segment = TextSegment {
                node: text.id,
                start: cursor,
                end: cursor + text.len,
            };
            cursor = segment.end;
            segment
        })
        .collect()
}

/// Total text length covered by `segments`.
pub fn segments_len(segments: &[TextSegment]) -> usize {
    segments.last().map_or(0, |seg| seg.end)
}

/// Binary search for the node holding `offset`.
///
/// An offset on a node boundary may land on either neighbour; both name the
/// same point in the text.
pub fn find_text_position(segments: &[TextSegment], offset: i64) -> Option<TextPosition> {
    let offset = usize::try_from(offset).ok()?;
    let (mut lo, mut hi) = (0usize, segments.len());
    while lo < hi {
        let mid = (lo + hi) / 2;
        let seg = segments[mid];
        if offset < seg.start {
            hi = mid;
        } else if offset > seg.end {
            lo = mid + 1;
        } else {
            return Some(TextPosition {
                node: seg.node,
                offset: offset - seg.start,
            });
        }
    }
    let last = segments.last()?;
    (offset == last.end).then(|| TextPosition {
        node: last.node,
        offset: last.end - last.start,
    })
}

/// Resolves offsets against one block's segments.
///
/// Payload ranges mostly arrive in ascending order, so a forward scan from
/// the last hit usually finds the node without searching.
#[derive(Debug)]
pub struct SegmentResolver<'a> {
    segments: &'a [TextSegment],
    hint: usize,
    last_offset: Option<usize>,
}

impl<'a> SegmentResolver<'a> {
    pub fn new(segments: &'a [TextSegment]) -> Self {
        Self {
            segments,
            hint: 0,
            last_offset: None,
        }
    }

    pub fn resolve(&mut self, offset: i64) -> Option<TextPosition> {
        let Ok(at) = usize::try_from(offset) else {
            return None;
        };
        if self.segments.is_empty() {
            return None;
        }
        if self.last_offset.is_none_or(|last| at >= last) {
            for (i, seg) in self.segments.iter().enumerate().skip(self.hint) {
                if at < seg.start {
                    break;
                }
                if at <= seg.end {
                    self.hint = i;
                    self.last_offset = Some(at);
                    return Some(TextPosition {
                        node: seg.node,
                        offset: at - seg.start,
                    });
                }
            }
        }
        let pos = find_text_position(self.segments, offset);
        if pos.is_some() {
            self.last_offset = Some(at);
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn segments() -> Vec<TextSegment> {
        [(1, 0, 3), (2, 3, 3), (3, 3, 8)]
            .into_iter()
            .map(|(node, start, end)| TextSegment {
                node: NodeId(node),
                start,
                end,
            })
            .collect()
    }

    fn pos(node: usize, offset: usize) -> Option<TextPosition> {
        Some(TextPosition {
            node: NodeId(node),
            offset,
        })
    }

    #[rstest]
    #[case(0, pos(1, 0))]
    #[case(2, pos(1, 2))]
    #[case(3, pos(2, 0))]
    #[case(5, pos(3, 2))]
    #[case(8, pos(3, 5))]
    #[case(9, None)]
    #[case(-1, None)]
    fn binary_search_positions(#[case] offset: i64, #[case] expected: Option<TextPosition>) {
        assert_eq!(find_text_position(&segments(), offset), expected);
    }

    #[test]
    fn resolver_lands_on_the_same_text_offset_in_any_order() {
        let segs = segments();
        let absolute = |pos: TextPosition| {
            segs.iter()
                .find(|seg| seg.node == pos.node)
                .map(|seg| seg.start + pos.offset)
        };
        let mut resolver = SegmentResolver::new(&segs);
        for offset in [0, 2, 4, 8, 1, 6, 3, 9, -2, 5] {
            let resolved = resolver.resolve(offset);
            let searched = find_text_position(&segs, offset);
            assert_eq!(resolved.is_some(), searched.is_some(), "offset {offset}");
            if let Some(pos) = resolved {
                assert_eq!(absolute(pos), Some(offset as usize), "offset {offset}");
            }
        }
    }

    #[test]
    fn empty_block_resolves_nothing() {
        assert_eq!(SegmentResolver::new(&[]).resolve(0), None);
        assert_eq!(find_text_position(&[], 0), None);
    }
}
