//! An in-memory document implementing the host traits.
//!
//! Good enough to stand in for a browser DOM in tests, benches and the CLI:
//! an element/text tree with attributes, a highlight registry, a style
//! element and recorded observer subscriptions.

use crate::host::{
    CodeBlock, HighlightHost, HostError, NodeId, ObserverConfig, ObserverId, TextNode,
    TextPosition, TextRange, VisibilityHost, WatchId,
};
use pre_highlight_engine::fence::BLOCK_ATTR;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT_KEY: AtomicU64 = AtomicU64::new(1);

static SIMPLE_SELECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([A-Za-z][\w-]*)?(?:\[([\w-]+)(?:="([^"]*)")?\])?$"#)
        .expect("valid selector regex")
});

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        children: Vec<NodeId>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// What an observer was asked to watch.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverRecord {
    pub config: ObserverConfig,
    pub targets: Vec<NodeId>,
    pub connected: bool,
}

#[derive(Debug)]
pub struct MemoryDocument {
    key: u64,
    nodes: Vec<Node>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    highlights_supported: bool,
    observer_supported: bool,
    prefers_dark: Option<bool>,
    highlights: BTreeMap<String, Vec<TextRange>>,
    highlight_writes: usize,
    observers: BTreeMap<ObserverId, ObserverRecord>,
    watches: BTreeSet<WatchId>,
    next_handle: usize,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

impl MemoryDocument {
    /// An empty `<html><head></head><body></body></html>` document with
    /// highlight and observer support and no color-scheme media query.
    pub fn new() -> Self {
        let mut doc = Self {
            key: NEXT_DOCUMENT_KEY.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            highlights_supported: true,
            observer_supported: true,
            prefers_dark: None,
            highlights: BTreeMap::new(),
            highlight_writes: 0,
            observers: BTreeMap::new(),
            watches: BTreeSet::new(),
            next_handle: 1,
        };
        doc.root = doc.push_node(None, NodeKind::element("html"));
        doc.head = doc.append_element(doc.root, "head", &[]);
        doc.body = doc.append_element(doc.root, "body", &[]);
        doc
    }

    pub fn without_highlights(mut self) -> Self {
        self.highlights_supported = false;
        self
    }

    pub fn without_observer(mut self) -> Self {
        self.observer_supported = false;
        self
    }

    pub fn with_prefers_dark(mut self, dark: bool) -> Self {
        self.prefers_dark = Some(dark);
        self
    }

    pub fn set_prefers_dark(&mut self, dark: Option<bool>) {
        self.prefers_dark = dark;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn push_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent, kind });
        if let Some(parent) = parent
            && let Some(NodeKind::Element { children, .. }) =
                self.nodes.get_mut(parent.0).map(|n| &mut n.kind)
        {
            children.push(id);
        }
        id
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut kind = NodeKind::element(tag);
        if let NodeKind::Element { attrs: map, .. } = &mut kind {
            for (name, value) in attrs {
                map.insert(name.to_string(), value.to_string());
            }
        }
        self.push_node(Some(parent), kind)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push_node(Some(parent), NodeKind::Text(text.to_string()))
    }

    /// `<pre data-pre-highlight="id"><code>chunks...</code></pre>`, one text
    /// node per chunk. `None` leaves the binding attribute empty.
    pub fn append_code_block(
        &mut self,
        parent: NodeId,
        block_id: Option<&str>,
        chunks: &[&str],
    ) -> CodeBlock {
        let pre = self.append_element(parent, "pre", &[(BLOCK_ATTR, block_id.unwrap_or(""))]);
        let code = self.append_element(pre, "code", &[]);
        for chunk in chunks {
            self.append_text(code, chunk);
        }
        CodeBlock { pre, code }
    }

    /// `<script type="application/json">` with extra attributes.
    pub fn append_json_script(&mut self, parent: NodeId, attrs: &[(&str, &str)], json: &str) -> NodeId {
        let mut all = vec![("type", "application/json")];
        all.extend_from_slice(attrs);
        let script = self.append_element(parent, "script", &all);
        self.append_text(script, json);
        script
    }

    /// Detach `node` from its parent. Its id is never handed out again.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get_mut(node.0).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(NodeKind::Element { children, .. }) =
            self.nodes.get_mut(parent.0).map(|n| &mut n.kind)
        {
            children.retain(|child| *child != node);
        }
    }

    /// Replace every child of `node` with fresh text nodes.
    pub fn replace_text(&mut self, node: NodeId, chunks: &[&str]) {
        for child in self.children(node) {
            self.remove(child);
        }
        for chunk in chunks {
            self.append_text(node, chunk);
        }
    }

    /// Change a text node's value in place, keeping its id.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(NodeKind::Text(value)) = self.nodes.get_mut(node.0).map(|n| &mut n.kind) {
            *value = text.to_string();
        }
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Element { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    /// `node` and everything under it, in document order.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if current.0 >= self.nodes.len() {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        out
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Element { tag, .. }) => Some(tag),
            _ => None,
        }
    }

    fn attrs(&self, node: NodeId) -> Option<&BTreeMap<String, String>> {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Element { attrs, .. }) => Some(attrs),
            _ => None,
        }
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    fn element_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|node| self.attribute(*node, "id").as_deref() == Some(id))
    }

    pub fn highlight(&self, name: &str) -> Option<&[TextRange]> {
        self.highlights.get(name).map(Vec::as_slice)
    }

    pub fn highlight_names(&self) -> Vec<&str> {
        self.highlights.keys().map(String::as_str).collect()
    }

    /// Number of `set_highlight` calls so far.
    pub fn highlight_writes(&self) -> usize {
        self.highlight_writes
    }

    /// Text covered by `range`, walking text nodes in document order.
    pub fn range_text(&self, range: &TextRange) -> Option<String> {
        let nodes = self.text_nodes(self.root);
        let first = nodes.iter().position(|n| n.id == range.start.node)?;
        let last = nodes.iter().position(|n| n.id == range.end.node)?;
        if last < first {
            return None;
        }
        let mut units = Vec::new();
        for (i, node) in nodes[first..=last].iter().enumerate() {
            let text: Vec<u16> = self.text(node.id)?.encode_utf16().collect();
            let from = if i == 0 { range.start.offset } else { 0 };
            let to = if first + i == last {
                range.end.offset
            } else {
                text.len()
            };
            units.extend_from_slice(text.get(from..to)?);
        }
        Some(String::from_utf16_lossy(&units))
    }

    pub fn style_text(&self, id: &str) -> Option<String> {
        self.element_by_id(self.root, id)
            .map(|node| self.text_content(node))
    }

    pub fn observer(&self, id: ObserverId) -> Option<&ObserverRecord> {
        self.observers.get(&id)
    }

    pub fn color_watch_count(&self) -> usize {
        self.watches.len()
    }

    fn next_handle(&mut self) -> usize {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn matches_simple(&self, node: NodeId, selector: &str) -> bool {
        let Some(caps) = SIMPLE_SELECTOR.captures(selector.trim()) else {
            log::debug!("unsupported selector '{selector}'");
            return false;
        };
        let Some(tag) = self.tag(node) else {
            return false;
        };
        if let Some(want) = caps.get(1)
            && !want.as_str().eq_ignore_ascii_case(tag)
        {
            return false;
        }
        match caps.get(2) {
            Some(attr) => match (self.attribute(node, attr.as_str()), caps.get(3)) {
                (Some(value), Some(want)) => value == want.as_str(),
                (Some(_), None) => true,
                (None, _) => false,
            },
            None => caps.get(1).is_some(),
        }
    }
}

impl NodeKind {
    fn element(tag: &str) -> Self {
        NodeKind::Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }
}

impl HighlightHost for MemoryDocument {
    fn supports_highlights(&self) -> bool {
        self.highlights_supported
    }

    fn document_key(&self) -> u64 {
        self.key
    }

    fn code_blocks(&self, root: NodeId) -> Vec<CodeBlock> {
        let mut blocks = Vec::new();
        for pre in self.descendants(root) {
            if self.tag(pre) != Some("pre") || self.attribute(pre, BLOCK_ATTR).is_none() {
                continue;
            }
            for code in self.children(pre) {
                if matches!(self.tag(code), Some("code" | "samp")) {
                    blocks.push(CodeBlock { pre, code });
                }
            }
        }
        blocks
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.attrs(node)?.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(NodeKind::Element { attrs, .. }) = self.nodes.get_mut(node.0).map(|n| &mut n.kind) {
            attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(NodeKind::Element { attrs, .. }) = self.nodes.get_mut(node.0).map(|n| &mut n.kind) {
            attrs.remove(name);
        }
    }

    fn elements_with_attribute(&self, root: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|node| self.attrs(*node).is_some_and(|attrs| attrs.contains_key(name)))
            .collect()
    }

    fn text_nodes(&self, node: NodeId) -> Vec<TextNode> {
        self.descendants(node)
            .into_iter()
            .filter_map(|id| {
                self.text(id).map(|text| TextNode {
                    id,
                    len: utf16_len(text),
                })
            })
            .collect()
    }

    fn text_content(&self, node: NodeId) -> String {
        self.descendants(node)
            .into_iter()
            .filter_map(|id| self.text(id))
            .collect()
    }

    fn create_range(&mut self, start: TextPosition, end: TextPosition) -> Result<TextRange, HostError> {
        for pos in [start, end] {
            let node = self.nodes.get(pos.node.0).ok_or(HostError::UnknownNode(pos.node))?;
            let NodeKind::Text(text) = &node.kind else {
                return Err(HostError::NotText(pos.node));
            };
            let len = utf16_len(text);
            if pos.offset > len {
                return Err(HostError::OffsetOutOfBounds {
                    node: pos.node,
                    offset: pos.offset,
                    len,
                });
            }
        }
        if start.node == end.node && start.offset > end.offset {
            return Err(HostError::Reversed(start.node));
        }
        Ok(TextRange { start, end })
    }

    fn set_highlight(&mut self, name: &str, ranges: Vec<TextRange>) {
        self.highlight_writes += 1;
        self.highlights.insert(name.to_string(), ranges);
    }

    fn delete_highlight(&mut self, name: &str) {
        self.highlights.remove(name);
    }

    fn ensure_style_element(&mut self, id: &str) -> Option<NodeId> {
        if let Some(existing) = self.element_by_id(self.root, id) {
            return Some(existing);
        }
        Some(self.append_element(self.head, "style", &[("id", id)]))
    }

    fn append_style_text(&mut self, style: NodeId, css: &str) {
        let existing = self
            .children(style)
            .into_iter()
            .find(|child| self.text(*child).is_some());
        match existing {
            Some(node) => {
                if let Some(NodeKind::Text(text)) = self.nodes.get_mut(node.0).map(|n| &mut n.kind) {
                    text.push_str(css);
                }
            }
            None => {
                self.append_text(style, css);
            }
        }
    }

    fn script_text(&self, root: NodeId, id: &str) -> Option<String> {
        self.element_by_id(root, id)
            .map(|node| self.text_content(node))
    }

    fn inline_payload_scripts(&self, root: NodeId, attr: &str) -> Vec<(String, String)> {
        self.descendants(root)
            .into_iter()
            .filter(|node| {
                self.tag(*node) == Some("script")
                    && self.attribute(*node, "type").as_deref() == Some("application/json")
            })
            .filter_map(|node| {
                let id = self.attribute(node, attr)?;
                Some((id, self.text_content(node)))
            })
            .collect()
    }

    fn prefers_dark(&self) -> Option<bool> {
        self.prefers_dark
    }
}

impl VisibilityHost for MemoryDocument {
    fn supports_observer(&self) -> bool {
        self.observer_supported
    }

    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|node| selector.split(',').any(|part| self.matches_simple(*node, part)))
            .collect()
    }

    fn create_observer(&mut self, config: &ObserverConfig) -> Option<ObserverId> {
        if !self.observer_supported {
            return None;
        }
        let id = ObserverId(self.next_handle());
        self.observers.insert(
            id,
            ObserverRecord {
                config: config.clone(),
                targets: Vec::new(),
                connected: true,
            },
        );
        Some(id)
    }

    fn observe(&mut self, observer: ObserverId, target: NodeId) {
        if let Some(record) = self.observers.get_mut(&observer)
            && record.connected
            && !record.targets.contains(&target)
        {
            record.targets.push(target);
        }
    }

    fn disconnect_observer(&mut self, observer: ObserverId) {
        if let Some(record) = self.observers.get_mut(&observer) {
            record.connected = false;
            record.targets.clear();
        }
    }

    fn watch_color_scheme(&mut self) -> Option<WatchId> {
        if self.prefers_dark.is_none() {
            return None;
        }
        let id = WatchId(self.next_handle());
        self.watches.insert(id);
        Some(id)
    }

    fn unwatch_color_scheme(&mut self, watch: WatchId) {
        self.watches.remove(&watch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn code_blocks_need_the_binding_attribute() {
        let mut doc = MemoryDocument::new();
        let body = doc.body();
        let bound = doc.append_code_block(body, Some("hl-1"), &["a"]);
        let plain_pre = doc.append_element(body, "pre", &[]);
        doc.append_element(plain_pre, "code", &[]);
        let samp_pre = doc.append_element(body, "pre", &[(BLOCK_ATTR, "hl-2")]);
        let samp = doc.append_element(samp_pre, "samp", &[]);

        assert_eq!(
            doc.code_blocks(doc.root()),
            vec![
                bound,
                CodeBlock {
                    pre: samp_pre,
                    code: samp
                }
            ]
        );
    }

    #[test]
    fn text_nodes_measure_utf16() {
        let mut doc = MemoryDocument::new();
        let block = doc.append_code_block(doc.body(), Some("b"), &["a😀", "é"]);
        let lens: Vec<usize> = doc.text_nodes(block.code).iter().map(|n| n.len).collect();
        assert_eq!(lens, vec![3, 1]);
        assert_eq!(doc.text_content(block.code), "a😀é");
    }

    #[test]
    fn ranges_are_validated_and_read_back() {
        let mut doc = MemoryDocument::new();
        let block = doc.append_code_block(doc.body(), Some("b"), &["const", " x"]);
        let nodes = doc.text_nodes(block.code);
        let range = doc
            .create_range(
                TextPosition {
                    node: nodes[0].id,
                    offset: 2,
                },
                TextPosition {
                    node: nodes[1].id,
                    offset: 2,
                },
            )
            .unwrap();
        assert_eq!(doc.range_text(&range).as_deref(), Some("nst x"));

        let past_end = TextPosition {
            node: nodes[1].id,
            offset: 9,
        };
        assert!(matches!(
            doc.create_range(past_end, past_end),
            Err(HostError::OffsetOutOfBounds { offset: 9, len: 2, .. })
        ));
        assert!(matches!(
            doc.create_range(
                TextPosition {
                    node: block.code,
                    offset: 0
                },
                past_end
            ),
            Err(HostError::NotText(_))
        ));
    }

    #[test]
    fn replaced_text_gets_new_ids() {
        let mut doc = MemoryDocument::new();
        let block = doc.append_code_block(doc.body(), Some("b"), &["abc"]);
        let before = doc.text_nodes(block.code);
        doc.replace_text(block.code, &["abc"]);
        let after = doc.text_nodes(block.code);
        assert_ne!(before[0].id, after[0].id);
        assert_eq!(doc.text_content(block.code), "abc");
    }

    #[test]
    fn style_element_is_created_once() {
        let mut doc = MemoryDocument::new();
        let first = doc.ensure_style_element("s").unwrap();
        doc.append_style_text(first, "a{}");
        let second = doc.ensure_style_element("s").unwrap();
        doc.append_style_text(second, "b{}");
        assert_eq!(first, second);
        assert_eq!(doc.style_text("s").as_deref(), Some("a{}b{}"));
    }

    #[test]
    fn selector_lists_match_tag_and_attribute() {
        let mut doc = MemoryDocument::new();
        let body = doc.body();
        let bound = doc.append_code_block(body, Some("hl-1"), &["x"]);
        doc.append_element(body, "pre", &[]);
        let div = doc.append_element(body, "div", &[("data-x", "1")]);

        assert_eq!(
            doc.query_selector_all(body, "pre[data-pre-highlight]"),
            vec![bound.pre]
        );
        assert_eq!(
            doc.query_selector_all(body, "pre[data-pre-highlight], [data-x=\"1\"]"),
            vec![bound.pre, div]
        );
        assert!(doc.query_selector_all(body, "pre > code").is_empty());
    }

    #[test]
    fn inline_scripts_are_found_by_attribute() {
        let mut doc = MemoryDocument::new();
        let body = doc.body();
        doc.append_json_script(body, &[(BLOCK_ATTR, "hl-1")], "{}");
        doc.append_json_script(body, &[("id", "other")], "[]");
        assert_eq!(
            doc.inline_payload_scripts(body, BLOCK_ATTR),
            vec![("hl-1".to_string(), "{}".to_string())]
        );
        assert_eq!(doc.script_text(body, "other").as_deref(), Some("[]"));
    }
}
