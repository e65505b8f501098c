//! The document the runtime paints into.
//!
//! [`HighlightHost`] covers everything an apply pass reads and writes: code
//! blocks, their text nodes, block attributes, payload scripts, the named
//! highlight registry and the style element. [`VisibilityHost`] adds the
//! visibility observer and color-scheme watch used by lazy activation.

use serde::Serialize;
use std::fmt;

/// Stable identity of a node within one document. Ids are never reused, so
/// a replaced node always gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A point inside a text node, in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextPosition {
    pub node: NodeId,
    pub offset: usize,
}

/// A static range between two text positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

/// One text node and its length in UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextNode {
    pub id: NodeId,
    pub len: usize,
}

/// A `<code>` or `<samp>` element directly under a `<pre>` that carries a
/// block binding attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBlock {
    pub pre: NodeId,
    pub code: NodeId,
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    #[error("Node {0} is not a text node")]
    NotText(NodeId),
    #[error("Offset {offset} is past the end of node {node} (length {len})")]
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        len: usize,
    },
    #[error("Range ends before it starts in node {0}")]
    Reversed(NodeId),
}

/// Read and write access to a rendered document.
pub trait HighlightHost {
    /// Whether named range highlights can be registered at all.
    fn supports_highlights(&self) -> bool;

    /// Distinguishes documents sharing one runtime.
    fn document_key(&self) -> u64;

    /// Bound code blocks under `root`, in document order.
    fn code_blocks(&self, root: NodeId) -> Vec<CodeBlock>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    /// Elements under `root` (inclusive) carrying attribute `name`.
    fn elements_with_attribute(&self, root: NodeId, name: &str) -> Vec<NodeId>;

    /// Text nodes under `node`, in document order.
    fn text_nodes(&self, node: NodeId) -> Vec<TextNode>;

    fn text_content(&self, node: NodeId) -> String;

    fn create_range(&mut self, start: TextPosition, end: TextPosition) -> Result<TextRange, HostError>;

    /// Register `ranges` under `name`, replacing any previous registration.
    fn set_highlight(&mut self, name: &str, ranges: Vec<TextRange>);

    fn delete_highlight(&mut self, name: &str);

    /// The document's singleton style element with `id`, created on first
    /// use. `None` when the document has nowhere to put it.
    fn ensure_style_element(&mut self, id: &str) -> Option<NodeId>;

    fn append_style_text(&mut self, style: NodeId, css: &str);

    /// Text of the element with `id` under `root`.
    fn script_text(&self, root: NodeId, id: &str) -> Option<String>;

    /// `(block id, text)` of every `<script type="application/json">` under
    /// `root` carrying attribute `attr`.
    fn inline_payload_scripts(&self, root: NodeId, attr: &str) -> Vec<(String, String)>;

    /// The `(prefers-color-scheme: dark)` media query, when the host has one.
    fn prefers_dark(&self) -> Option<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct ObserverConfig {
    pub root_margin: String,
    pub threshold: f64,
}

/// One visibility change reported by the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

impl IntersectionEntry {
    pub fn visible(target: NodeId) -> Self {
        Self {
            target,
            is_intersecting: true,
            intersection_ratio: 1.0,
        }
    }

    pub fn hidden(target: NodeId) -> Self {
        Self {
            target,
            is_intersecting: false,
            intersection_ratio: 0.0,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.is_intersecting || self.intersection_ratio > 0.0
    }
}

/// Visibility observation and color-scheme change notification.
///
/// The host only records subscriptions; it reports events by calling back
/// into the [`crate::LazyController`] that owns them.
pub trait VisibilityHost: HighlightHost {
    fn supports_observer(&self) -> bool;

    /// Elements under `root` matching a simple `tag[attr]` selector list.
    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId>;

    fn create_observer(&mut self, config: &ObserverConfig) -> Option<ObserverId>;

    fn observe(&mut self, observer: ObserverId, target: NodeId);

    fn disconnect_observer(&mut self, observer: ObserverId);

    /// Subscribe to color-scheme changes. `None` when the host cannot report
    /// them.
    fn watch_color_scheme(&mut self) -> Option<WatchId>;

    fn unwatch_color_scheme(&mut self, watch: WatchId);
}
