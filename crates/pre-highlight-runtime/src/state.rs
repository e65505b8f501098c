//! What incremental mode remembers between passes.

use crate::host::{NodeId, TextRange};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A root within a particular document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootKey {
    pub document: u64,
    pub root: NodeId,
}

/// One block as it was last painted.
#[derive(Debug, Clone)]
pub struct BlockCache {
    pub code: NodeId,
    pub payload: Arc<Value>,
    pub variant_key: String,
    pub payload_digest: String,
    pub text_snapshot: String,
    pub first_text: Option<NodeId>,
    pub last_text: Option<NodeId>,
    /// Ranges per runtime scope name.
    pub scope_ranges: BTreeMap<String, Vec<TextRange>>,
    /// `start-end,start-end` per runtime scope name.
    pub scope_meta: BTreeMap<String, String>,
    pub applied_range_count: usize,
    /// Value of the applied-names attribute; empty when nothing applied.
    pub applied_marker: String,
}

impl BlockCache {
    /// Whether the block can be replayed without touching its text.
    pub fn matches(
        &self,
        code: NodeId,
        payload_digest: &str,
        text: &str,
        first_text: Option<NodeId>,
        last_text: Option<NodeId>,
    ) -> bool {
        self.code == code
            && self.payload_digest == payload_digest
            && self.text_snapshot == text
            && self.first_text == first_text
            && self.last_text == last_text
    }
}

#[derive(Debug, Clone, Default)]
pub struct RootState {
    pub digest: String,
    /// Code element per block id at the time of the pass.
    pub refs: BTreeMap<String, NodeId>,
    pub blocks: HashMap<String, BlockCache>,
    /// `|blockId:meta` concatenated per runtime scope name, across blocks.
    pub scope_meta: BTreeMap<String, String>,
}

/// Per-root state plus the CSS rules already written per document.
#[derive(Debug, Default)]
pub struct RuntimeRegistry {
    roots: HashMap<RootKey, RootState>,
    inserted_styles: HashMap<u64, HashMap<String, String>>,
}

impl RuntimeRegistry {
    pub fn root(&self, key: &RootKey) -> Option<&RootState> {
        self.roots.get(key)
    }

    pub fn set_root(&mut self, key: RootKey, state: RootState) {
        self.roots.insert(key, state);
    }

    pub fn clear_root(&mut self, key: &RootKey) -> bool {
        self.roots.remove(key).is_some()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// CSS last written for `name` in `document`.
    pub fn inserted_css(&self, document: u64, name: &str) -> Option<&str> {
        self.inserted_styles
            .get(&document)
            .and_then(|styles| styles.get(name))
            .map(String::as_str)
    }

    pub fn record_css(&mut self, document: u64, name: &str, css: &str) {
        self.inserted_styles
            .entry(document)
            .or_default()
            .insert(name.to_string(), css.to_string());
    }

    pub fn clear(&mut self) {
        self.roots.clear();
        self.inserted_styles.clear();
    }
}
