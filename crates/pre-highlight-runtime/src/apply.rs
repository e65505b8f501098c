//! Painting payload ranges onto live text.

use crate::diagnostics::{ApplyOutcome, ClearOutcome, Diagnostic, SkipReason};
use crate::host::{CodeBlock, HighlightHost, NodeId, TextRange};
use crate::options::{ApplyOptions, ColorScheme, PayloadMap};
use crate::payload_source::{DigestCache, payload_map_from_document};
use crate::segments::{SegmentResolver, collect_segments, segments_len};
use crate::state::{BlockCache, RootKey, RootState, RuntimeRegistry};
use crate::view::{PayloadView, resolve_view, safe_integer, scope_name};
use pre_highlight_engine::fence::{APPLIED_ATTR, BLOCK_ATTR};
use pre_highlight_engine::payload::{ScopeStyle, sanitize_highlight_name};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Id of the style element the runtime writes `::highlight()` rules into.
pub const RUNTIME_STYLE_TAG_ID: &str = "pre-highlight-style";

/// Registry name for a payload scope, suffixed with the active variant.
pub fn runtime_scope_name(scope: &str, variant_key: &str) -> String {
    let base = sanitize_highlight_name(scope);
    if variant_key.is_empty() {
        base
    } else {
        format!("{base}-v-{}", sanitize_highlight_name(variant_key))
    }
}

/// Each property is read on its own; a malformed one doesn't drop the rest.
fn scope_css(styles: Option<&[Value]>, index: usize) -> String {
    let Some(style) = styles
        .and_then(|styles| styles.get(index))
        .and_then(Value::as_object)
    else {
        return String::new();
    };
    let field = |key: &str| style.get(key).and_then(Value::as_str).map(str::to_string);
    ScopeStyle {
        color: field("color"),
        background_color: field("backgroundColor"),
        text_decoration: field("textDecoration"),
        text_shadow: field("textShadow"),
    }
    .to_css()
}

/// Applies payloads to documents and owns everything that must survive
/// between passes.
#[derive(Debug, Default)]
pub struct HighlightRuntime {
    registry: RuntimeRegistry,
}

/// Ranges gathered across blocks during one pass.
#[derive(Default)]
struct PassRanges {
    by_name: BTreeMap<String, Vec<TextRange>>,
    applied_blocks: usize,
    applied_ranges: usize,
    pending_css: String,
    style_element: Option<NodeId>,
}

impl PassRanges {
    fn extend(&mut self, name: &str, ranges: &[TextRange]) {
        self.by_name
            .entry(name.to_string())
            .or_default()
            .extend_from_slice(ranges);
    }
}

/// Incremental bookkeeping for one pass.
struct IncrementalPass {
    digest: String,
    refs: BTreeMap<String, NodeId>,
    prev_blocks: HashMap<String, BlockCache>,
    prev_meta: BTreeMap<String, String>,
    next_blocks: HashMap<String, BlockCache>,
    next_meta: BTreeMap<String, String>,
    block_digests: HashMap<String, String>,
    json: DigestCache,
}

impl IncrementalPass {
    fn add_meta(&mut self, block_id: &str, name: &str, meta: &str) {
        self.next_meta
            .entry(name.to_string())
            .or_default()
            .push_str(&format!("|{block_id}:{meta}"));
    }

    fn block_digest(&mut self, block_id: &str, payload: &Arc<Value>, variant_key: &str) -> String {
        if let Some(digest) = self.block_digests.get(block_id) {
            return digest.clone();
        }
        let digest = match self.prev_blocks.get(block_id) {
            Some(prev) if Arc::ptr_eq(&prev.payload, payload) && prev.variant_key == variant_key => {
                prev.payload_digest.clone()
            }
            _ => format!("{}|variant={variant_key}", self.json.payload_json(payload)),
        };
        self.block_digests.insert(block_id.to_string(), digest.clone());
        digest
    }
}

struct BlockOutcome {
    scope_ranges: BTreeMap<String, Vec<TextRange>>,
    scope_meta: BTreeMap<String, String>,
    applied_names: Vec<String>,
    applied_range_count: usize,
}

impl HighlightRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn root_key<H: HighlightHost + ?Sized>(host: &H, root: NodeId) -> RootKey {
        RootKey {
            document: host.document_key(),
            root,
        }
    }

    /// Whether incremental state is held for `root`.
    pub fn has_state<H: HighlightHost + ?Sized>(&self, host: &H, root: NodeId) -> bool {
        self.registry.root(&Self::root_key(host, root)).is_some()
    }

    fn resolve_scheme<H: HighlightHost + ?Sized>(host: &H, options: &ApplyOptions) -> &'static str {
        match options.color_scheme {
            ColorScheme::Light => "light",
            ColorScheme::Dark => "dark",
            ColorScheme::Auto => {
                let dark = match &options.prefers_dark {
                    Some(hook) => hook(),
                    None => host.prefers_dark().unwrap_or(false),
                };
                if dark { "dark" } else { "light" }
            }
        }
    }

    /// Paint every bound code block under `root`.
    ///
    /// Nothing here fails: unusable blocks and ranges are skipped and
    /// reported through the diagnostic hook.
    pub fn apply<H: HighlightHost + ?Sized>(
        &mut self,
        host: &mut H,
        root: NodeId,
        options: &ApplyOptions,
    ) -> ApplyOutcome {
        if !host.supports_highlights() {
            options.emit(Diagnostic::runtime(SkipReason::ApiUnsupported));
            return ApplyOutcome::unsupported();
        }
        let key = Self::root_key(host, root);
        let blocks = host.code_blocks(root);
        if blocks.is_empty() {
            self.registry.clear_root(&key);
            return ApplyOutcome::default();
        }

        let payloads = match &options.payload_map {
            Some(map) => map.clone(),
            None => payload_map_from_document(host, root, options.data_script_id()),
        };
        let scheme = Self::resolve_scheme(host, options);
        let accepted = options.accepted_versions();

        let mut incremental = None;
        if options.incremental {
            let mut json = DigestCache::new();
            let refs: BTreeMap<String, NodeId> = blocks
                .iter()
                .filter_map(|block| {
                    let id = host.attribute(block.pre, BLOCK_ATTR).filter(|id| !id.is_empty())?;
                    Some((id, block.code))
                })
                .collect();
            let payload_digest = match &options.payload_digest {
                Some(digest) => digest.clone(),
                None => json.map_digest(&payloads),
            };
            let ids: Vec<&str> = refs.keys().map(String::as_str).collect();
            let digest = format!("{payload_digest}|ids={}|scheme={scheme}", ids.join(","));

            let prev = self.registry.root(&key);
            if let Some(prev) = prev
                && prev.digest == digest
                && prev.refs == refs
            {
                options.emit(Diagnostic::runtime(SkipReason::Unchanged));
                return ApplyOutcome::unchanged();
            }
            let (prev_blocks, prev_meta) = prev
                .map(|state| (state.blocks.clone(), state.scope_meta.clone()))
                .unwrap_or_default();
            incremental = Some(IncrementalPass {
                digest,
                refs,
                prev_blocks,
                prev_meta,
                next_blocks: HashMap::new(),
                next_meta: BTreeMap::new(),
                block_digests: HashMap::new(),
                json,
            });
        } else {
            clear_applied_names(host, root);
        }

        let mut pass = PassRanges::default();
        for block in &blocks {
            self.apply_block(
                host,
                *block,
                &payloads,
                scheme,
                &accepted,
                options,
                &mut pass,
                incremental.as_mut(),
            );
        }

        match &incremental {
            Some(inc) => {
                let names: BTreeSet<&String> = inc.prev_meta.keys().chain(inc.next_meta.keys()).collect();
                for name in names {
                    let next = inc.next_meta.get(name);
                    if next.is_some() && next == inc.prev_meta.get(name) {
                        continue;
                    }
                    match pass.by_name.remove(name.as_str()).filter(|r| !r.is_empty()) {
                        Some(ranges) if next.is_some() => host.set_highlight(name, ranges),
                        _ => host.delete_highlight(name),
                    }
                }
            }
            None => {
                for (name, ranges) in std::mem::take(&mut pass.by_name) {
                    if !ranges.is_empty() {
                        host.set_highlight(&name, ranges);
                    }
                }
            }
        }

        if let Some(style) = pass.style_element
            && !pass.pending_css.is_empty()
        {
            host.append_style_text(style, &pass.pending_css);
        }

        match incremental {
            Some(inc) => self.registry.set_root(
                key,
                RootState {
                    digest: inc.digest,
                    refs: inc.refs,
                    blocks: inc.next_blocks,
                    scope_meta: inc.next_meta,
                },
            ),
            None => {
                self.registry.clear_root(&key);
            }
        }

        log::debug!(
            "applied {} ranges across {} blocks",
            pass.applied_ranges,
            pass.applied_blocks
        );
        ApplyOutcome {
            applied_blocks: pass.applied_blocks,
            applied_ranges: pass.applied_ranges,
            ..ApplyOutcome::default()
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_block<H: HighlightHost + ?Sized>(
        &mut self,
        host: &mut H,
        block: CodeBlock,
        payloads: &PayloadMap,
        scheme: &str,
        accepted: &BTreeSet<i64>,
        options: &ApplyOptions,
        pass: &mut PassRanges,
        mut incremental: Option<&mut IncrementalPass>,
    ) {
        let pre = block.pre;
        let Some(block_id) = host.attribute(pre, BLOCK_ATTR).filter(|id| !id.is_empty()) else {
            options.emit(Diagnostic::block(None, SkipReason::MissingBlockId));
            return;
        };
        let skip = |host: &mut H, reason: SkipReason| {
            host.remove_attribute(pre, APPLIED_ATTR);
            options.emit(Diagnostic::block(Some(&block_id), reason));
        };

        let Some(payload) = payloads.get(&block_id) else {
            skip(host, SkipReason::MissingPayload);
            return;
        };
        let Some(view) = resolve_view(payload, scheme) else {
            skip(host, SkipReason::MissingPayload);
            return;
        };
        let version = payload.get("v").cloned().unwrap_or(Value::Null);
        if !safe_integer(&version).is_some_and(|v| accepted.contains(&v)) {
            host.remove_attribute(pre, APPLIED_ATTR);
            options.emit(Diagnostic {
                version: Some(version),
                ..Diagnostic::block(Some(&block_id), SkipReason::UnsupportedVersion)
            });
            return;
        }
        if view.ranges.is_empty() || view.scopes.is_empty() {
            skip(host, SkipReason::EmptyPayload);
            return;
        }

        let block_digest = incremental
            .as_deref_mut()
            .map(|inc| inc.block_digest(&block_id, payload, view.variant_key))
            .unwrap_or_default();
        let text = host.text_content(block.code);
        let text_nodes = host.text_nodes(block.code);
        let first_text = text_nodes.first().map(|n| n.id);
        let last_text = text_nodes.last().map(|n| n.id);

        if let Some(inc) = incremental.as_deref_mut()
            && let Some(cached) = inc.prev_blocks.get(&block_id)
            && cached.matches(block.code, &block_digest, &text, first_text, last_text)
        {
            let cached = cached.clone();
            log::debug!("block {block_id} unchanged, replaying {} ranges", cached.applied_range_count);
            for (name, ranges) in &cached.scope_ranges {
                pass.extend(name, ranges);
            }
            if cached.applied_marker.is_empty() {
                host.remove_attribute(pre, APPLIED_ATTR);
            } else {
                host.set_attribute(pre, APPLIED_ATTR, &cached.applied_marker);
                pass.applied_blocks += 1;
            }
            pass.applied_ranges += cached.applied_range_count;
            for (name, meta) in &cached.scope_meta {
                inc.add_meta(&block_id, name, meta);
            }
            inc.next_blocks.insert(block_id, cached);
            return;
        }

        let segments = collect_segments(host, block.code);
        let actual_len = segments_len(&segments);
        if let Some(expected) = payload.get("textLength").and_then(safe_integer)
            && usize::try_from(expected).ok() != Some(actual_len)
        {
            host.remove_attribute(pre, APPLIED_ATTR);
            options.emit(Diagnostic {
                payload_text_length: Some(expected),
                actual_text_length: Some(actual_len),
                ..Diagnostic::block(Some(&block_id), SkipReason::TextLengthMismatch)
            });
            return;
        }

        let document = host.document_key();
        let mut resolver = SegmentResolver::new(&segments);
        let outcome = self.collect_block_ranges(host, &block_id, &view, &mut resolver, document, options, pass);

        let applied_marker = outcome.applied_names.join(" ");
        if outcome.applied_names.is_empty() {
            host.remove_attribute(pre, APPLIED_ATTR);
            options.emit(Diagnostic::block(Some(&block_id), SkipReason::NoValidRanges));
        } else {
            host.set_attribute(pre, APPLIED_ATTR, &applied_marker);
            pass.applied_blocks += 1;
        }

        if let Some(inc) = incremental {
            for (name, meta) in &outcome.scope_meta {
                inc.add_meta(&block_id, name, meta);
            }
            inc.next_blocks.insert(
                block_id,
                BlockCache {
                    code: block.code,
                    payload: Arc::clone(payload),
                    variant_key: view.variant_key.to_string(),
                    payload_digest: block_digest,
                    text_snapshot: text,
                    first_text,
                    last_text,
                    scope_ranges: outcome.scope_ranges,
                    scope_meta: outcome.scope_meta,
                    applied_range_count: outcome.applied_range_count,
                    applied_marker,
                },
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_block_ranges<H: HighlightHost + ?Sized>(
        &mut self,
        host: &mut H,
        block_id: &str,
        view: &PayloadView<'_>,
        resolver: &mut SegmentResolver<'_>,
        document: u64,
        options: &ApplyOptions,
        pass: &mut PassRanges,
    ) -> BlockOutcome {
        let mut runtime_names: Vec<Option<String>> = vec![None; view.scopes.len()];
        let mut scope_ranges: BTreeMap<String, Vec<TextRange>> = BTreeMap::new();
        let mut meta_parts: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut applied_names = Vec::new();
        let mut seen = HashSet::new();
        let mut applied_range_count = 0;

        for (tuple_index, tuple) in view.ranges.iter().enumerate() {
            let range_skip = |reason| Diagnostic::range(block_id, tuple_index, reason);
            let Some(parts) = tuple.as_array().filter(|t| t.len() >= 3) else {
                options.emit(range_skip(SkipReason::InvalidTuple));
                continue;
            };
            let (Some(scope_index), Some(start), Some(end)) = (
                safe_integer(&parts[0]),
                safe_integer(&parts[1]),
                safe_integer(&parts[2]),
            ) else {
                options.emit(range_skip(SkipReason::InvalidRange));
                continue;
            };
            if end <= start {
                options.emit(range_skip(SkipReason::InvalidRange));
                continue;
            }
            let Some(slot) = usize::try_from(scope_index)
                .ok()
                .filter(|i| *i < view.scopes.len())
            else {
                options.emit(Diagnostic {
                    scope_index: Some(scope_index),
                    ..range_skip(SkipReason::InvalidScopeIndex)
                });
                continue;
            };
            let Some(scope) = scope_name(&view.scopes[slot]) else {
                options.emit(Diagnostic {
                    scope_index: Some(scope_index),
                    ..range_skip(SkipReason::MissingScope)
                });
                continue;
            };
            let (Some(start_pos), Some(end_pos)) = (resolver.resolve(start), resolver.resolve(end)) else {
                options.emit(Diagnostic {
                    start: Some(start),
                    end: Some(end),
                    ..range_skip(SkipReason::RangeOutOfBounds)
                });
                continue;
            };
            let range = match host.create_range(start_pos, end_pos) {
                Ok(range) => range,
                Err(err) => {
                    log::debug!("block {block_id} tuple {tuple_index}: {err}");
                    options.emit(range_skip(SkipReason::RangeCreateFailed));
                    continue;
                }
            };

            let name = match &runtime_names[slot] {
                Some(name) => name.clone(),
                None => {
                    let name = runtime_scope_name(&scope, view.variant_key);
                    self.queue_scope_css(host, document, &name, &scope_css(view.scope_styles, slot), pass);
                    runtime_names[slot] = Some(name.clone());
                    name
                }
            };

            pass.by_name.entry(name.clone()).or_default().push(range);
            scope_ranges.entry(name.clone()).or_default().push(range);
            meta_parts
                .entry(name.clone())
                .or_default()
                .push(format!("{start}-{end}"));
            pass.applied_ranges += 1;
            applied_range_count += 1;
            if seen.insert(name.clone()) {
                applied_names.push(name);
            }
        }

        BlockOutcome {
            scope_ranges,
            scope_meta: meta_parts
                .into_iter()
                .map(|(name, parts)| (name, parts.join(",")))
                .collect(),
            applied_names,
            applied_range_count,
        }
    }

    /// Queue a `::highlight()` rule unless the document already has this
    /// exact CSS for `name`.
    fn queue_scope_css<H: HighlightHost + ?Sized>(
        &mut self,
        host: &mut H,
        document: u64,
        name: &str,
        css: &str,
        pass: &mut PassRanges,
    ) {
        if css.is_empty() || self.registry.inserted_css(document, name) == Some(css) {
            return;
        }
        if pass.style_element.is_none() {
            pass.style_element = host.ensure_style_element(RUNTIME_STYLE_TAG_ID);
        }
        if pass.style_element.is_some() {
            pass.pending_css.push_str(&format!("\n::highlight({name}){{{css};}}"));
            self.registry.record_css(document, name, css);
        }
    }

    /// Remove every highlight applied under `root` and forget its state.
    pub fn clear<H: HighlightHost + ?Sized>(&mut self, host: &mut H, root: NodeId) -> ClearOutcome {
        if !host.supports_highlights() {
            return ClearOutcome {
                cleared: 0,
                reason: Some(SkipReason::ApiUnsupported),
            };
        }
        self.registry.clear_root(&Self::root_key(host, root));
        ClearOutcome {
            cleared: clear_applied_names(host, root),
            reason: None,
        }
    }

    /// Forget all per-root state and recorded CSS. Registered highlights
    /// are left to the host.
    pub fn reset(&mut self) {
        self.registry.clear();
    }
}

/// Delete the highlights named by applied-name markers under `root` and
/// drop the markers. Returns how many distinct names were deleted.
fn clear_applied_names<H: HighlightHost + ?Sized>(host: &mut H, root: NodeId) -> usize {
    let mut removed = HashSet::new();
    for pre in host.elements_with_attribute(root, APPLIED_ATTR) {
        let marker = host.attribute(pre, APPLIED_ATTR).unwrap_or_default();
        for name in marker.split_whitespace() {
            if removed.insert(name.to_string()) {
                host.delete_highlight(name);
            }
        }
        host.remove_attribute(pre, APPLIED_ATTR);
    }
    removed.len()
}
