use pre_highlight_runtime::{
    ApplyOptions, HighlightRuntime, IntersectionEntry, LazyOptions, MemoryDocument, NodeId,
    PayloadMap,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn page() -> (MemoryDocument, NodeId, NodeId) {
    let mut doc = MemoryDocument::new().with_prefers_dark(false);
    let root = doc.root();
    let block = doc.append_code_block(doc.body(), Some("hl-1"), &["let x"]);
    (doc, root, block.pre)
}

fn lazy_options(watch_color_scheme: bool) -> LazyOptions {
    let mut map = PayloadMap::new();
    map.insert(
        "hl-1".into(),
        Arc::new(json!({
            "v": 1,
            "scopes": ["hl-keyword"],
            "ranges": [[0, 0, 3]],
            "variants": {"light": {}, "dark": {}}
        })),
    );
    LazyOptions {
        watch_color_scheme,
        apply: ApplyOptions {
            payload_map: Some(map),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn first_visible_batch_applies_once() {
    let (mut doc, root, pre) = page();
    let mut runtime = HighlightRuntime::new();
    let mut controller = runtime.observe(&mut doc, root, lazy_options(false));

    assert_eq!(
        controller.handle_intersections(&mut runtime, &mut doc, &[IntersectionEntry::hidden(pre)]),
        None
    );
    assert!(doc.highlight_names().is_empty());

    let outcome = controller
        .handle_intersections(&mut runtime, &mut doc, &[IntersectionEntry::visible(pre)])
        .unwrap();
    assert_eq!(outcome.applied_blocks, 1);
    assert_eq!(doc.highlight_names(), vec!["hl-keyword-v-light"]);
    assert!(controller.has_applied());

    let writes = doc.highlight_writes();
    assert_eq!(
        controller.handle_intersections(&mut runtime, &mut doc, &[IntersectionEntry::visible(pre)]),
        None
    );
    assert_eq!(doc.highlight_writes(), writes);
    assert_eq!(controller.observe(&mut doc), 0);
}

#[test]
fn partial_ratio_counts_as_visible() {
    let (mut doc, root, pre) = page();
    let mut runtime = HighlightRuntime::new();
    let options = LazyOptions {
        once: false,
        ..lazy_options(false)
    };
    let mut controller = runtime.observe(&mut doc, root, options);
    let sliver = IntersectionEntry {
        target: pre,
        is_intersecting: false,
        intersection_ratio: 0.1,
    };

    assert!(controller.handle_intersections(&mut runtime, &mut doc, &[sliver]).is_some());
    assert!(controller.handle_intersections(&mut runtime, &mut doc, &[sliver]).is_some());
    assert_eq!(controller.observe(&mut doc), 1);
}

#[test]
fn scheme_flip_reapplies_after_first_apply() {
    let (mut doc, root, pre) = page();
    let mut runtime = HighlightRuntime::new();
    let mut controller = runtime.observe(&mut doc, root, lazy_options(true));

    doc.set_prefers_dark(Some(true));
    assert_eq!(controller.handle_color_scheme_change(&mut runtime, &mut doc), None);

    controller.handle_intersections(&mut runtime, &mut doc, &[IntersectionEntry::visible(pre)]);
    assert_eq!(doc.highlight_names(), vec!["hl-keyword-v-dark"]);

    doc.set_prefers_dark(Some(false));
    let outcome = controller.handle_color_scheme_change(&mut runtime, &mut doc).unwrap();
    assert_eq!(outcome.applied_ranges, 1);
    assert_eq!(doc.highlight_names(), vec!["hl-keyword-v-light"]);
}

#[test]
fn disconnected_controller_ignores_events() {
    let (mut doc, root, pre) = page();
    let mut runtime = HighlightRuntime::new();
    let mut controller = runtime.observe(&mut doc, root, lazy_options(true));
    controller.disconnect(&mut doc);

    assert_eq!(
        controller.handle_intersections(&mut runtime, &mut doc, &[IntersectionEntry::visible(pre)]),
        None
    );
    assert_eq!(controller.handle_color_scheme_change(&mut runtime, &mut doc), None);
    assert!(doc.highlight_names().is_empty());
}

#[test]
fn apply_now_works_without_an_observer() {
    let mut doc = MemoryDocument::new().without_observer();
    let root = doc.root();
    doc.append_code_block(doc.body(), Some("hl-1"), &["let x"]);
    let mut runtime = HighlightRuntime::new();
    let mut controller = runtime.observe(&mut doc, root, lazy_options(false));

    assert!(!controller.is_supported());
    assert_eq!(controller.reason(), Some("observer-unsupported"));
    let outcome = controller.apply_now(&mut runtime, &mut doc);
    assert_eq!(outcome.applied_blocks, 1);
}
