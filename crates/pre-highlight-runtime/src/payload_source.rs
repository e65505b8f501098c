use crate::host::{HighlightHost, NodeId};
use crate::options::PayloadMap;
use pre_highlight_engine::fence::BLOCK_ATTR;
use pre_highlight_engine::payload::HighlightPayload;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Payloads embedded in the document under `root`.
///
/// The aggregate script's entries come first and per-block inline scripts
/// override them. Scripts that are empty or not valid JSON are ignored.
pub fn payload_map_from_document<H: HighlightHost + ?Sized>(
    host: &H,
    root: NodeId,
    script_id: &str,
) -> PayloadMap {
    let mut map = PayloadMap::new();
    if let Some(text) = host.script_text(root, script_id).filter(|t| !t.is_empty()) {
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(entries)) => {
                map.extend(entries.into_iter().map(|(id, payload)| (id, Arc::new(payload))));
            }
            Ok(_) => log::debug!("payload script '{script_id}' is not an object"),
            Err(err) => log::debug!("payload script '{script_id}' is not valid JSON: {err}"),
        }
    }
    for (block_id, text) in host.inline_payload_scripts(root, BLOCK_ATTR) {
        if block_id.is_empty() || text.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(payload) => {
                map.insert(block_id, Arc::new(payload));
            }
            Err(err) => log::debug!("inline payload for '{block_id}' is not valid JSON: {err}"),
        }
    }
    map
}

/// Typed payloads, e.g. a render environment's, as a runtime payload map.
pub fn payload_map<'a, I>(payloads: I) -> serde_json::Result<PayloadMap>
where
    I: IntoIterator<Item = (&'a String, &'a HighlightPayload)>,
{
    payloads
        .into_iter()
        .map(|(id, payload)| Ok((id.clone(), Arc::new(serde_json::to_value(payload)?))))
        .collect()
}

/// Serialized payloads, memoized by `Arc` identity for one pass.
#[derive(Debug, Default)]
pub struct DigestCache {
    json: HashMap<*const Value, String>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payload_json(&mut self, payload: &Arc<Value>) -> String {
        self.json
            .entry(Arc::as_ptr(payload))
            .or_insert_with(|| payload.to_string())
            .clone()
    }

    /// `id=json;` for every payload, in key order.
    pub fn map_digest(&mut self, map: &PayloadMap) -> String {
        let mut digest = String::new();
        for (id, payload) in map {
            digest.push_str(id);
            digest.push('=');
            digest.push_str(&self.payload_json(payload));
            digest.push(';');
        }
        digest
    }
}
