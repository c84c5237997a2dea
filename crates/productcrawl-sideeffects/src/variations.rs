//! Variation splitter: separates new variation SKUs from ones already seen,
//! and constructs the discovery child SKU records for the new ones.

use productcrawl_types::{AttrMap, KvRecord, Value, Workflow};
use std::collections::{HashMap, HashSet};

/// Splits `workflow.products` into *new* (child id not present in the KV
/// record) and *old* (already known) variations, appending a synthetic
/// discontinued row for every KV-known child that wasn't crawled this time.
/// De-duplicates crawled variations by `_id`, keeping the first occurrence
/// per id — only one copy of a given SKU ends up in the final products list.
pub fn get_new_old_variations(workflow: &Workflow) -> (Vec<AttrMap>, Vec<AttrMap>) {
    let Some(kv_record) = workflow.kv_record.as_ref().filter(|r| !r.parent_identifier.is_empty()) else {
        tracing::info!(url = %workflow.url, count = workflow.products.len(), "GET_OLDNEW_RDSTORE_DATA_MISSING");
        return (workflow.products.clone(), Vec::new());
    };

    let known_ids: HashSet<&str> = kv_record.known_child_identifiers().collect();

    let mut seen = HashSet::new();
    let mut crawled: HashMap<String, AttrMap> = HashMap::new();
    let mut deduped = Vec::new();
    for variation in &workflow.products {
        let Some(id) = variation.get("_id").and_then(Value::as_str) else {
            tracing::warn!(url = %workflow.url, "GET_OLDNEW_BAD_DATA");
            continue;
        };
        if seen.insert(id.to_string()) {
            deduped.push(variation.clone());
        }
        crawled.insert(id.to_string(), variation.clone());
    }

    let mut now = workflow.crawl_timestamp;
    let mut new_variations = Vec::new();
    let mut old_variations = Vec::new();
    for variation in &deduped {
        let id = variation.get("_id").and_then(Value::as_str).unwrap_or_default();
        if known_ids.contains(id) {
            old_variations.push(variation.clone());
        } else {
            new_variations.push(variation.clone());
        }
        if let Some(t) = variation.get("time").and_then(Value::as_int64) {
            now = t;
        }
    }

    for id in known_ids {
        if !crawled.contains_key(id) {
            old_variations.push(construct_discontinued_child_sku(id, now, workflow));
        }
    }

    tracing::info!(url = %workflow.url, new = new_variations.len(), old = old_variations.len(), "GET_OLDNEW_STATUS");
    (new_variations, old_variations)
}

/// Synthetic row for a KV-known child not seen in this crawl, marked
/// discontinued. Uses the crawled page's redirect/initial URL and a "now"
/// timestamp taken from the last crawled variation's `time` field, falling
/// back to the workflow's crawl timestamp.
pub fn construct_discontinued_child_sku(child_identifier: &str, now: i64, workflow: &Workflow) -> AttrMap {
    let mut row = AttrMap::new();
    row.insert("_id".into(), Value::String(child_identifier.to_string()));
    row.insert("crawl_id".into(), Value::String(child_identifier.to_string()));
    row.insert("sku".into(), Value::String(child_identifier.to_string()));
    let redirect = workflow.web_response.as_ref().and_then(|r| r.redirect.clone()).unwrap_or_default();
    let initial = workflow.web_response.as_ref().map(|r| r.url.clone()).unwrap_or_default();
    row.insert("url".into(), Value::String(redirect));
    row.insert("_reserved_init_url".into(), Value::String(initial));
    row.insert("time".into(), Value::Number(now as f64));
    row.insert("isdiscontinued".into(), Value::String("1".into()));
    row.insert("recentoffers_count".into(), Value::Number(0.0));
    row
}
