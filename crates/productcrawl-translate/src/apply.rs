//! Phase 2 — apply — and phase 3 — stats, folded together because the stats
//! increments fire inline with the cache-miss RPC path.

use crate::cache::TranslatedVal;
use async_trait::async_trait;
use productcrawl_reliability::CounterStore;
use productcrawl_types::{AttrMap, CrawlError, CrawlErrorCode, Value};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Abstracts the translation RPC service.
#[async_trait]
pub trait TranslationRpcClient: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, CrawlError>;
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Translates `translate_keys` across every product, writing `{field}_orig`
/// / `{field}_epoch` into each product's `translation_obj_name` sub-map and
/// the translated value into the field itself. `cache` is consulted first;
/// on a miss it's either backfilled from `aux` (RPC switch off) or refreshed
/// via `rpc.translate` (RPC switch on, with a stats increment per call).
#[allow(clippy::too_many_arguments)]
pub async fn translate_fields(
    products: &mut [AttrMap],
    aux: &HashMap<String, String>,
    translation_obj_name: &str,
    translate_keys: &[String],
    source: &str,
    target: &str,
    rpc_switch: bool,
    cache: &mut HashMap<String, TranslatedVal>,
    rpc: &dyn TranslationRpcClient,
    counters: &dyn CounterStore,
    job_id: &str,
) -> Result<(), CrawlError> {
    for (child_sku_num, product) in products.iter_mut().enumerate() {
        let child_sku = product.get("sku").and_then(Value::as_str).unwrap_or("").to_string();

        let mut meta = product
            .get(translation_obj_name)
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default();

        for field in translate_keys {
            let Some(orig_val) = product.get(field).and_then(Value::as_str).map(str::to_owned) else {
                continue;
            };

            let translated = match cache.get(&orig_val) {
                Some(v) => v.clone(),
                None if !rpc_switch => {
                    if let Some(prior) = aux.get(&format!("{child_sku}:{field}")) {
                        product.insert(field.clone(), Value::String(prior.clone()));
                    }
                    continue;
                }
                None => {
                    update_translation_stats(counters, job_id, field, child_sku_num).await;

                    let text = rpc.translate(&orig_val, source, target).await.map_err(|err| {
                        CrawlError::with_cause(CrawlErrorCode::Other("TRANSLATE_KEY_ERR"), format!("field {field}, orig {orig_val}"), err)
                    })?;
                    let v = TranslatedVal { value: text, time: now_unix() };
                    cache.insert(orig_val.clone(), v.clone());
                    v
                }
            };

            meta.insert(format!("{field}_orig"), Value::String(orig_val));
            meta.insert(format!("{field}_epoch"), Value::Number(translated.time as f64));
            product.insert(field.clone(), Value::String(translated.value));
        }

        product.insert(translation_obj_name.to_string(), Value::Map(meta));
    }

    Ok(())
}

/// Phase 3: `job_translation_stats;<job_id>` hash, incremented per RPC call
/// made. The parent-SKU field is only bumped for the first (parent) product.
async fn update_translation_stats(counters: &dyn CounterStore, job_id: &str, field: &str, child_sku_num: usize) {
    let hash_key = format!("job_translation_stats;{job_id}");
    if let Err(err) = counters.hincrby(&hash_key, "total_calls", 1).await {
        tracing::warn!(%err, "UPDATE_TRANSLATION_TOTAL_ERR");
        return;
    }
    if child_sku_num == 0 {
        if let Err(err) = counters.hincrby(&hash_key, &format!("parent_sku_{field}_calls"), 1).await {
            tracing::warn!(%err, "UPDATE_TRANSLATION_PARENTSTATS_ERR");
        }
    }
    if let Err(err) = counters.hincrby(&hash_key, &format!("child_sku_{field}_calls"), 1).await {
        tracing::warn!(%err, "UPDATE_TRANSLATION_CHILDSTATS_ERR");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_reliability::InMemoryCounterStore;

    struct StubRpc {
        reply: String,
    }

    #[async_trait]
    impl TranslationRpcClient for StubRpc {
        async fn translate(&self, _text: &str, _source: &str, _target: &str) -> Result<String, CrawlError> {
            Ok(self.reply.clone())
        }
    }

    fn product_with(field: &str, value: &str) -> AttrMap {
        let mut p = AttrMap::new();
        p.insert(field.to_string(), Value::String(value.to_string()));
        p.insert("sku".into(), Value::String("child-1".into()));
        p
    }

    #[tokio::test]
    async fn cache_hit_writes_translated_value_without_rpc() {
        let mut products = vec![product_with("name", "Orijinal")];
        let mut cache = HashMap::new();
        cache.insert("Orijinal".to_string(), TranslatedVal { value: "Original".into(), time: 42 });
        let counters = InMemoryCounterStore::new();
        let rpc = StubRpc { reply: "should not be called".into() };

        translate_fields(&mut products, &HashMap::new(), "translation_metadata", &["name".to_string()], "tr", "en", true, &mut cache, &rpc, &counters, "job-1")
            .await
            .unwrap();

        assert_eq!(products[0].get("name").and_then(Value::as_str), Some("Original"));
        let meta = products[0].get("translation_metadata").and_then(Value::as_map).unwrap();
        assert_eq!(meta.get("name_orig").and_then(Value::as_str), Some("Orijinal"));
    }

    #[tokio::test]
    async fn cache_miss_with_rpc_switch_on_calls_rpc_and_bumps_stats() {
        let mut products = vec![product_with("name", "Orijinal")];
        let mut cache = HashMap::new();
        let counters = InMemoryCounterStore::new();
        let rpc = StubRpc { reply: "Original".into() };

        translate_fields(&mut products, &HashMap::new(), "translation_metadata", &["name".to_string()], "tr", "en", true, &mut cache, &rpc, &counters, "job-1")
            .await
            .unwrap();

        assert_eq!(products[0].get("name").and_then(Value::as_str), Some("Original"));
        assert!(cache.contains_key("Orijinal"));
    }

    #[tokio::test]
    async fn cache_miss_with_rpc_switch_off_falls_back_to_aux() {
        let mut products = vec![product_with("name", "Orijinal")];
        let mut cache = HashMap::new();
        let mut aux = HashMap::new();
        aux.insert("child-1:name".to_string(), "Previously Translated".to_string());
        let counters = InMemoryCounterStore::new();
        let rpc = StubRpc { reply: "should not be called".into() };

        translate_fields(&mut products, &aux, "translation_metadata", &["name".to_string()], "tr", "en", false, &mut cache, &rpc, &counters, "job-1")
            .await
            .unwrap();

        assert_eq!(products[0].get("name").and_then(Value::as_str), Some("Previously Translated"));
    }
}
