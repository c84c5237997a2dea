//! Phase 1 — cache build: read previously translated field
//! values out of a relational store keyed on (site, parent identifier).

use async_trait::async_trait;
use productcrawl_types::AttrMap;
use std::collections::HashMap;

/// One row of the relational `skus` table: a child SKU and its stored
/// product data, which may carry a `translation_metadata` sub-map from a
/// prior crawl.
#[derive(Debug, Clone)]
pub struct SkuRow {
    pub sku: String,
    pub data: AttrMap,
}

/// Abstracts the relational store backing per-domain SKU rows
/// behind (domain, parent SKU).
#[async_trait]
pub trait SkusStore: Send + Sync {
    async fn fetch(&self, domain: &str, parent_sku: &str) -> anyhow::Result<Vec<SkuRow>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedVal {
    pub value: String,
    pub time: i64,
}

/// Result of the cache build: the source-value → translated-value cache
/// used by phase 2, plus a per-child-SKU auxiliary map (`"{sku}:{field}"` →
/// translated value) covering rows whose original value isn't in this
/// crawl's product set but was translated on a prior crawl.
pub struct TranslationCache {
    pub cache: HashMap<String, TranslatedVal>,
    pub aux: HashMap<String, String>,
}

/// Scans every row the store returns for (site, parent_sku), picking up
/// `{field}_orig`/`{field}_epoch` pairs recorded inside `translation_metadata`
/// by a prior translation pass.
pub async fn build_translation_cache(
    store: &dyn SkusStore,
    domain: &str,
    parent_sku: &str,
    translation_obj_name: &str,
    translate_keys: &[String],
) -> anyhow::Result<TranslationCache> {
    let rows = store.fetch(domain, parent_sku).await?;
    let mut cache = HashMap::new();
    let mut aux = HashMap::new();

    for row in rows {
        let Some(meta) = row.data.get(translation_obj_name).and_then(|v| v.as_map()) else {
            continue;
        };

        for field in translate_keys {
            let orig_key = format!("{field}_orig");
            let epoch_key = format!("{field}_epoch");
            let Some(orig_val) = meta.get(&orig_key).and_then(|v| v.as_str()) else {
                continue;
            };
            let epoch = meta.get(&epoch_key).and_then(|v| v.as_int64()).unwrap_or(0);

            let Some(translated) = row.data.get(field).and_then(|v| v.as_str()) else {
                continue;
            };

            cache.insert(orig_val.to_string(), TranslatedVal { value: translated.to_string(), time: epoch });
            aux.insert(format!("{}:{}", row.sku, field), translated.to_string());
        }
    }

    Ok(TranslationCache { cache, aux })
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_types::Value;

    struct StubStore {
        rows: Vec<SkuRow>,
    }

    #[async_trait]
    impl SkusStore for StubStore {
        async fn fetch(&self, _domain: &str, _parent_sku: &str) -> anyhow::Result<Vec<SkuRow>> {
            Ok(self.rows.clone())
        }
    }

    fn row_with_translation(sku: &str, field: &str, orig: &str, translated: &str, epoch: i64) -> SkuRow {
        let mut meta = AttrMap::new();
        meta.insert(format!("{field}_orig"), Value::String(orig.into()));
        meta.insert(format!("{field}_epoch"), Value::Number(epoch as f64));

        let mut data = AttrMap::new();
        data.insert("translation_metadata".into(), Value::Map(meta));
        data.insert(field.to_string(), Value::String(translated.into()));

        SkuRow { sku: sku.to_string(), data }
    }

    #[tokio::test]
    async fn build_cache_indexes_by_original_value_and_child_sku() {
        let store = StubStore { rows: vec![row_with_translation("child-1", "name", "Orijinal", "Original", 1700000000)] };
        let result = build_translation_cache(&store, "example.com", "parent-1", "translation_metadata", &["name".to_string()]).await.unwrap();

        assert_eq!(result.cache.get("Orijinal"), Some(&TranslatedVal { value: "Original".into(), time: 1700000000 }));
        assert_eq!(result.aux.get("child-1:name").map(String::as_str), Some("Original"));
    }

    #[tokio::test]
    async fn build_cache_skips_rows_without_translation_metadata() {
        let mut data = AttrMap::new();
        data.insert("name".into(), Value::String("Untouched".into()));
        let store = StubStore { rows: vec![SkuRow { sku: "child-2".into(), data }] };

        let result = build_translation_cache(&store, "example.com", "parent-1", "translation_metadata", &["name".to_string()]).await.unwrap();
        assert!(result.cache.is_empty());
        assert!(result.aux.is_empty());
    }
}
