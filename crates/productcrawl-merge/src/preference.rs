//! Field-level merge preference and the per-field merge rule.

use productcrawl_types::{AttrMap, Value};
use std::collections::HashMap;

/// Field name to the ordered list of sources tried, first non-empty wins.
pub type MergePreference = HashMap<String, Vec<String>>;

/// Every Sem3-supported product key, each defaulted to try every configured
/// data source in the job's configured order.
const PRODUCT_KEYS: &[&str] = &[
    "_id", "sku", "time", "description", "listprice", "listprice_currency", "offers", "offers1",
    "offers2", "model", "images", "internal_fields", "is_active", "url", "crumb", "features",
    "name", "name_firstkeyword", "processing_fields", "_reserved_init_url", "crawl_id", "geo_id",
    "department", "siterating", "ean", "width_unit", "brand", "tracks", "variation_tag", "isbn13",
    "isbn10", "isbn", "weight", "weight_unit", "recentoffers_count", "publisher", "published_at",
    "studio", "filmrating", "salesrank", "length_unit", "variation_ischild", "sizelookup",
    "reviews_number", "pages", "reviews_individual_number", "variation_ids", "variation_id", "upc",
    "images1", "images2", "height_unit", "author", "size", "color", "asin", "colorlookup", "upc14",
    "mpn", "height", "packagequantity", "artist", "length", "format", "siterating_scale",
    "images_count", "manufacturer",
];

/// Builds the preference map every field uses the same source order in, as
/// the job configured it.
pub fn default_merge_preference(data_sources: &[String]) -> MergePreference {
    PRODUCT_KEYS
        .iter()
        .map(|key| (key.to_string(), data_sources.to_vec()))
        .collect()
}

/// True for `null`, an empty string, or an empty list/map — the values a
/// merge should skip over in favor of the next source in line.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::List(list)) => list.is_empty(),
        Some(Value::Map(map)) => map.is_empty(),
        Some(_) => false,
    }
}

/// Merges one product's fields across sources: `data_from_sources` maps
/// source name to that source's product at the same index; for each field
/// in `preference`, the first source (in preference order) with a non-empty
/// value wins. Returns the merged product plus which source won each field.
pub fn merge_product(data_from_sources: &HashMap<String, AttrMap>, preference: &MergePreference) -> (AttrMap, HashMap<String, String>) {
    let mut merged = AttrMap::new();
    let mut field_sources = HashMap::new();

    for (field, sources) in preference {
        for source in sources {
            let value = data_from_sources.get(source).and_then(|product| product.get(field));
            if !is_empty_value(value) {
                merged.insert(field.clone(), value.unwrap().clone());
                field_sources.insert(field.clone(), source.clone());
                break;
            }
        }
    }

    (merged, field_sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(fields: &[(&str, Value)]) -> AttrMap {
        fields.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn is_empty_value_treats_blank_string_and_empty_list_as_empty() {
        assert!(is_empty_value(None));
        assert!(is_empty_value(Some(&Value::String(String::new()))));
        assert!(is_empty_value(Some(&Value::List(Vec::new()))));
        assert!(!is_empty_value(Some(&Value::String("x".into()))));
    }

    #[test]
    fn merge_product_takes_first_non_empty_source_in_preference_order() {
        let wrapper = product(&[("name", Value::String("Wrapper Name".into())), ("brand", Value::String(String::new()))]);
        let m101 = product(&[("name", Value::String("M101 Name".into())), ("brand", Value::String("Acme".into()))]);

        let mut data = HashMap::new();
        data.insert("WRAPPER".to_string(), wrapper);
        data.insert("M101".to_string(), m101);

        let mut preference = MergePreference::new();
        preference.insert("name".into(), vec!["WRAPPER".into(), "M101".into()]);
        preference.insert("brand".into(), vec!["WRAPPER".into(), "M101".into()]);

        let (merged, field_sources) = merge_product(&data, &preference);
        assert_eq!(merged.get("name").and_then(Value::as_str), Some("Wrapper Name"));
        assert_eq!(merged.get("brand").and_then(Value::as_str), Some("Acme"));
        assert_eq!(field_sources.get("brand").map(String::as_str), Some("M101"));
    }

    #[test]
    fn default_merge_preference_covers_every_product_key() {
        let sources = vec!["WRAPPER".to_string(), "M101".to_string()];
        let preference = default_merge_preference(&sources);
        assert_eq!(preference.len(), PRODUCT_KEYS.len());
        assert_eq!(preference.get("name"), Some(&sources));
    }
}
