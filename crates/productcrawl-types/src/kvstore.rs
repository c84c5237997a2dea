//! The "rdstore" record: the canonical record of which parent/child
//! identifiers are already indexed for a site.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariationRecord {
    pub child_identifier: String,
    pub last_crawl_time: Option<i64>,
    pub offers_count: i32,
    pub is_active: bool,
    pub skus_only: bool,
}

/// "rdstore data": site, parent-identifier, canonical URL, force-discover
/// flag, discontinued flag + counter, variations, crumb, never-canonicalized
/// URL, recrawl frequency tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KvRecord {
    pub site: String,
    pub parent_identifier: String,
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub force_discover: bool,
    #[serde(default)]
    pub discontinued: bool,
    #[serde(default)]
    pub discontinued_count: i32,
    #[serde(default)]
    pub variations: Vec<VariationRecord>,
    pub crumb: Option<String>,
    pub never_canonicalized_url: Option<String>,
    pub recrawl_frequency: Option<String>,
}

impl KvRecord {
    pub fn variation(&self, child_identifier: &str) -> Option<&VariationRecord> {
        self.variations
            .iter()
            .find(|v| v.child_identifier == child_identifier)
    }

    pub fn known_child_identifiers(&self) -> impl Iterator<Item = &str> {
        self.variations.iter().map(|v| v.child_identifier.as_str())
    }
}

/// The request sent to the KV store after a successful recrawl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RdstoreUpdateRequest {
    pub site: String,
    pub parent_identifier: String,
    pub crumb: Option<String>,
    pub never_canonicalized_url: Option<String>,
    pub force_discover: bool,
    pub variations: Vec<VariationRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variation_lookup_by_child_identifier() {
        let rec = KvRecord {
            variations: vec![VariationRecord {
                child_identifier: "c1".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(rec.variation("c1").is_some());
        assert!(rec.variation("c2").is_none());
    }
}
