//! Cache-key derivation: a hash of the canonical JSON of the
//! request-identifying fields, laid out under a folder/job-type/site path.

use md5::{Digest, Md5};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheKeyConfig {
    pub url: String,
    pub domain: String,
    pub headers: BTreeMap<String, String>,
    pub request_policy: String,
    pub cookie: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Marshals `cfg` to JSON with its keys in a stable (`BTreeMap`) order so
/// the hash is independent of map iteration order, then MD5-hashes it.
fn canonical_hash(cfg: &CacheKeyConfig) -> String {
    let canonical = serde_json::to_string(cfg).expect("CacheKeyConfig always serializes");
    let mut hasher = Md5::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// `<cache_folder>/<job_type>/<site_with_dots_underscored>/<md5hex>`.
/// Default folder is `ce`; unsupervised extraction writes under `uce`.
pub fn construct_cache_id(folder: &str, job_type: &str, site: &str, cfg: &CacheKeyConfig) -> String {
    let site_key = site.replace('.', "_");
    let hash = canonical_hash(cfg);
    format!("{folder}/{job_type}/{site_key}/{hash}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_id_is_stable_for_identical_config() {
        let cfg = CacheKeyConfig {
            url: "http://example.com/p1".into(),
            domain: "example.com".into(),
            request_policy: "render:1;".into(),
            cookie: "session=abc".into(),
            ..Default::default()
        };
        let a = construct_cache_id("ce", "recrawl", "example.com", &cfg);
        let b = construct_cache_id("ce", "recrawl", "example.com", &cfg);
        assert_eq!(a, b);
        assert!(a.starts_with("ce/recrawl/example_com/"));
    }

    #[test]
    fn cache_id_independent_of_header_insertion_order() {
        let mut cfg_a = CacheKeyConfig { url: "u".into(), ..Default::default() };
        cfg_a.headers.insert("A".into(), "1".into());
        cfg_a.headers.insert("B".into(), "2".into());

        let mut cfg_b = CacheKeyConfig { url: "u".into(), ..Default::default() };
        cfg_b.headers.insert("B".into(), "2".into());
        cfg_b.headers.insert("A".into(), "1".into());

        assert_eq!(canonical_hash(&cfg_a), canonical_hash(&cfg_b));
    }
}
