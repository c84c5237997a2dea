//! Proxy-service request payload construction: assembles the JSON body
//! the proxy router expects, including the crawlera-exclusive coin flip
//! and cache-directive injection.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

static RENDER_DIRECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)render:\d+;?").unwrap());
static RENDERING_ENGINE_DIRECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)rendering_engine:\w+;?").unwrap());

const CRAWLERA_EXCLUSIVE: &str = "crawlera_exclusive";

/// Body posted to `{PROXY_ROUTER_ADDR}/crawl/url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestPayload {
    pub url: String,
    pub domain: String,
    pub is_ajax: bool,
    pub priority: bool,
    pub tag: String,
    pub crumb: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub page_transforms: Vec<String>,
    #[serde(default)]
    pub pools: Vec<String>,
    pub sleep: u32,
    pub timeout: u32,
    pub request_policy: String,
    pub cookie: Option<String>,
}

/// Everything `construct_payload` needs that isn't already resolved
/// upstream (pools, policy, timeout are the caller's job, handed to the
/// fetch loop by the pool-selection and job-param layers).
pub struct PayloadInputs<'a> {
    pub url: &'a str,
    pub domain: &'a str,
    pub job_type: &'a str,
    pub is_ajax: bool,
    pub priority: bool,
    pub crumb: Option<String>,
    pub headers: HashMap<String, String>,
    pub page_transforms: Vec<String>,
    pub pools: Vec<String>,
    pub sleep: u32,
    pub timeout: u32,
    pub request_policy: String,
    pub cookie: Option<String>,
    pub cache_key: Option<&'a str>,
    pub cache_expiry: Option<i64>,
    pub cache_event: Option<&'a str>,
}

/// Builds the request payload, applying the crawlera-exclusive coin flip and
/// appending cache directives to the request policy.
pub fn construct_payload(inputs: PayloadInputs<'_>) -> RequestPayload {
    let mut pools = inputs.pools;
    let mut request_policy = inputs.request_policy;

    apply_crawlera_exclusive_coin_flip(&mut pools, &mut request_policy);
    append_cache_directives(&mut request_policy, inputs.cache_key, inputs.cache_expiry, inputs.cache_event);

    RequestPayload {
        url: inputs.url.trim_end_matches('\n').to_string(),
        domain: inputs.domain.to_string(),
        is_ajax: inputs.is_ajax,
        priority: inputs.priority,
        tag: inputs.job_type.to_string(),
        crumb: inputs.crumb,
        headers: inputs.headers,
        page_transforms: inputs.page_transforms,
        pools,
        sleep: inputs.sleep,
        timeout: inputs.timeout,
        request_policy,
        cookie: inputs.cookie,
    }
}

/// 50/50: either drop `crawlera_exclusive` from the pool list, or strip the
/// render directives from the policy and keep the pool (rendering through
/// crawlera itself instead of a render-capable pool).
fn apply_crawlera_exclusive_coin_flip(pools: &mut Vec<String>, request_policy: &mut String) {
    if !pools.iter().any(|p| p == CRAWLERA_EXCLUSIVE) {
        return;
    }

    let drop_pool = rand::thread_rng().gen_range(0..100) < 50;
    if drop_pool {
        pools.retain(|p| p != CRAWLERA_EXCLUSIVE);
    } else {
        *request_policy = RENDER_DIRECTIVE.replace_all(request_policy, "").into_owned();
        *request_policy = RENDERING_ENGINE_DIRECTIVE.replace_all(request_policy, "").into_owned();
    }
}

fn append_cache_directives(
    request_policy: &mut String,
    cache_key: Option<&str>,
    cache_expiry: Option<i64>,
    cache_event: Option<&str>,
) {
    if let Some(key) = cache_key {
        request_policy.push_str(&format!("cache_key:{key};cache_expiry:{};", cache_expiry.unwrap_or(0)));
    }
    if let Some(event) = cache_event {
        request_policy.push_str(&format!("cache_event:{event};"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> PayloadInputs<'static> {
        PayloadInputs {
            url: "http://example.com/p1",
            domain: "example.com",
            job_type: "recrawl",
            is_ajax: false,
            priority: false,
            crumb: None,
            headers: HashMap::new(),
            page_transforms: Vec::new(),
            pools: vec!["default".into()],
            sleep: 0,
            timeout: 30,
            request_policy: String::new(),
            cookie: None,
            cache_key: None,
            cache_expiry: None,
            cache_event: None,
        }
    }

    #[test]
    fn strips_trailing_newline_from_url() {
        let mut inputs = base_inputs();
        inputs.url = "http://example.com/p1\n";
        let payload = construct_payload(inputs);
        assert_eq!(payload.url, "http://example.com/p1");
    }

    #[test]
    fn cache_directives_are_appended_to_policy() {
        let mut inputs = base_inputs();
        inputs.cache_key = Some("ce/recrawl/example_com/abc");
        inputs.cache_expiry = Some(3600);
        let payload = construct_payload(inputs);
        assert!(payload.request_policy.contains("cache_key:ce/recrawl/example_com/abc;"));
        assert!(payload.request_policy.contains("cache_expiry:3600;"));
    }

    #[test]
    fn crawlera_exclusive_coin_flip_either_drops_pool_or_strips_render() {
        for _ in 0..50 {
            let mut pools = vec!["crawlera_exclusive".to_string()];
            let mut policy = "render:1;rendering_engine:chrome;".to_string();
            apply_crawlera_exclusive_coin_flip(&mut pools, &mut policy);
            let dropped = pools.is_empty();
            let stripped = !policy.contains("render:1") && !policy.contains("rendering_engine");
            assert!(dropped || (stripped && pools.contains(&"crawlera_exclusive".to_string())));
        }
    }

    #[test]
    fn non_crawlera_pools_are_left_untouched() {
        let mut pools = vec!["default".to_string()];
        let mut policy = "render:1;".to_string();
        apply_crawlera_exclusive_coin_flip(&mut pools, &mut policy);
        assert_eq!(pools, vec!["default".to_string()]);
        assert_eq!(policy, "render:1;".to_string());
    }
}
