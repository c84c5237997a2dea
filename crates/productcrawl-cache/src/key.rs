//! Cache folder/TTL policy. Key *construction* (the MD5-hashed canonical
//! config) lives in `productcrawl_utils::cache_key`; this module only holds
//! the folder convention and default expiry.

pub use productcrawl_utils::cache_key::{construct_cache_id, CacheKeyConfig};

/// Default folder for supervised/commercial sources.
pub const DEFAULT_FOLDER: &str = "ce";
/// Folder unsupervised sources write their raw HTML fetch under.
pub const UNSUPERVISED_FOLDER: &str = "uce";

/// Default cache TTL when a job doesn't override it: one hour.
pub const DEFAULT_TTL_SECS: i64 = 60 * 60;

/// Resolves the effective TTL: the job's `cache_ttl` if set and positive,
/// else the one-hour default. A zero or negative TTL from job params
/// disables expiry checking entirely.
pub fn effective_ttl_secs(job_cache_ttl: Option<i64>) -> Option<i64> {
    match job_cache_ttl {
        Some(0) => None,
        Some(ttl) if ttl < 0 => None,
        Some(ttl) => Some(ttl),
        None => Some(DEFAULT_TTL_SECS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_disables_expiry() {
        assert_eq!(effective_ttl_secs(Some(0)), None);
    }

    #[test]
    fn missing_ttl_falls_back_to_default() {
        assert_eq!(effective_ttl_secs(None), Some(DEFAULT_TTL_SECS));
    }

    #[test]
    fn positive_ttl_passes_through() {
        assert_eq!(effective_ttl_secs(Some(120)), Some(120));
    }
}
