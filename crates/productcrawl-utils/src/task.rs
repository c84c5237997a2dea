//! Discovery task parse/format round trip: a task string is `op;url` or
//! `crawl_<link_type>;url`, and occasionally a bare URL.

use once_cell::sync::Lazy;
use regex::Regex;

static TAGGED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(crawl)_(\w+);(.*)$").unwrap());
static PREFIXED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(api|crawl|sitemap);(.*)$").unwrap());
static BARE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(https?://.*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTask {
    pub op: String,
    pub link_type: Option<String>,
    pub url: String,
}

/// Parses a discovery task into `(op, link_type, url)`. Returns `None` when
/// the task is neither a tagged/prefixed task nor a bare URL.
pub fn parse_task(task: &str) -> Option<ParsedTask> {
    if let Some(caps) = TAGGED.captures(task) {
        return Some(ParsedTask {
            op: caps[1].to_string(),
            link_type: Some(caps[2].to_string()),
            url: caps[3].to_string(),
        });
    }
    if let Some(caps) = PREFIXED.captures(task) {
        return Some(ParsedTask {
            op: caps[1].to_string(),
            link_type: None,
            url: caps[2].to_string(),
        });
    }
    if BARE_URL.is_match(task) && is_url(task) {
        return Some(ParsedTask {
            op: "crawl".to_string(),
            link_type: None,
            url: task.to_string(),
        });
    }
    None
}

/// Formats a task the way `parse_task` expects to read it back. Bare `op`
/// values round-trip through the prefixed form (`op;url`); tagged link types
/// use the `crawl_<link_type>;url` form.
pub fn format_task(op: &str, link_type: Option<&str>, url: &str) -> String {
    match link_type {
        Some(lt) => format!("crawl_{lt};{url}"),
        None => format!("{op};{url}"),
    }
}

pub fn is_url(s: &str) -> bool {
    (s.starts_with("http://") || s.starts_with("https://")) && s.len() >= 7 && s.len() <= 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_task() {
        let parsed = parse_task("crawl_bestsellers;http://example.com/b").unwrap();
        assert_eq!(parsed.op, "crawl");
        assert_eq!(parsed.link_type.as_deref(), Some("bestsellers"));
        assert_eq!(parsed.url, "http://example.com/b");
    }

    #[test]
    fn parses_prefixed_task() {
        let parsed = parse_task("sitemap;http://example.com/sitemap.xml").unwrap();
        assert_eq!(parsed.op, "sitemap");
        assert_eq!(parsed.link_type, None);
    }

    #[test]
    fn parses_bare_url_as_crawl() {
        let parsed = parse_task("http://example.com/p1").unwrap();
        assert_eq!(parsed.op, "crawl");
        assert_eq!(parsed.url, "http://example.com/p1");
    }

    #[test]
    fn round_trip_for_prefixed_tasks() {
        for op in ["crawl", "sitemap", "api"] {
            let task = format_task(op, None, "http://example.com/x");
            let parsed = parse_task(&task).unwrap();
            assert_eq!(parsed.op, op);
            assert_eq!(parsed.url, "http://example.com/x");
        }
    }
}
