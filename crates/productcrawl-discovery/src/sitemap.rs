//! Sitemap XML parsing. A sitemap index (`<sitemapindex>`) and a plain
//! sitemap (`<urlset>`) both just carry a flat list of `<loc>` values, so
//! this walks the event stream once instead of round-tripping two distinct
//! struct shapes.

use productcrawl_types::{CrawlError, CrawlErrorCode};
use xml::reader::{EventReader, XmlEvent};

/// Extracts every `<loc>` text value from a sitemap or sitemap-index
/// document. Errors if the content isn't well-formed XML at all.
pub fn extract_sitemap_urls(content: &str) -> Result<Vec<String>, CrawlError> {
    let parser = EventReader::from_str(content);
    let mut locations = Vec::new();
    let mut in_loc = false;

    for event in parser {
        let event = event.map_err(|err| CrawlError::new(CrawlErrorCode::Other("SITEMAP_PARSE_FAILED"), err.to_string()))?;
        match event {
            XmlEvent::StartElement { name, .. } if name.local_name == "loc" => in_loc = true,
            XmlEvent::EndElement { name } if name.local_name == "loc" => in_loc = false,
            XmlEvent::Characters(text) if in_loc => locations.push(text),
            _ => {}
        }
    }

    Ok(locations)
}
