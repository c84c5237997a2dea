//! CASCADE (sequential) and MERGE_ALL (concurrent) orchestration across
//! several `Source` backends, followed by the per-product field merge.

use crate::preference::{default_merge_preference, merge_product, MergePreference};
use productcrawl_sources::Source;
use productcrawl_types::{AttrMap, CrawlError, CrawlErrorCode, SourceInvocationSample, Workflow};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// The wrapper source carries one product per URL position (variations are
/// positional); every other source returns a single product that's repeated
/// against each wrapper position.
pub const WRAPPER_SOURCE: &str = "WRAPPER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Stop at the first source that produces data; merge only kicks in if
    /// more than one source ends up contributing (rare: a wrapper source
    /// that itself calls out to a secondary source mid-extraction).
    Cascade,
    /// Run every source concurrently and merge field-by-field regardless.
    MergeAll,
}

impl MergeMode {
    pub fn from_job_param(merge_mode: Option<&str>) -> Self {
        match merge_mode {
            Some("MERGE_ALL") => MergeMode::MergeAll,
            _ => MergeMode::Cascade,
        }
    }
}

fn is_terminal_stop(code: CrawlErrorCode) -> bool {
    matches!(code, CrawlErrorCode::NotProductPage | CrawlErrorCode::DoesNotExist)
}

/// Entry point from the executor: runs `sources` in `mode`, leaving the
/// merged (or single-source) result in `workflow.products`. `preference`
/// overrides the default same-order-for-every-field preference when the job
/// configured one.
pub async fn merge(
    sources: &[(String, Arc<dyn Source>)],
    mode: MergeMode,
    url: &str,
    workflow: &mut Workflow,
    preference: Option<&MergePreference>,
) -> Result<(), CrawlError> {
    match mode {
        MergeMode::MergeAll => merge_concurrent(sources, url, workflow, preference).await,
        MergeMode::Cascade => merge_sequential(sources, url, workflow, preference).await,
    }
}

async fn merge_sequential(sources: &[(String, Arc<dyn Source>)], url: &str, workflow: &mut Workflow, preference: Option<&MergePreference>) -> Result<(), CrawlError> {
    let mut data: HashMap<String, Vec<AttrMap>> = HashMap::new();

    for (name, source) in sources {
        let started = Instant::now();
        let can_extract = match source.request(url, workflow).await {
            Ok(can_extract) => can_extract,
            Err(err) if is_terminal_stop(err.code) => {
                record_source_sample(workflow, name, source.last_error_code(), started);
                workflow.fail(&err);
                return Err(err);
            }
            Err(_) => false,
        };

        if !can_extract {
            record_source_sample(workflow, name, source.last_error_code(), started);
            continue;
        }

        if let Err(err) = source.extract(url, workflow).await {
            record_source_sample(workflow, name, source.last_error_code(), started);
            if is_terminal_stop(err.code) {
                workflow.fail(&err);
                return Err(err);
            }
            continue;
        }

        if !workflow.products.is_empty() {
            source.normalize(workflow);
            data.insert(name.clone(), workflow.products.clone());
            workflow.extraction_data_source = Some(name.clone());
            record_source_sample(workflow, name, source.last_error_code(), started);
            // Stop after the first source that actually produced data, to
            // avoid paying for other sources' network calls.
            break;
        }
        record_source_sample(workflow, name, source.last_error_code(), started);
    }

    if data.len() > 1 {
        let data_sources: Vec<String> = sources.iter().map(|(name, _)| name.clone()).collect();
        apply_merge(&data, &data_sources, workflow, preference);
    }

    Ok(())
}

/// Overwrites `workflow.last_source_sample` with this source's outcome.
/// Each cascade iteration calls this once, so by the time the loop ends
/// only the last source visited is left on the workflow — "last code seen
/// wins" for whatever the caller reports upstream.
fn record_source_sample(workflow: &mut Workflow, source_name: &str, error_code: Option<String>, started: Instant) {
    workflow.last_source_sample = Some(SourceInvocationSample {
        source: source_name.to_string(),
        code: error_code.unwrap_or_default(),
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
    });
}

async fn merge_concurrent(sources: &[(String, Arc<dyn Source>)], url: &str, workflow: &mut Workflow, preference: Option<&MergePreference>) -> Result<(), CrawlError> {
    let tasks = sources.iter().map(|(name, source)| {
        let name = name.clone();
        let source = Arc::clone(source);
        let mut task_workflow = workflow.clone();
        let url = url.to_string();
        async move {
            let can_extract = source.request(&url, &mut task_workflow).await.unwrap_or(false);
            if !can_extract {
                return None;
            }
            if source.extract(&url, &mut task_workflow).await.is_err() {
                return None;
            }
            source.normalize(&mut task_workflow);
            Some((name, task_workflow.products))
        }
    });

    let data: HashMap<String, Vec<AttrMap>> = futures::future::join_all(tasks).await.into_iter().flatten().collect();
    if data.is_empty() {
        return Ok(());
    }

    workflow.data_sources = data.keys().cloned().collect();
    let data_sources: Vec<String> = sources.iter().map(|(name, _)| name.clone()).collect();
    apply_merge(&data, &data_sources, workflow, preference);

    Ok(())
}

/// Picks the source with the most products, builds a per-position field map
/// across every source (non-wrapper sources repeat their single product at
/// every position), and merges each position according to `preference`
/// (falling back to the default every-field-same-order preference when the
/// job didn't configure one).
fn apply_merge(data: &HashMap<String, Vec<AttrMap>>, data_sources: &[String], workflow: &mut Workflow, preference: Option<&MergePreference>) {
    let default_preference;
    let preference: &MergePreference = match preference {
        Some(p) => p,
        None => {
            default_preference = default_merge_preference(data_sources);
            &default_preference
        }
    };
    let Some(max_source) = get_max_length_key(data) else { return };
    let positions = data[&max_source].len();

    let mut merged_products = Vec::with_capacity(positions);
    for i in 0..positions {
        let mut position_fields: HashMap<String, AttrMap> = HashMap::new();
        for (source, products) in data {
            let idx = if source == WRAPPER_SOURCE { i } else { 0 };
            if let Some(product) = products.get(idx) {
                position_fields.insert(source.clone(), product.clone());
            }
        }
        let (merged, _field_sources) = merge_product(&position_fields, preference);
        merged_products.push(merged);
    }

    workflow.products = merged_products;
}

/// Returns the source name with the most products; ties keep the last one
/// seen (a `>=` comparison over an unordered map of counts).
fn get_max_length_key(data: &HashMap<String, Vec<AttrMap>>) -> Option<String> {
    data.iter().fold(None, |best, (name, products)| match &best {
        Some((_, best_len)) if *best_len > products.len() => best,
        _ => Some((name.clone(), products.len())),
    }).map(|(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use productcrawl_types::{JobParams, Value};

    struct StubSource {
        name: String,
        product_name: String,
    }

    #[async_trait]
    impl Source for StubSource {
        fn name(&self) -> &str {
            &self.name
        }
        fn last_error_code(&self) -> Option<String> {
            None
        }
        async fn request(&self, _url: &str, _workflow: &mut Workflow) -> Result<bool, CrawlError> {
            Ok(true)
        }
        async fn extract(&self, _url: &str, workflow: &mut Workflow) -> Result<(), CrawlError> {
            let mut product = AttrMap::new();
            product.insert("name".into(), Value::String(self.product_name.clone()));
            workflow.products = vec![product];
            Ok(())
        }
    }

    fn new_workflow() -> Workflow {
        Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000)
    }

    #[tokio::test]
    async fn cascade_stops_after_first_source_with_products() {
        let sources: Vec<(String, Arc<dyn Source>)> = vec![
            ("WRAPPER".into(), Arc::new(StubSource { name: "WRAPPER".into(), product_name: "wrapper item".into() })),
            ("M101".into(), Arc::new(StubSource { name: "M101".into(), product_name: "m101 item".into() })),
        ];
        let mut wf = new_workflow();
        merge(&sources, MergeMode::Cascade, "http://example.com/p1", &mut wf, None).await.unwrap();
        assert_eq!(wf.products.len(), 1);
        assert_eq!(wf.products[0].get("name").and_then(Value::as_str), Some("wrapper item"));
        assert_eq!(wf.extraction_data_source.as_deref(), Some("WRAPPER"));
        assert_eq!(wf.last_source_sample.as_ref().map(|s| s.source.as_str()), Some("WRAPPER"));
    }

    #[tokio::test]
    async fn explicit_merge_preference_overrides_default_source_order() {
        let mut wf = new_workflow();
        let mut data = HashMap::new();
        data.insert("WRAPPER".to_string(), vec![{
            let mut p = AttrMap::new();
            p.insert("name".into(), Value::String("wrapper item".into()));
            p
        }]);
        data.insert("M101".to_string(), vec![{
            let mut p = AttrMap::new();
            p.insert("name".into(), Value::String("m101 item".into()));
            p
        }]);
        let mut preference = MergePreference::new();
        preference.insert("name".into(), vec!["M101".into(), "WRAPPER".into()]);
        apply_merge(&data, &["WRAPPER".to_string(), "M101".to_string()], &mut wf, Some(&preference));
        assert_eq!(wf.products[0].get("name").and_then(Value::as_str), Some("m101 item"));
    }

    #[test]
    fn merge_mode_reads_merge_all_from_job_param() {
        assert_eq!(MergeMode::from_job_param(Some("MERGE_ALL")), MergeMode::MergeAll);
        assert_eq!(MergeMode::from_job_param(None), MergeMode::Cascade);
    }

    #[test]
    fn get_max_length_key_picks_longest_products_list() {
        let mut data = HashMap::new();
        data.insert("WRAPPER".to_string(), vec![AttrMap::new(), AttrMap::new()]);
        data.insert("M101".to_string(), vec![AttrMap::new()]);
        assert_eq!(get_max_length_key(&data), Some("WRAPPER".to_string()));
    }
}
