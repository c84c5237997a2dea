//! `BatchProcessItems`: chunk a list of strings and run a fallible step over
//! each chunk, logging and continuing past a failed chunk rather than
//! aborting the whole list.

use tracing::warn;

/// Batch size drops to 50 once the input is large enough (>= 1500 items) to
/// keep individual downstream calls (KV lookups, job-server loads) small.
fn effective_batch_size(total: usize, requested: usize) -> usize {
    if total >= 1500 {
        50
    } else {
        requested
    }
}

/// Runs `f` over successive chunks of `items`. A chunk whose call fails is
/// logged and skipped; processing continues with the next chunk.
pub fn batch_process_items<F>(items: &[String], batch_size: usize, mut f: F)
where
    F: FnMut(&[String]) -> Result<(), String>,
{
    let total = items.len();
    if total == 0 {
        return;
    }
    let size = effective_batch_size(total, batch_size).max(1);
    for (i, chunk) in items.chunks(size).enumerate() {
        if let Err(err) = f(chunk) {
            warn!(batch = i + 1, %err, "batch processing failed");
            continue;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processes_every_item_across_chunks() {
        let items: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        let mut seen = Vec::new();
        batch_process_items(&items, 3, |chunk| {
            seen.extend_from_slice(chunk);
            Ok(())
        });
        assert_eq!(seen, items);
    }

    #[test]
    fn continues_past_a_failed_chunk() {
        let items: Vec<String> = (0..4).map(|i| i.to_string()).collect();
        let mut calls = 0;
        batch_process_items(&items, 2, |_chunk| {
            calls += 1;
            if calls == 1 {
                Err("boom".to_string())
            } else {
                Ok(())
            }
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn large_inputs_use_smaller_batch_size() {
        assert_eq!(effective_batch_size(2000, 25), 50);
        assert_eq!(effective_batch_size(10, 25), 25);
    }
}
