//! Batched metadata retrieval
//!
//! The catalog API caps how many ids one request may carry, so the id list
//! is cut into consecutive chunks and fetched one chunk at a time.

use crate::error::PipelineError;
use std::future::Future;

/// Default number of event ids per metadata request
pub const DEFAULT_BATCH_SIZE: usize = 300;

/// Fetch records for `ids` in consecutive batches of at most `batch_size`
///
/// - `fetch` is awaited once per batch, strictly in sequence
/// - results are concatenated in batch order
/// - no ids means no calls and an empty result
/// - the first failing batch aborts the whole fetch; nothing partial is
///   returned
pub async fn fetch_in_batches<R, F, Fut>(
    ids: &[String],
    batch_size: usize,
    mut fetch: F,
) -> Result<Vec<R>, PipelineError>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<R>, PipelineError>>,
{
    if batch_size == 0 {
        return Err(PipelineError::Config("batch size must be > 0".to_string()));
    }

    let total_batches = ids.len().div_ceil(batch_size);
    let mut results = Vec::new();

    for (i, batch) in ids.chunks(batch_size).enumerate() {
        log::debug!(
            "📥 Fetching metadata batch {}/{} ({} ids)",
            i + 1,
            total_batches,
            batch.len()
        );
        let records = fetch(batch.to_vec()).await?;
        results.extend(records);
    }

    Ok(results)
}
