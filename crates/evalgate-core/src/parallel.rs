//! Concurrent per-case evaluation.
//!
//! Cases share no state, so each one runs on a blocking tokio worker. The
//! number of cases in flight is bounded by a semaphore. Results come back
//! in completion order and are re-sorted into catalog order before anything
//! downstream sees them; aggregation stays a single-writer fold. Workers
//! re-enter the caller's span so their events keep the run's fields.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::catalog::{Catalog, OutputSet};
use crate::domain::{CaseResult, EvalError, Result};
use crate::engine::{evaluate_case, CaseOptions};

/// Evaluate the catalog cases at `selected` with at most `workers` in flight.
///
/// The returned results follow the order of `selected`.
pub async fn evaluate_concurrently(
    catalog: Arc<Catalog>,
    outputs: Arc<OutputSet>,
    selected: &[usize],
    options: CaseOptions,
    workers: usize,
) -> Result<Vec<CaseResult>> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut tasks = JoinSet::new();
    let span = tracing::Span::current();

    for (slot, &index) in selected.iter().enumerate() {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| EvalError::Join(e.to_string()))?;
        let catalog = Arc::clone(&catalog);
        let outputs = Arc::clone(&outputs);
        let span = span.clone();

        tasks.spawn_blocking(move || {
            let _permit = permit;
            let _entered = span.enter();
            let result = evaluate_case(&catalog, &outputs, index, options);
            (slot, result)
        });
    }

    let mut finished = Vec::with_capacity(selected.len());
    while let Some(joined) = tasks.join_next().await {
        let (slot, result) = joined.map_err(|e| EvalError::Join(e.to_string()))?;
        debug!(case_id = %result.case_id, slot = slot, "worker joined");
        finished.push((slot, result));
    }

    finished.sort_by_key(|(slot, _)| *slot);
    Ok(finished.into_iter().map(|(_, result)| result).collect())
}
