//! Concurrent fan-out over scrape units, plus the ordering applied to merged results.

use futures::future::BoxFuture;
use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::errors::{IndicatorError, Result};
use crate::models::indicator::Observation;

/// One unit of scrape work, labelled for logging.
pub struct ScrapeJob<T> {
    pub label: String,
    pub task: BoxFuture<'static, Result<Vec<T>>>,
}

impl<T> ScrapeJob<T> {
    pub fn new(label: impl Into<String>, task: BoxFuture<'static, Result<Vec<T>>>) -> Self {
        Self {
            label: label.into(),
            task,
        }
    }
}

/// Runs every job on its own task and waits for all of them to report.
///
/// Nothing is cancelled early: when a unit fails the others still run to completion,
/// then the first error drained from the channel is returned and every batch is
/// discarded. On success the batches are concatenated in dispatch order, so the
/// merged length is the sum of the batch lengths.
pub async fn scatter_gather<T>(indicator: &str, jobs: Vec<ScrapeJob<T>>) -> Result<Vec<T>>
where
    T: Send + 'static,
{
    let unit_count = jobs.len();
    if unit_count == 0 {
        return Ok(Vec::new());
    }

    let (tx, mut rx) = mpsc::channel::<(usize, Result<Vec<T>>)>(unit_count);
    let mut labels = Vec::with_capacity(unit_count);

    for (index, job) in jobs.into_iter().enumerate() {
        debug!("Dispatching {} unit {}: {}", indicator, index, job.label);
        labels.push(job.label);
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = job.task.await;
            // capacity == unit_count, so this never waits
            let _ = tx.send((index, outcome)).await;
        });
    }
    drop(tx);

    let mut batches: Vec<Option<Vec<T>>> = (0..unit_count).map(|_| None).collect();
    let mut first_error: Option<IndicatorError> = None;
    let mut reported = 0;

    while reported < unit_count {
        let Some((index, outcome)) = rx.recv().await else {
            break;
        };
        reported += 1;
        match outcome {
            Ok(batch) => {
                debug!("{} unit {} returned {} records", indicator, labels[index], batch.len());
                batches[index] = Some(batch);
            }
            Err(e) => {
                warn!("{} unit {} failed: {}", indicator, labels[index], e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    if reported < unit_count {
        // a unit panicked before reporting; its sender was dropped
        return Err(IndicatorError::TaskError(format!(
            "{} of {} {} units terminated without reporting",
            unit_count - reported,
            unit_count,
            indicator
        )));
    }

    let merged: Vec<T> = batches.into_iter().flatten().flatten().collect();
    info!("Merged {} {} records from {} units", merged.len(), indicator, unit_count);
    Ok(merged)
}

/// Most recent first. `sort_by` is stable, so records sharing a date keep their merge order.
pub fn sort_by_date_desc<T: Observation>(records: &mut [T]) {
    records.sort_by(|a, b| b.date().cmp(&a.date()));
}

/// Keeps indices 0, n, 2n, ... of an already sorted sequence.
///
/// Used for the quinquennium view: with one record per year it approximates a
/// five-year spacing, but it samples positions, not calendar intervals.
pub fn every_nth<T>(records: Vec<T>, n: usize) -> Vec<T> {
    if n <= 1 {
        return records;
    }
    records.into_iter().step_by(n).collect()
}
