//! Backward walk used to find the most recent published value.

use chrono::NaiveDate;
use log::{debug, error, warn};
use std::future::Future;

use crate::errors::{IndicatorError, Result};
use crate::models::indicator::Observation;
use crate::util;

/// Distance between consecutive probe dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStep {
    Daily,
    Monthly,
}

impl ProbeStep {
    pub fn previous(&self, date: NaiveDate) -> NaiveDate {
        match self {
            ProbeStep::Daily => date.pred_opt().unwrap_or(date),
            ProbeStep::Monthly => util::add_months(date, -1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePolicy {
    pub max_tries: usize,
    pub step: ProbeStep,
}

impl ProbePolicy {
    pub const fn daily(max_tries: usize) -> Self {
        Self {
            max_tries,
            step: ProbeStep::Daily,
        }
    }

    pub const fn monthly(max_tries: usize) -> Self {
        Self {
            max_tries,
            step: ProbeStep::Monthly,
        }
    }
}

/// Calls `fetch` for `start`, then for earlier dates, until a non-blank record shows up.
///
/// At most `policy.max_tries` calls are made, strictly one after another. A probe that
/// errors or yields nothing counts as "not published on that date".
pub async fn probe_latest<T, F, Fut>(
    indicator: &str,
    start: NaiveDate,
    policy: ProbePolicy,
    mut fetch: F,
) -> Result<T>
where
    T: Observation,
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let mut date = start;
    for attempt in 1..=policy.max_tries {
        match fetch(date).await {
            Ok(Some(record)) if !record.is_blank() => {
                debug!("Found {} for {} on attempt {}", indicator, date, attempt);
                return Ok(record);
            }
            Ok(_) => debug!("No {} published for {}", indicator, date),
            Err(e) => warn!("Probe for {} on {} failed: {}", indicator, date, e),
        }
        date = policy.step.previous(date);
    }

    error!(
        "No {} found in {} probes starting {}",
        indicator, policy.max_tries, start
    );
    Err(IndicatorError::NotFound)
}
