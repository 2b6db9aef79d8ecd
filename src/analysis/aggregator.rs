//! Client-side feedback aggregation.
//!
//! Turns raw feedback records into the same per-key statistics the store
//! returns from its pre-aggregated endpoint.

use crate::models::{ExperimentStats, FeedbackStats};
use crate::store::{FeedbackRecord, RawFeedback};
use std::collections::BTreeMap;

/// Aggregate feedback records per key.
///
/// Records without a numeric score are ignored, so a key only appears once it
/// has at least one score.
pub fn aggregate_feedback(records: &[FeedbackRecord]) -> BTreeMap<String, FeedbackStats> {
    let mut sums: BTreeMap<String, (f64, u64)> = BTreeMap::new();

    for record in records {
        if let Some(score) = record.numeric_score() {
            let entry = sums.entry(record.key.clone()).or_default();
            entry.0 += score;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(key, (sum, count))| {
            let avg = (count > 0).then(|| sum / count as f64);
            (key, FeedbackStats { avg, count })
        })
        .collect()
}

/// Build experiment statistics from raw runs and feedback.
pub fn stats_from_raw(raw: &RawFeedback) -> ExperimentStats {
    ExperimentStats {
        run_count: raw.run_count,
        feedback: aggregate_feedback(&raw.records),
    }
}
