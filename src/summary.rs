use crate::types::{SimulationSummary, StakerScore};

const TOP_DECILE: f64 = 0.1;

/// Population statistics over scores already sorted by allocation, descending.
pub fn summarize(scores: &[StakerScore], total_tokens: f64) -> SimulationSummary {
    if scores.is_empty() {
        return SimulationSummary::default();
    }

    let allocations: Vec<f64> = scores.iter().map(|s| s.allocation).collect();
    let top_k = top_decile_count(allocations.len());
    let top_sum: f64 = allocations.iter().take(top_k).sum();

    SimulationSummary {
        eligible_count: scores.len(),
        total_distributed: allocations.iter().sum(),
        top10_pct_concentration: if total_tokens > 0.0 {
            top_sum / total_tokens * 100.0
        } else {
            0.0
        },
        median_allocation: median(&allocations),
        max_allocation: allocations[0],
        min_allocation: allocations[allocations.len() - 1],
    }
}

/// `max(1, ceil(0.1 * n))`
pub fn top_decile_count(n: usize) -> usize {
    ((n as f64 * TOP_DECILE).ceil() as usize).max(1)
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
