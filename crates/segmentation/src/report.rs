//! Result assembly: coverage ratio and the human-readable summary.

use audience_core::types::StrategyResult;

use crate::selector::Selection;

pub const NO_ELIGIBLE_CLIENTS_MESSAGE: &str =
    "No clients match the selected filters, so no segments were created.";

pub fn coverage_ratio(covered: usize, total_population: usize) -> f64 {
    if total_population == 0 {
        0.0
    } else {
        covered as f64 / total_population as f64
    }
}

pub fn assemble(selection: Selection, total_population: usize) -> StrategyResult {
    let coverage = coverage_ratio(selection.covered.len(), total_population);
    let message = if total_population == 0 {
        None
    } else {
        Some(summary(selection.groups.len(), coverage))
    };

    StrategyResult {
        coverage_ratio: coverage,
        total_population,
        selected_client_ids: selection.covered,
        segments: selection.groups,
        message,
    }
}

/// Custom-mode result when the filter gate admits no client.
pub fn no_eligible_clients(total_population: usize) -> StrategyResult {
    StrategyResult::empty(
        total_population,
        Some(NO_ELIGIBLE_CLIENTS_MESSAGE.to_string()),
    )
}

fn summary(groups: usize, coverage: f64) -> String {
    let noun = if groups == 1 { "segment" } else { "segments" };
    format!(
        "Created {groups} {noun} covering {:.1}% of your clients",
        coverage * 100.0
    )
}
