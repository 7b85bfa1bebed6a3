//! Source filtering and de-duplication for display.

use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::event::SourceRef;

/// Keep sources scoring at least `threshold`, best first.
///
/// Without a threshold every source is kept, unscored ones included. With a
/// threshold, unscored sources are dropped since they cannot meet it. The
/// sort is stable, unscored entries go last.
pub fn filter_sources(sources: &[SourceRef], threshold: Option<f64>) -> Vec<SourceRef> {
    sources
        .iter()
        .filter(|s| match (threshold, s.score) {
            (None, _) => true,
            (Some(min), Some(score)) => score >= min,
            (Some(_), None) => false,
        })
        .cloned()
        .sorted_by(|a, b| compare_scores(b.score, a.score))
        .collect()
}

/// Keep the first entry for every artifact, preserving order.
pub fn dedupe_by_artifact(sources: &[SourceRef]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|s| seen.insert(s.document_artifact.clone()))
        .cloned()
        .collect()
}

fn compare_scores(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
