//! Time-decay weighting of the reference corpus
//!
//! Recently added library items say more about current interests. The
//! corpus is ordered newest first and item `i` gets weight
//! `1 / (1 + log10(i + 1))`, normalised so the weights sum to one.

use arxiv_digest_common::ReferencePaper;
use std::cmp::Ordering;

/// Corpus ordered newest first; undated papers last, ties by key
pub fn order_corpus(corpus: &[ReferencePaper]) -> Vec<&ReferencePaper> {
    let mut ordered: Vec<&ReferencePaper> = corpus.iter().collect();
    ordered.sort_by(|a, b| {
        let by_date = match (a.date_added, b.date_added) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_date
            .then_with(|| a.key.cmp(&b.key))
            .then_with(|| a.abstract_text.cmp(&b.abstract_text))
    });
    ordered
}

/// Normalised decay weights for `n` ordered papers
pub fn decay_weights(n: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..n)
        .map(|i| 1.0 / (1.0 + ((i + 1) as f64).log10()))
        .collect();
    let total: f64 = raw.iter().sum();

    if total > 0.0 {
        raw.into_iter().map(|w| w / total).collect()
    } else {
        raw
    }
}
