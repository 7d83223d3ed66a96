//! Deterministic ordering of scored candidates

use arxiv_digest_common::{CandidatePaper, ScoredCandidate};
use std::cmp::Ordering;

/// Scores closer than this compare equal
pub const SCORE_TOLERANCE: f64 = 1e-9;

/// Newer `published` first, then lower id
fn tie_break(a: &CandidatePaper, b: &CandidatePaper) -> Ordering {
    b.published
        .cmp(&a.published)
        .then_with(|| a.arxiv_id.cmp(&b.arxiv_id))
}

/// Sort and assign 1-based ranks
///
/// Candidates are sorted by score, then split into tie groups: a group
/// ends at the first score more than [`SCORE_TOLERANCE`] below the score
/// that opened it. Each group is ordered by the tie break.
pub fn order_scored(scored: Vec<(CandidatePaper, f64)>) -> Vec<ScoredCandidate> {
    let mut scored = scored;
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| tie_break(&a.0, &b.0)));

    let mut start = 0;
    while start < scored.len() {
        let head = scored[start].1;
        let end = scored[start..]
            .iter()
            .position(|(_, score)| head - score > SCORE_TOLERANCE)
            .map_or(scored.len(), |offset| start + offset);
        scored[start..end].sort_by(|a, b| tie_break(&a.0, &b.0));
        start = end;
    }

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (paper, score))| ScoredCandidate {
            paper,
            score,
            rank: i + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candidate(id: &str, day: u32) -> CandidatePaper {
        CandidatePaper::new(
            id,
            "Title",
            vec![],
            "Abstract",
            Utc.with_ymd_and_hms(2025, 2, day, 0, 0, 0).unwrap(),
            "",
        )
        .unwrap()
    }

    fn ids(ranked: &[ScoredCandidate]) -> Vec<&str> {
        ranked.iter().map(|s| s.paper.arxiv_id.as_str()).collect()
    }

    #[test]
    fn test_higher_score_first() {
        let ranked = order_scored(vec![
            (candidate("2502.00001", 1), 0.2),
            (candidate("2502.00002", 1), 0.8),
        ]);
        assert_eq!(ids(&ranked), vec!["2502.00002", "2502.00001"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn test_scores_within_tolerance_use_publication_date() {
        // The earlier paper has the marginally higher score
        let ranked = order_scored(vec![
            (candidate("2502.00001", 1), 0.500_000_000_1),
            (candidate("2502.00002", 3), 0.5),
        ]);
        assert_eq!(ids(&ranked), vec!["2502.00002", "2502.00001"]);
    }

    #[test]
    fn test_ties_do_not_depend_on_grid_alignment() {
        let ranked = order_scored(vec![
            (candidate("2502.00001", 1), 0.500_000_000_6),
            (candidate("2502.00002", 3), 0.500_000_000_4),
        ]);
        assert_eq!(ids(&ranked), vec!["2502.00002", "2502.00001"]);
    }

    #[test]
    fn test_tie_group_is_measured_from_its_highest_score() {
        // 00003 is within tolerance of 00002 but not of 00001, which opens the group
        let ranked = order_scored(vec![
            (candidate("2502.00001", 1), 0.500_000_001_5),
            (candidate("2502.00002", 2), 0.500_000_000_7),
            (candidate("2502.00003", 3), 0.5),
        ]);
        assert_eq!(ids(&ranked), vec!["2502.00002", "2502.00001", "2502.00003"]);
    }

    #[test]
    fn test_equal_score_and_date_use_lower_id() {
        let ranked = order_scored(vec![
            (candidate("2502.00009", 2), 0.3),
            (candidate("2502.00003", 2), 0.3),
        ]);
        assert_eq!(ids(&ranked), vec!["2502.00003", "2502.00009"]);
    }

    #[test]
    fn test_difference_above_tolerance_is_respected() {
        let ranked = order_scored(vec![
            (candidate("2502.00002", 3), 0.5),
            (candidate("2502.00001", 1), 0.500_001),
        ]);
        assert_eq!(ids(&ranked), vec!["2502.00001", "2502.00002"]);
    }
}
