//! arxiv-digest Ranker
//!
//! Orders candidate papers by relevance to the reference corpus. Scores are
//! time-decay-weighted mean cosine similarities in `[-1, 1]`; ordering is a
//! deterministic total order for identical inputs.

pub mod decay;
pub mod ordering;
pub mod ranker;
pub mod similarity;

pub use ordering::{order_scored, SCORE_TOLERANCE};
pub use ranker::Ranker;
pub use similarity::{cosine_similarity, score_candidates, MIN_SCORE};
