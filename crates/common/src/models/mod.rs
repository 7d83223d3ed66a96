//! Typed records shared by every stage of a digest run

mod paper;

pub use paper::{strip_version, CandidatePaper, ReferencePaper};

use serde::{Deserialize, Serialize};

/// A candidate paired with its relevance score and 1-based rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub paper: CandidatePaper,

    /// Relevance score in `[-1, 1]`, always finite
    pub score: f64,

    pub rank: usize,
}
