//! Relevance ranker
//!
//! Wraps the pure scoring functions with feature extraction:
//! 1. Drop malformed candidates
//! 2. Order the corpus and assign time-decay weights
//! 3. Extract features (batch first, one by one if the batch fails)
//! 4. Score, sanitise, order

use crate::decay::{decay_weights, order_corpus};
use crate::ordering::order_scored;
use crate::similarity::{score_candidates, MIN_SCORE};
use arxiv_digest_common::config::EmptyCorpusPolicy;
use arxiv_digest_common::{
    AppError, CandidatePaper, Embedder, ReferencePaper, Result, ScoredCandidate,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Concurrent single-text requests when a batch has to be retried
const RETRY_CONCURRENCY: usize = 4;

/// Ranks candidates by weighted similarity to the reference corpus
pub struct Ranker {
    embedder: Arc<dyn Embedder>,
    policy: EmptyCorpusPolicy,
}

impl Ranker {
    pub fn new(embedder: Arc<dyn Embedder>, policy: EmptyCorpusPolicy) -> Self {
        Self { embedder, policy }
    }

    /// Rank `candidates` against `corpus`, highest relevance first
    ///
    /// Malformed candidates are dropped. A candidate whose features cannot
    /// be extracted is kept with [`MIN_SCORE`], so it lands at the tail of
    /// the result and can still appear in an uncapped digest. Reference
    /// papers that fail extraction are left out of the weighting.
    #[instrument(skip_all, fields(corpus = corpus.len(), candidates = candidates.len()))]
    pub async fn rank(
        &self,
        corpus: &[ReferencePaper],
        candidates: Vec<CandidatePaper>,
    ) -> Result<Vec<ScoredCandidate>> {
        let candidates: Vec<CandidatePaper> = candidates
            .into_iter()
            .filter(|paper| match paper.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(arxiv_id = %paper.arxiv_id, error = %e, "Excluding malformed candidate");
                    false
                }
            })
            .collect();

        if candidates.is_empty() {
            debug!("No candidates to rank");
            return Ok(Vec::new());
        }

        let references = self.reference_vectors(corpus).await;
        if references.is_empty() {
            return self.rank_without_corpus(candidates);
        }

        info!(
            candidates = candidates.len(),
            references = references.len(),
            model = self.embedder.model_name(),
            "Ranking candidates"
        );

        let texts: Vec<String> = candidates.iter().map(CandidatePaper::text).collect();
        let extracted = self.extract(&texts).await;

        let weights = decay_weights(references.len());
        let scored = candidates
            .into_iter()
            .zip(extracted)
            .map(|(paper, vector)| {
                let score = match vector {
                    Ok(vector) => score_candidates(&[vector], &references, &weights)[0],
                    Err(e) => {
                        warn!(
                            arxiv_id = %paper.arxiv_id,
                            error = %e,
                            "Feature extraction failed, ranking last"
                        );
                        MIN_SCORE
                    }
                };
                (paper, score)
            })
            .collect();

        Ok(order_scored(scored))
    }

    fn rank_without_corpus(&self, candidates: Vec<CandidatePaper>) -> Result<Vec<ScoredCandidate>> {
        match self.policy {
            EmptyCorpusPolicy::Fail => Err(AppError::NoReferenceData),
            EmptyCorpusPolicy::MostRecentFirst => {
                warn!("No reference papers, ordering candidates by publication date");
                Ok(order_scored(candidates.into_iter().map(|p| (p, 0.0)).collect()))
            }
        }
    }

    /// Feature vectors of the corpus in decay order, failures excluded
    async fn reference_vectors(&self, corpus: &[ReferencePaper]) -> Vec<Vec<f32>> {
        let ordered = order_corpus(corpus);

        let missing: Vec<String> = ordered
            .iter()
            .filter(|p| p.embedding.is_none())
            .map(|p| p.text())
            .collect();
        let mut extracted = self.extract(&missing).await.into_iter();

        ordered
            .into_iter()
            .filter_map(|paper| {
                let vector = match &paper.embedding {
                    Some(embedding) => Ok(embedding.clone()),
                    None => extracted.next()?,
                };
                match vector {
                    Ok(vector) => Some(vector),
                    Err(e) => {
                        warn!(
                            key = %paper.key,
                            error = %e,
                            "Feature extraction failed, excluding reference paper"
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// One result per text, in order
    async fn extract(&self, texts: &[String]) -> Vec<Result<Vec<f32>>> {
        if texts.is_empty() {
            return Vec::new();
        }

        match self.embedder.embed_batch(texts).await {
            Ok(vectors) if vectors.len() == texts.len() => {
                return vectors.into_iter().map(Ok).collect()
            }
            Ok(vectors) => warn!(
                expected = texts.len(),
                received = vectors.len(),
                "Batch feature extraction returned the wrong count, retrying one by one"
            ),
            Err(e) => warn!(error = %e, "Batch feature extraction failed, retrying one by one"),
        }

        stream::iter(texts)
            .map(|text| self.embedder.embed(text))
            .buffered(RETRY_CONCURRENCY)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arxiv_digest_common::embeddings::HashingEmbedder;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use rand::seq::SliceRandom;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 0, 0, 0).unwrap()
    }

    fn reference(key: &str, title: &str, abstract_text: &str, d: u32) -> ReferencePaper {
        ReferencePaper::new(key, title, abstract_text, Some(day(d))).unwrap()
    }

    fn candidate(id: &str, title: &str, abstract_text: &str, d: u32) -> CandidatePaper {
        CandidatePaper::new(id, title, vec!["A. Author".into()], abstract_text, day(d), "").unwrap()
    }

    fn corpus() -> Vec<ReferencePaper> {
        vec![
            reference(
                "ATTN",
                "Attention Is All You Need",
                "The dominant sequence transduction models are based on complex recurrent networks. \
                 We propose the Transformer, based solely on attention mechanisms.",
                10,
            ),
            reference(
                "GNN",
                "Graph Neural Networks for Molecules",
                "Message passing networks predict molecular properties from graph structure.",
                5,
            ),
            reference(
                "DIFF",
                "Denoising Diffusion Probabilistic Models",
                "Diffusion models generate images by reversing a gradual noising process.",
                1,
            ),
        ]
    }

    fn candidates() -> Vec<CandidatePaper> {
        vec![
            candidate(
                "2503.00001",
                "Transformers for Vision",
                "We apply transformer attention to image recognition.",
                12,
            ),
            candidate(
                "2503.00002",
                "A Novel Soup Recipe",
                "Carrots, onions and broth simmered slowly.",
                12,
            ),
            candidate(
                "2503.00003",
                "Equivariant Message Passing",
                "Graph networks for molecular dynamics.",
                11,
            ),
            candidate(
                "2503.00004",
                "Faster Diffusion Sampling",
                "Fewer denoising steps for diffusion models.",
                12,
            ),
            candidate(
                "2503.00005",
                "Protein Folding Benchmarks",
                "A benchmark of folding predictors.",
                11,
            ),
        ]
    }

    fn ranker(policy: EmptyCorpusPolicy) -> Ranker {
        Ranker::new(Arc::new(HashingEmbedder::new(1024)), policy)
    }

    fn summary(ranked: &[ScoredCandidate]) -> Vec<(String, u64, usize)> {
        ranked
            .iter()
            .map(|s| (s.paper.arxiv_id.clone(), s.score.to_bits(), s.rank))
            .collect()
    }

    /// Fails the batch call and every text containing `poison`
    struct FlakyEmbedder {
        inner: HashingEmbedder,
        poison: &'static str,
        batch_calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains(self.poison) {
                return Err(AppError::EmbeddingError {
                    message: "rejected".into(),
                });
            }
            self.inner.embed(text).await
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::EmbeddingError {
                message: "batch rejected".into(),
            })
        }

        fn model_name(&self) -> &str {
            "flaky"
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    #[tokio::test]
    async fn test_transformer_ranks_above_soup() {
        let corpus = vec![corpus().remove(0)];
        let ranked = ranker(EmptyCorpusPolicy::Fail)
            .rank(&corpus, candidates()[..2].to_vec())
            .await
            .unwrap();

        assert_eq!(ranked[0].paper.arxiv_id, "2503.00001");
        assert_eq!(ranked[1].paper.arxiv_id, "2503.00002");
        assert!(ranked[0].score - ranked[1].score > 0.05);
    }

    #[tokio::test]
    async fn test_ranking_is_deterministic_and_order_independent() {
        let ranker = ranker(EmptyCorpusPolicy::Fail);
        let expected = summary(&ranker.rank(&corpus(), candidates()).await.unwrap());

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            let mut corpus = corpus();
            let mut candidates = candidates();
            corpus.shuffle(&mut rng);
            candidates.shuffle(&mut rng);

            let ranked = ranker.rank(&corpus, candidates).await.unwrap();
            assert_eq!(summary(&ranked), expected);
        }
    }

    #[tokio::test]
    async fn test_completeness_and_bounds() {
        let mut input = candidates();
        let mut malformed = candidate("2503.00099", "Broken", "Will be blanked", 12);
        malformed.abstract_text = "  ".into();
        input.push(malformed);

        let ranked = ranker(EmptyCorpusPolicy::Fail).rank(&corpus(), input).await.unwrap();

        assert_eq!(ranked.len(), candidates().len());
        assert!(ranked.iter().all(|s| s.score.is_finite() && (-1.0..=1.0).contains(&s.score)));
        assert!(ranked.iter().all(|s| s.paper.arxiv_id != "2503.00099"));
        let ranks: Vec<usize> = ranked.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, (1..=ranked.len()).collect::<Vec<_>>());
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score - 1e-9));
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let embedder = Arc::new(FlakyEmbedder {
            inner: HashingEmbedder::new(64),
            poison: "never",
            batch_calls: AtomicUsize::new(0),
        });
        let ranker = Ranker::new(embedder.clone(), EmptyCorpusPolicy::Fail);

        let ranked = assert_ok!(ranker.rank(&corpus(), Vec::new()).await);
        assert!(ranked.is_empty());
        assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 0);

        // No candidates wins over no corpus
        assert!(ranker.rank(&[], Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_corpus_fails_by_default() {
        let err = ranker(EmptyCorpusPolicy::Fail)
            .rank(&[], candidates())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoReferenceData));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn test_empty_corpus_most_recent_first() {
        let ranked = ranker(EmptyCorpusPolicy::MostRecentFirst)
            .rank(&[], candidates())
            .await
            .unwrap();

        let ids: Vec<&str> = ranked.iter().map(|s| s.paper.arxiv_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["2503.00001", "2503.00002", "2503.00004", "2503.00003", "2503.00005"]
        );
        assert!(ranked.iter().all(|s| s.score == 0.0));
    }

    #[tokio::test]
    async fn test_failed_extraction_ranks_last() {
        let embedder = Arc::new(FlakyEmbedder {
            inner: HashingEmbedder::new(1024),
            poison: "Soup",
            batch_calls: AtomicUsize::new(0),
        });
        let ranker = Ranker::new(embedder.clone(), EmptyCorpusPolicy::Fail);

        let ranked = ranker.rank(&corpus(), candidates()).await.unwrap();

        assert_eq!(ranked.len(), candidates().len());
        let last = ranked.last().unwrap();
        assert_eq!(last.paper.arxiv_id, "2503.00002");
        assert_eq!(last.score, MIN_SCORE);
        // one batch for the corpus, one for the candidates
        assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_corpus_lost_to_extraction_failures_uses_policy() {
        let embedder = Arc::new(FlakyEmbedder {
            inner: HashingEmbedder::new(64),
            poison: "",
            batch_calls: AtomicUsize::new(0),
        });

        let err = assert_err!(
            Ranker::new(embedder, EmptyCorpusPolicy::Fail)
                .rank(&corpus(), candidates())
                .await
        );
        assert!(matches!(err, AppError::NoReferenceData));
    }

    #[tokio::test]
    async fn test_stored_embeddings_are_used() {
        // A stored vector orthogonal to everything the hashing embedder
        // would produce for the candidates' text
        let embedder = HashingEmbedder::new(8);
        let stored = vec![-1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let corpus = vec![reference("K", "Title", "Abstract", 1).with_embedding(stored)];

        let ranked = Ranker::new(Arc::new(embedder), EmptyCorpusPolicy::Fail)
            .rank(&corpus, candidates())
            .await
            .unwrap();

        assert!(ranked.iter().all(|s| s.score <= 0.0));
    }
}
