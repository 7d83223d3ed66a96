//! One digest run
//!
//! 1. Load the corpus and fetch candidates concurrently
//! 2. Rank candidates against the corpus
//! 3. Keep the top K
//! 4. Render and dispatch

use arxiv_digest_common::embeddings::create_embedder;
use arxiv_digest_common::{AppConfig, Result};
use arxiv_digest_mailer::{render_digest, Dispatcher, SmtpDispatcher, StdoutDispatcher};
use arxiv_digest_ranker::Ranker;
use arxiv_digest_sources::{
    http_client, ArxivClient, CandidateQuery, CandidateSource, CorpusSource, ZoteroClient,
};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::{info, instrument};

/// How a run ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A digest with this many entries was dispatched
    Sent { entries: usize },
    /// Nothing new; the "no papers today" digest was dispatched
    SentEmpty,
    /// Nothing new and empty digests are disabled
    NothingNew,
}

/// Per-run settings taken from configuration
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub query: CandidateQuery,
    /// `None` for no limit
    pub max_papers: Option<usize>,
    pub send_empty: bool,
    pub excerpt_chars: usize,
    /// Date shown in the subject line
    pub date: NaiveDate,
}

impl RunSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            query: CandidateQuery::from_config(&config.arxiv),
            max_papers: config.max_papers(),
            send_empty: config.digest.send_empty,
            excerpt_chars: config.digest.excerpt_chars,
            date: Local::now().date_naive(),
        }
    }
}

/// Wired collaborators of one run
pub struct Pipeline {
    corpus: Arc<dyn CorpusSource>,
    candidates: Arc<dyn CandidateSource>,
    ranker: Ranker,
    dispatcher: Arc<dyn Dispatcher>,
    settings: RunSettings,
}

impl Pipeline {
    pub fn new(
        corpus: Arc<dyn CorpusSource>,
        candidates: Arc<dyn CandidateSource>,
        ranker: Ranker,
        dispatcher: Arc<dyn Dispatcher>,
        settings: RunSettings,
    ) -> Self {
        Self {
            corpus,
            candidates,
            ranker,
            dispatcher,
            settings,
        }
    }

    /// Production wiring. Every setting is checked before the first request.
    pub fn from_config(config: &AppConfig, dry_run: bool) -> Result<Self> {
        let dispatcher: Arc<dyn Dispatcher> = if dry_run {
            Arc::new(StdoutDispatcher)
        } else {
            Arc::new(SmtpDispatcher::new(&config.smtp)?)
        };

        let embedder = create_embedder(&config.embedding)?;
        info!(
            model = %embedder.model_name(),
            dimension = embedder.dimension(),
            "Embedder initialized"
        );

        let client = http_client(&config.http)?;

        Ok(Self::new(
            Arc::new(ZoteroClient::new(client.clone(), config.zotero.clone())),
            Arc::new(ArxivClient::new(client, config.arxiv.clone())),
            Ranker::new(embedder, config.ranking.empty_corpus),
            dispatcher,
            RunSettings::from_config(config),
        ))
    }

    #[instrument(
        skip(self),
        fields(
            corpus = self.corpus.name(),
            candidates = self.candidates.name(),
            dispatcher = self.dispatcher.name()
        )
    )]
    pub async fn run(&self) -> Result<RunOutcome> {
        let (corpus, candidates) = tokio::try_join!(
            self.corpus.load_corpus(),
            self.candidates.fetch_candidates(&self.settings.query),
        )?;

        info!(
            corpus = corpus.len(),
            candidates = candidates.len(),
            "Sources loaded"
        );

        let mut ranked = self.ranker.rank(&corpus, candidates).await?;

        if ranked.is_empty() && !self.settings.send_empty {
            info!("No new papers and empty digests are disabled, nothing sent");
            return Ok(RunOutcome::NothingNew);
        }

        if let Some(max) = self.settings.max_papers {
            ranked.truncate(max);
        }

        let digest = render_digest(&ranked, self.settings.date, self.settings.excerpt_chars);
        self.dispatcher.send(&digest).await?;

        Ok(if digest.is_empty() {
            RunOutcome::SentEmpty
        } else {
            RunOutcome::Sent {
                entries: digest.entry_count,
            }
        })
    }
}
