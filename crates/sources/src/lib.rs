//! arxiv-digest Sources
//!
//! The two read sides of a digest run:
//! - [`ZoteroClient`]: the reference corpus from the user's Zotero library
//! - [`ArxivClient`]: today's candidate papers from arXiv

pub mod arxiv;
pub mod atom;
pub mod collections;
pub mod zotero;

#[cfg(test)]
mod stub;

pub use arxiv::ArxivClient;
pub use collections::{CollectionFilter, CollectionTree};
pub use zotero::ZoteroClient;

use arxiv_digest_common::config::{ArxivConfig, HttpConfig};
use arxiv_digest_common::{AppError, CandidatePaper, ReferencePaper, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Supplies the reference corpus
#[async_trait]
pub trait CorpusSource: Send + Sync {
    /// Every reference paper of the library, already filtered
    async fn load_corpus(&self) -> Result<Vec<ReferencePaper>>;

    /// Source name for logs
    fn name(&self) -> &str;
}

/// Supplies candidate papers
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Candidates matching `query`, unique by arxiv id
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<CandidatePaper>>;

    /// Source name for logs
    fn name(&self) -> &str;
}

/// What to fetch from the candidate feed
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    /// Category query such as `cs.AI+cs.CV`
    pub categories: String,
    /// Drop candidates published before this instant
    pub since: Option<DateTime<Utc>>,
    /// Fetch the latest few papers regardless of announcement date
    pub debug: bool,
}

impl CandidateQuery {
    pub fn from_config(config: &ArxivConfig) -> Self {
        Self {
            categories: config.query.clone(),
            since: config
                .lookback_days
                .map(|days| Utc::now() - Duration::days(i64::from(days))),
            debug: config.debug,
        }
    }
}

/// Shared HTTP client for all sources
pub fn http_client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Map a transport failure to the source that was being read
pub(crate) fn request_error(source: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::source_unavailable(source, "request timed out")
    } else {
        AppError::source_unavailable(source, err)
    }
}

/// Drop duplicate ids (first occurrence wins) and candidates older than `since`
pub fn finalize_candidates(
    candidates: Vec<CandidatePaper>,
    since: Option<DateTime<Utc>>,
) -> Vec<CandidatePaper> {
    let mut seen = HashSet::new();

    candidates
        .into_iter()
        .filter(|paper| {
            if seen.insert(paper.arxiv_id.clone()) {
                true
            } else {
                warn!(arxiv_id = %paper.arxiv_id, "Duplicate candidate dropped");
                false
            }
        })
        .filter(|paper| match since {
            Some(since) if paper.published < since => {
                debug!(
                    arxiv_id = %paper.arxiv_id,
                    published = %paper.published,
                    "Outside date window"
                );
                false
            }
            _ => true,
        })
        .collect()
}
