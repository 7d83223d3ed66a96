//! Candidate fetcher backed by arXiv
//!
//! The announcement feed lists today's ids; the export API resolves them to
//! full records in batches.

use crate::atom::{parse_feed, Feed, FeedEntry};
use crate::{finalize_candidates, request_error, CandidateQuery, CandidateSource};
use arxiv_digest_common::config::ArxivConfig;
use arxiv_digest_common::{AppError, CandidatePaper, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SOURCE: &str = "arxiv";

/// Papers fetched in debug mode
const DEBUG_PAPER_COUNT: usize = 5;

/// Pause between export API calls, as arXiv asks of API clients
const REQUEST_DELAY: Duration = Duration::from_secs(3);

/// arXiv announcement feed and export API client
pub struct ArxivClient {
    client: reqwest::Client,
    config: ArxivConfig,
}

impl ArxivClient {
    pub fn new(client: reqwest::Client, config: ArxivConfig) -> Self {
        Self { client, config }
    }

    async fn get_feed(&self, url: &str, query: &[(&str, String)]) -> Result<Feed> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| request_error(SOURCE, e))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::source_unavailable(
                SOURCE,
                format!("{} returned {}", url, status),
            ));
        }

        let body = response.text().await.map_err(|e| request_error(SOURCE, e))?;
        parse_feed(&body)
    }

    /// Ids announced as new today
    async fn announced_ids(&self, categories: &str) -> Result<Vec<String>> {
        let url = format!("{}/{}", self.config.rss_base.trim_end_matches('/'), categories);
        let feed = self.get_feed(&url, &[]).await?;

        if feed.is_query_error() {
            return Err(AppError::InvalidQuery {
                query: categories.to_string(),
            });
        }

        let ids: Vec<String> = feed
            .entries
            .iter()
            .filter(|e| e.announce_type.as_deref() == Some("new"))
            .map(|e| e.arxiv_id().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        info!(
            entries = feed.entries.len(),
            new = ids.len(),
            "Read announcement feed"
        );
        Ok(ids)
    }

    /// Resolve ids through the export API
    async fn lookup(&self, ids: &[String]) -> Result<Vec<CandidatePaper>> {
        let mut papers = Vec::with_capacity(ids.len());

        for (i, batch) in ids.chunks(self.config.batch_size.max(1)).enumerate() {
            if i > 0 {
                tokio::time::sleep(REQUEST_DELAY).await;
            }

            let feed = self
                .get_feed(
                    &self.config.api_base,
                    &[
                        ("id_list", batch.join(",")),
                        ("max_results", batch.len().to_string()),
                    ],
                )
                .await?;

            let before = papers.len();
            papers.extend(into_candidates(feed.entries));
            debug!(
                batch = i,
                requested = batch.len(),
                resolved = papers.len() - before,
                "Resolved batch"
            );
        }

        Ok(papers)
    }

    /// Most recently submitted cs.AI papers, whatever the announcement date
    async fn latest(&self) -> Result<Vec<CandidatePaper>> {
        debug!(count = DEBUG_PAPER_COUNT, "Debug mode, fetching latest cs.AI papers");
        let feed = self
            .get_feed(
                &self.config.api_base,
                &[
                    ("search_query", "cat:cs.AI".to_string()),
                    ("sortBy", "submittedDate".to_string()),
                    ("sortOrder", "descending".to_string()),
                    ("max_results", DEBUG_PAPER_COUNT.to_string()),
                ],
            )
            .await?;

        Ok(into_candidates(feed.entries))
    }
}

/// Convert API entries, skipping error entries and malformed records
fn into_candidates(entries: Vec<FeedEntry>) -> Vec<CandidatePaper> {
    entries
        .into_iter()
        .filter_map(|entry| {
            if entry.is_api_error() {
                warn!(
                    id = %entry.id,
                    summary = %entry.summary,
                    "arXiv API reported an error entry"
                );
                return None;
            }
            let id = entry.id.clone();
            match entry.into_candidate() {
                Ok(paper) => Some(paper),
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping malformed arXiv entry");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl CandidateSource for ArxivClient {
    #[instrument(skip(self), fields(query = %query.categories, debug = query.debug))]
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<Vec<CandidatePaper>> {
        let papers = if query.debug {
            self.latest().await?
        } else {
            let ids = self.announced_ids(&query.categories).await?;
            if ids.is_empty() {
                info!("No new papers announced");
                return Ok(Vec::new());
            }
            self.lookup(&ids).await?
        };

        let papers = finalize_candidates(papers, query.since);
        info!(candidates = papers.len(), "Fetched arXiv candidates");
        Ok(papers)
    }

    fn name(&self) -> &str {
        SOURCE
    }
}
