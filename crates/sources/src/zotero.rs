//! Corpus loader backed by the Zotero Web API (v3)
//!
//! Reads every collection and every item of the configured item types,
//! keeps items that have an abstract, and annotates each with its
//! collection paths.

use crate::collections::{CollectionFilter, CollectionNode, CollectionTree};
use crate::{request_error, CorpusSource};
use arxiv_digest_common::config::ZoteroConfig;
use arxiv_digest_common::{AppError, ReferencePaper, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

const SOURCE: &str = "zotero";
const PAGE_SIZE: usize = 100;

/// `{ "key": ..., "data": { ... } }` envelope of every API object
#[derive(Debug, Deserialize)]
struct ApiObject<T> {
    key: String,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionData {
    name: String,
    /// `false` for top-level collections, a key otherwise
    #[serde(default, deserialize_with = "false_or_key")]
    parent_collection: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemData {
    #[serde(default)]
    title: String,
    #[serde(default)]
    abstract_note: String,
    #[serde(default)]
    date_added: Option<String>,
    #[serde(default)]
    collections: Vec<String>,
}

fn false_or_key<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ParentRef {
        Key(String),
        Flag(bool),
    }

    Ok(match Option::<ParentRef>::deserialize(deserializer)? {
        Some(ParentRef::Key(key)) if !key.is_empty() => Some(key),
        _ => None,
    })
}

/// Zotero Web API client
pub struct ZoteroClient {
    client: reqwest::Client,
    config: ZoteroConfig,
}

impl ZoteroClient {
    pub fn new(client: reqwest::Client, config: ZoteroConfig) -> Self {
        Self { client, config }
    }

    fn user_url(&self, path: &str) -> String {
        format!(
            "{}/users/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.user_id,
            path
        )
    }

    /// Fetch every page of a listing endpoint
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let url = self.user_url(path);
        let mut results = Vec::new();
        let mut start = 0usize;

        loop {
            let response = self
                .client
                .get(&url)
                .header("Zotero-API-Key", &self.config.api_key)
                .header("Zotero-API-Version", "3")
                .query(query)
                .query(&[("format", "json")])
                .query(&[("limit", PAGE_SIZE), ("start", start)])
                .send()
                .await
                .map_err(|e| request_error(SOURCE, e))?;

            match response.status() {
                status if status.is_success() => {}
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                    return Err(AppError::InvalidCredentials {
                        source_name: SOURCE.to_string(),
                    });
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AppError::source_unavailable(
                        SOURCE,
                        format!("API error {}: {}", status, body),
                    ));
                }
            }

            let total = response
                .headers()
                .get("Total-Results")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());

            let body = response.text().await.map_err(|e| request_error(SOURCE, e))?;
            let page: Vec<T> = serde_json::from_str(&body)?;
            let fetched = page.len();
            results.extend(page);
            start += fetched;

            debug!(path, fetched = results.len(), total = ?total, "Fetched page");

            match total {
                Some(total) if start < total && fetched > 0 => continue,
                None if fetched == PAGE_SIZE => continue,
                _ => break,
            }
        }

        Ok(results)
    }

    async fn collection_tree(&self) -> Result<CollectionTree> {
        let collections: Vec<ApiObject<CollectionData>> = self.fetch_all("collections", &[]).await?;

        let nodes: HashMap<String, CollectionNode> = collections
            .into_iter()
            .map(|c| {
                (
                    c.key,
                    CollectionNode {
                        name: c.data.name,
                        parent: c.data.parent_collection,
                    },
                )
            })
            .collect();

        Ok(CollectionTree::new(nodes))
    }
}

/// Turn raw items into reference papers, skipping items without abstracts
fn into_references(items: Vec<ApiObject<ItemData>>, tree: &CollectionTree) -> Vec<ReferencePaper> {
    items
        .into_iter()
        .filter(|item| !item.data.abstract_note.trim().is_empty())
        .filter_map(|item| {
            let date_added = item
                .data
                .date_added
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc));
            let paths = tree.paths(&item.data.collections);

            let paper = ReferencePaper::new(
                item.key.clone(),
                item.data.title,
                item.data.abstract_note,
                date_added,
            );
            match paper {
                Ok(paper) => Some(paper.with_collection_paths(paths)),
                Err(e) => {
                    warn!(key = %item.key, error = %e, "Skipping malformed library item");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl CorpusSource for ZoteroClient {
    #[instrument(skip(self), fields(user_id = %self.config.user_id))]
    async fn load_corpus(&self) -> Result<Vec<ReferencePaper>> {
        let tree = self.collection_tree().await?;

        let item_types = self.config.item_types.join(" || ");
        let items: Vec<ApiObject<ItemData>> = self
            .fetch_all("items", &[("itemType", item_types)])
            .await?;
        let total = items.len();

        let mut corpus = into_references(items, &tree);
        info!(total, with_abstract = corpus.len(), "Retrieved Zotero corpus");

        if let Some(patterns) = self.config.ignore.as_deref().filter(|p| !p.trim().is_empty()) {
            let filter = CollectionFilter::new(patterns)?;
            corpus = filter.apply(corpus);
            info!(remaining = corpus.len(), "Applied collection ignore patterns");
        }

        Ok(corpus)
    }

    fn name(&self) -> &str {
        SOURCE
    }
}
