//! Zotero collection paths and the collection ignore filter
//!
//! Collections form a tree through `parentCollection`. A paper's paths are
//! the slash-joined names from the root to each collection it belongs to,
//! e.g. `Reading/Vision/Detection`.

use arxiv_digest_common::{AppError, ReferencePaper, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::collections::HashMap;
use tracing::warn;

/// Guards against parent cycles in malformed libraries
const MAX_DEPTH: usize = 64;

/// A collection node: display name and optional parent key
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionNode {
    pub name: String,
    pub parent: Option<String>,
}

/// Collection tree keyed by collection key
#[derive(Debug, Clone, Default)]
pub struct CollectionTree {
    nodes: HashMap<String, CollectionNode>,
}

impl CollectionTree {
    pub fn new(nodes: HashMap<String, CollectionNode>) -> Self {
        Self { nodes }
    }

    /// Full path of a collection, or `None` for an unknown key
    pub fn path(&self, key: &str) -> Option<String> {
        let mut names = Vec::new();
        let mut current = Some(key);

        while let Some(key) = current {
            let node = match self.nodes.get(key) {
                Some(node) => node,
                None if names.is_empty() => return None,
                None => {
                    warn!(collection = key, "Parent collection missing, truncating path");
                    break;
                }
            };
            names.push(node.name.as_str());
            if names.len() >= MAX_DEPTH {
                warn!(collection = key, "Collection nesting too deep, truncating path");
                break;
            }
            current = node.parent.as_deref();
        }

        names.reverse();
        Some(names.join("/"))
    }

    /// Paths for every known key in `keys`
    pub fn paths<'a>(&self, keys: impl IntoIterator<Item = &'a String>) -> Vec<String> {
        keys.into_iter().filter_map(|k| self.path(k)).collect()
    }
}

/// Gitignore-style filter over collection paths
pub struct CollectionFilter {
    gitignore: Gitignore,
}

impl CollectionFilter {
    /// Build from newline-separated patterns
    pub fn new(patterns: &str) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(".");

        for line in patterns.lines() {
            builder
                .add_line(None, line)
                .map_err(|e| AppError::Configuration {
                    message: format!("Invalid zotero_ignore pattern {:?}: {}", line, e),
                })?;
        }

        let gitignore = builder.build().map_err(|e| AppError::Configuration {
            message: format!("Invalid zotero_ignore patterns: {}", e),
        })?;

        Ok(Self { gitignore })
    }

    /// Check if a collection path (or one of its ancestors) is ignored
    pub fn is_ignored(&self, path: &str) -> bool {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return false;
        }
        self.gitignore
            .matched_path_or_any_parents(path, true)
            .is_ignore()
    }

    /// Drop papers that live in an ignored collection
    pub fn apply(&self, corpus: Vec<ReferencePaper>) -> Vec<ReferencePaper> {
        corpus
            .into_iter()
            .filter(|paper| !paper.collection_paths.iter().any(|p| self.is_ignored(p)))
            .collect()
    }
}
