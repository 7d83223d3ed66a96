//! Command-line arguments
//!
//! Flags are the last configuration layer: each one that is given
//! overrides the same key from files and environment.

use arxiv_digest_common::errors::Result;
use arxiv_digest_common::AppConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "arxiv-digest")]
#[command(
    about = "Rank today's arXiv papers against your Zotero library and mail the best",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Configuration file (toml, yaml or json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fetch the latest few cs.AI papers regardless of date and log at debug level
    #[arg(long)]
    pub debug: bool,

    /// Print the rendered digest to stdout instead of sending it
    #[arg(long)]
    pub dry_run: bool,

    /// arXiv category query, e.g. cs.AI+cs.CV
    #[arg(long)]
    pub arxiv_query: Option<String>,

    /// Maximum papers in the digest (0 or negative for no limit)
    #[arg(long, allow_negative_numbers = true)]
    pub max_papers: Option<i64>,

    /// Send a digest even when nothing new was announced
    #[arg(long)]
    pub send_empty: Option<bool>,

    /// Gitignore-style collection patterns to exclude, one per line
    #[arg(long)]
    pub zotero_ignore: Option<String>,

    #[arg(long)]
    pub smtp_server: Option<String>,

    #[arg(long)]
    pub smtp_port: Option<u16>,

    /// What to do when the library has no usable papers
    #[arg(long, value_parser = ["fail", "most-recent-first"])]
    pub empty_corpus: Option<String>,
}

impl Cli {
    /// Configuration keys set by flags
    pub fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();

        if self.debug {
            overrides.push(("arxiv.debug", "true".to_string()));
        }
        if let Some(query) = &self.arxiv_query {
            overrides.push(("arxiv.query", query.clone()));
        }
        if let Some(max) = self.max_papers {
            overrides.push(("digest.max_papers", max.max(0).to_string()));
        }
        if let Some(send_empty) = self.send_empty {
            overrides.push(("digest.send_empty", send_empty.to_string()));
        }
        if let Some(patterns) = &self.zotero_ignore {
            overrides.push(("zotero.ignore", patterns.clone()));
        }
        if let Some(server) = &self.smtp_server {
            overrides.push(("smtp.server", server.clone()));
        }
        if let Some(port) = self.smtp_port {
            overrides.push(("smtp.port", port.to_string()));
        }
        if let Some(policy) = &self.empty_corpus {
            overrides.push(("ranking.empty_corpus", policy.clone()));
        }

        overrides
    }

    /// Every configuration layer, flags last
    pub fn load_config(&self) -> Result<AppConfig> {
        let mut builder = AppConfig::builder(self.config.as_deref())?;
        for (key, value) in self.overrides() {
            builder = builder.set_override(key, value)?;
        }
        AppConfig::from_builder(builder)
    }
}
