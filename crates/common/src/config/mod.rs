//! Configuration management for arxiv-digest
//!
//! Layers, lowest priority first:
//! - Built-in defaults
//! - Configuration file (`config/default.toml`, or an explicit path)
//! - Environment variables prefixed with `APP__` (e.g. `APP__SMTP__PORT=465`)
//! - The bare variables the tool has always read (`ZOTERO_ID`, `SENDER`, ...)
//! - Command-line overrides applied by the binary

use crate::errors::Result;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    /// Reference library (corpus) access
    #[validate(nested)]
    pub zotero: ZoteroConfig,

    /// Candidate feed
    #[validate(nested)]
    pub arxiv: ArxivConfig,

    /// Ranking behaviour
    pub ranking: RankingConfig,

    /// Feature extraction
    pub embedding: EmbeddingConfig,

    /// Mail transport; validated by the dispatcher that uses it
    pub smtp: SmtpConfig,

    /// Digest rendering
    pub digest: DigestConfig,

    /// Shared HTTP client settings
    pub http: HttpConfig,

    /// Logging
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ZoteroConfig {
    /// Numeric user library id (ZOTERO_ID)
    #[validate(length(min = 1, message = "ZOTERO_ID must be set"))]
    pub user_id: String,

    /// Web API key (ZOTERO_KEY)
    #[validate(length(min = 1, message = "ZOTERO_KEY must be set"))]
    pub api_key: String,

    /// Gitignore-style collection patterns to exclude, one per line
    pub ignore: Option<String>,

    /// Item types fetched from the library
    #[validate(length(min = 1))]
    pub item_types: Vec<String>,

    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ArxivConfig {
    /// Category query, e.g. `cs.AI+cs.CV`
    #[validate(length(min = 1, message = "ARXIV_QUERY must not be empty"))]
    pub query: String,

    /// Drop candidates published more than this many days ago
    pub lookback_days: Option<u32>,

    /// Fetch the latest few cs.AI papers regardless of announcement date
    pub debug: bool,

    pub rss_base: String,

    pub api_base: String,

    /// Ids per export API request
    #[validate(range(min = 1, max = 200))]
    pub batch_size: usize,
}

/// What the ranker does when there is no reference data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyCorpusPolicy {
    /// Abort the run
    #[default]
    Fail,
    /// Neutral scores, ordered newest first
    MostRecentFirst,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RankingConfig {
    pub empty_corpus: EmptyCorpusPolicy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local feature hashing, no network
    #[default]
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAI,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,

    /// API key for the embedding service
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    pub model: String,

    /// Vector dimension of the hashing embedder
    pub dimension: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct SmtpConfig {
    #[validate(length(min = 1))]
    pub server: String,

    #[validate(range(min = 1))]
    pub port: u16,

    /// Dispatch-from address (SENDER)
    #[validate(email(message = "SENDER must be an email address"))]
    pub sender: String,

    /// Dispatch-to address (RECEIVER)
    #[validate(email(message = "RECEIVER must be an email address"))]
    pub receiver: String,

    /// App password for the sender account (SENDER_PASSWORD)
    #[validate(length(min = 1, message = "SENDER_PASSWORD must be set"))]
    pub password: String,

    /// Connection timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Top-K cap, 0 for no limit
    pub max_papers: usize,

    /// Send a "no papers today" mail when nothing was announced
    pub send_empty: bool,

    /// Abstract excerpt length in characters
    pub excerpt_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    pub log_level: String,

    /// Enable JSON logging
    pub json_logging: bool,
}

// Default value functions
fn default_item_types() -> Vec<String> {
    ["conferencePaper", "journalArticle", "preprint"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_zotero_api_base() -> String { "https://api.zotero.org".to_string() }
fn default_arxiv_query() -> String { "cs.AI+cs.CV+cs.LG+cs.CL".to_string() }
fn default_rss_base() -> String { "https://rss.arxiv.org/atom".to_string() }
fn default_arxiv_api_base() -> String { "http://export.arxiv.org/api/query".to_string() }
fn default_arxiv_batch_size() -> usize { 50 }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_embedding_dimension() -> usize { 1024 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_smtp_server() -> String { "smtp.gmail.com".to_string() }
fn default_smtp_port() -> u16 { 587 }
fn default_smtp_timeout() -> u64 { 30 }
fn default_max_papers() -> usize { 20 }
fn default_send_empty() -> bool { true }
fn default_excerpt_chars() -> usize { 600 }
fn default_http_timeout() -> u64 { 30 }
fn default_user_agent() -> String { format!("arxiv-digest/{}", crate::VERSION) }
fn default_log_level() -> String { "info".to_string() }

impl Default for ZoteroConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            api_key: String::new(),
            ignore: None,
            item_types: default_item_types(),
            api_base: default_zotero_api_base(),
        }
    }
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            query: default_arxiv_query(),
            lookback_days: None,
            debug: false,
            rss_base: default_rss_base(),
            api_base: default_arxiv_api_base(),
            batch_size: default_arxiv_batch_size(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            api_key: None,
            api_base: None,
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: default_smtp_server(),
            port: default_smtp_port(),
            sender: String::new(),
            receiver: String::new(),
            password: String::new(),
            timeout_secs: default_smtp_timeout(),
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            max_papers: default_max_papers(),
            send_empty: default_send_empty(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}

/// Bare environment variables and the keys they set
pub const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("ZOTERO_ID", "zotero.user_id"),
    ("ZOTERO_KEY", "zotero.api_key"),
    ("ZOTERO_IGNORE", "zotero.ignore"),
    ("ARXIV_QUERY", "arxiv.query"),
    ("SENDER", "smtp.sender"),
    ("RECEIVER", "smtp.receiver"),
    ("SENDER_PASSWORD", "smtp.password"),
    ("SMTP_SERVER", "smtp.server"),
    ("SMTP_PORT", "smtp.port"),
    ("MAX_PAPER_NUM", "digest.max_papers"),
    ("SEND_EMPTY", "digest.send_empty"),
];

/// Resolve the bare variables through `lookup`.
///
/// Unset and empty values are skipped (CI runners export unset secrets as
/// empty strings). `MAX_PAPER_NUM=-1` means no limit.
pub fn legacy_overrides<F>(lookup: F) -> Vec<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    LEGACY_ENV_KEYS
        .iter()
        .filter_map(|(var, key)| {
            let value = lookup(var)?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            let value = match (*var, value) {
                ("MAX_PAPER_NUM", v) if v.starts_with('-') => "0".to_string(),
                (_, v) => v.to_string(),
            };
            Some((*key, value))
        })
        .collect()
}

impl AppConfig {
    /// Builder with every layer except command-line overrides
    pub fn builder(path: Option<&Path>) -> Result<ConfigBuilder<DefaultState>> {
        let mut builder = Config::builder();

        builder = match path {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name("config/default").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        for (key, value) in legacy_overrides(|var| std::env::var(var).ok()) {
            builder = builder.set_override(key, value)?;
        }

        Ok(builder)
    }

    /// Build, deserialize and validate
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment and files
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_builder(Self::builder(path)?)
    }

    /// Per-request HTTP timeout
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Top-K cap as an option, `None` meaning unlimited
    pub fn max_papers(&self) -> Option<usize> {
        match self.digest.max_papers {
            0 => None,
            n => Some(n),
        }
    }
}

impl SmtpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Port 465 speaks TLS from the first byte; everything else upgrades
    pub fn implicit_tls(&self) -> bool {
        self.port == 465
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    fn valid_builder() -> ConfigBuilder<DefaultState> {
        Config::builder()
            .set_override("zotero.user_id", "123456")
            .unwrap()
            .set_override("zotero.api_key", "secret")
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.arxiv.query, "cs.AI+cs.CV+cs.LG+cs.CL");
        assert_eq!(config.max_papers(), Some(20));
        assert!(config.digest.send_empty);
        assert_eq!(config.ranking.empty_corpus, EmptyCorpusPolicy::Fail);
        assert_eq!(config.embedding.provider, EmbeddingProvider::Hashing);
    }

    #[test]
    fn test_missing_credentials_fail_validation() {
        let err = AppConfig::from_builder(Config::builder()).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("ZOTERO_ID"));
    }

    #[test]
    fn test_overrides_deserialize_from_strings() {
        let config = AppConfig::from_builder(
            valid_builder()
                .set_override("digest.max_papers", "5")
                .unwrap()
                .set_override("digest.send_empty", "false")
                .unwrap()
                .set_override("ranking.empty_corpus", "most-recent-first")
                .unwrap(),
        )
        .unwrap();

        assert_eq!(config.max_papers(), Some(5));
        assert!(!config.digest.send_empty);
        assert_eq!(config.ranking.empty_corpus, EmptyCorpusPolicy::MostRecentFirst);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[zotero]
user_id = "42"
api_key = "k"
ignore = "Archive/**"

[smtp]
port = 465

[digest]
max_papers = 0
"#
        )
        .unwrap();

        let builder = Config::builder().add_source(File::from(file.path()));
        let config = AppConfig::from_builder(builder).unwrap();

        assert_eq!(config.zotero.user_id, "42");
        assert_eq!(config.zotero.ignore.as_deref(), Some("Archive/**"));
        assert!(config.smtp.implicit_tls());
        assert_eq!(config.max_papers(), None);
        // untouched sections keep their defaults
        assert_eq!(config.smtp.server, "smtp.gmail.com");
    }

    #[test]
    fn test_legacy_overrides_skip_empty_values() {
        let env: HashMap<&str, &str> = [
            ("ZOTERO_ID", "777"),
            ("ZOTERO_KEY", ""),
            ("SENDER", "me@example.com"),
            ("MAX_PAPER_NUM", "-1"),
        ]
        .into_iter()
        .collect();

        let overrides = legacy_overrides(|var| env.get(var).map(|v| v.to_string()));

        assert_eq!(
            overrides,
            vec![
                ("zotero.user_id", "777".to_string()),
                ("smtp.sender", "me@example.com".to_string()),
                ("digest.max_papers", "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_smtp_validation() {
        let mut smtp = SmtpConfig::default();
        assert!(smtp.validate().is_err());

        smtp.sender = "me@example.com".into();
        smtp.receiver = "you@example.com".into();
        smtp.password = "app-password".into();
        assert_ok!(smtp.validate());

        smtp.receiver = "not-an-address".into();
        assert_err!(smtp.validate());
    }
}
