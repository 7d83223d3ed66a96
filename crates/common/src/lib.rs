//! arxiv-digest Common Library
//!
//! Shared code for every stage of a digest run:
//! - Typed paper records
//! - Feature extraction abstraction
//! - Error types and exit-code mapping
//! - Configuration management

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod models;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use models::{CandidatePaper, ReferencePaper, ScoredCandidate};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
