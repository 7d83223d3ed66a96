//! Paper records
//!
//! Both record types are validated at construction: a paper that reaches
//! the ranker has the text it will be compared on.

use crate::errors::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use validator::{Validate, ValidationError};

/// A paper from the user's reference library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ReferencePaper {
    /// Library item key
    pub key: String,

    pub title: String,

    #[serde(rename = "abstract")]
    #[validate(custom(function = "non_blank"))]
    pub abstract_text: String,

    /// When the item was added to the library (drives time decay)
    pub date_added: Option<DateTime<Utc>>,

    /// Collection paths such as `ML/Transformers`
    #[serde(default)]
    pub collection_paths: Vec<String>,

    /// Precomputed feature vector, if the library already carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ReferencePaper {
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        date_added: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let paper = Self {
            key: key.into(),
            title: title.into().trim().to_string(),
            abstract_text: abstract_text.into().trim().to_string(),
            date_added,
            collection_paths: Vec::new(),
            embedding: None,
        };
        paper.validate()?;
        Ok(paper)
    }

    pub fn with_collection_paths(mut self, paths: Vec<String>) -> Self {
        self.collection_paths = paths;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Text fed to feature extraction
    pub fn text(&self) -> String {
        join_text(&self.title, &self.abstract_text)
    }
}

/// A newly announced arXiv paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CandidatePaper {
    /// Identifier without version suffix, e.g. `2401.01234`
    #[validate(custom(function = "non_blank"))]
    pub arxiv_id: String,

    #[validate(custom(function = "non_blank"))]
    pub title: String,

    pub authors: Vec<String>,

    #[serde(rename = "abstract")]
    #[validate(custom(function = "non_blank"))]
    pub abstract_text: String,

    pub published: DateTime<Utc>,

    pub pdf_url: String,
}

impl CandidatePaper {
    pub fn new(
        arxiv_id: &str,
        title: impl Into<String>,
        authors: Vec<String>,
        abstract_text: impl Into<String>,
        published: DateTime<Utc>,
        pdf_url: impl Into<String>,
    ) -> Result<Self> {
        let arxiv_id = strip_version(arxiv_id.trim()).to_string();
        let pdf_url = match pdf_url.into() {
            url if url.trim().is_empty() => format!("https://arxiv.org/pdf/{}", arxiv_id),
            url => url,
        };

        let paper = Self {
            arxiv_id,
            title: title.into().trim().to_string(),
            authors,
            abstract_text: abstract_text.into().trim().to_string(),
            published,
            pdf_url,
        };
        paper.validate()?;
        Ok(paper)
    }

    /// Abstract page on arxiv.org
    pub fn abs_url(&self) -> String {
        format!("https://arxiv.org/abs/{}", self.arxiv_id)
    }

    /// Text fed to feature extraction
    pub fn text(&self) -> String {
        join_text(&self.title, &self.abstract_text)
    }
}

/// Strip a trailing version marker: `2401.01234v2` -> `2401.01234`
pub fn strip_version(arxiv_id: &str) -> &str {
    static VERSION: OnceLock<regex_lite::Regex> = OnceLock::new();
    let re = VERSION.get_or_init(|| regex_lite::Regex::new(r"v\d+$").expect("valid regex"));
    match re.find(arxiv_id) {
        Some(m) => &arxiv_id[..m.start()],
        None => arxiv_id,
    }
}

fn join_text(title: &str, abstract_text: &str) -> String {
    if title.is_empty() {
        abstract_text.to_string()
    } else {
        format!("{}. {}", title.trim_end_matches('.'), abstract_text)
    }
}

fn non_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_strip_version() {
        assert_eq!(strip_version("2401.01234v2"), "2401.01234");
        assert_eq!(strip_version("2401.01234"), "2401.01234");
        assert_eq!(strip_version("hep-th/9901001v12"), "hep-th/9901001");
    }

    #[test]
    fn test_candidate_normalizes_fields() {
        let paper = CandidatePaper::new(
            " 2403.09999v3 ",
            "  Sparse Attention  ",
            vec!["Ada Lovelace".into()],
            "We study attention.",
            date(),
            "",
        )
        .unwrap();

        assert_eq!(paper.arxiv_id, "2403.09999");
        assert_eq!(paper.title, "Sparse Attention");
        assert_eq!(paper.pdf_url, "https://arxiv.org/pdf/2403.09999");
        assert_eq!(paper.abs_url(), "https://arxiv.org/abs/2403.09999");
    }

    #[test]
    fn test_candidate_rejects_blank_abstract() {
        let err = CandidatePaper::new("2403.00001", "Title", vec![], "   ", date(), "")
            .unwrap_err();
        assert!(matches!(err, crate::errors::AppError::Validation { .. }));
    }

    #[test]
    fn test_candidate_rejects_blank_title() {
        assert!(CandidatePaper::new("2403.00001", "", vec![], "Body", date(), "").is_err());
    }

    #[test]
    fn test_reference_requires_abstract() {
        assert!(ReferencePaper::new("ABCD1234", "Title", "", None).is_err());

        let paper = ReferencePaper::new("ABCD1234", "", "Only an abstract", None).unwrap();
        assert_eq!(paper.text(), "Only an abstract");
    }

    #[test]
    fn test_text_joins_title_and_abstract() {
        let paper = ReferencePaper::new("K", "Attention Is All You Need.", "Transformers.", None)
            .unwrap();
        assert_eq!(paper.text(), "Attention Is All You Need. Transformers.");
    }
}
