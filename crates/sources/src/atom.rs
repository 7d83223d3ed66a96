//! Atom feed parsing
//!
//! Both arXiv endpoints speak Atom: the announcement feed
//! (`rss.arxiv.org/atom/<query>`) and the export API. Elements are matched
//! on their local name so namespace prefixes (`arxiv:`, `dc:`) don't matter.

use arxiv_digest_common::{CandidatePaper, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parsed feed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub title: String,
    pub entries: Vec<FeedEntry>,
}

/// One `<entry>` element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub pdf_url: Option<String>,
    /// `arxiv:announce_type` of announcement feeds (`new`, `cross`, `replace`)
    pub announce_type: Option<String>,
}

impl Feed {
    /// Whether arXiv rejected the category query
    pub fn is_query_error(&self) -> bool {
        self.title.contains("Feed error for query")
    }
}

impl FeedEntry {
    /// Bare arXiv id of the entry, whichever endpoint it came from
    pub fn arxiv_id(&self) -> &str {
        let id = self.id.trim();
        id.strip_prefix("oai:arXiv.org:")
            .or_else(|| id.rsplit_once("/abs/").map(|(_, tail)| tail))
            .unwrap_or(id)
    }

    /// Export API reports lookup failures as entries with an error id
    pub fn is_api_error(&self) -> bool {
        self.id.contains("arxiv.org/api/errors")
    }

    pub fn into_candidate(self) -> Result<CandidatePaper> {
        let published = self
            .published
            .as_deref()
            .or(self.updated.as_deref())
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        let arxiv_id = self.arxiv_id().to_string();

        CandidatePaper::new(
            &arxiv_id,
            self.title,
            self.authors,
            strip_announce_preamble(&self.summary),
            published,
            self.pdf_url.unwrap_or_default(),
        )
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Announcement summaries start with `arXiv:<id> Announce Type: new Abstract:`
fn strip_announce_preamble(summary: &str) -> &str {
    match summary.find("Abstract:") {
        Some(idx) if summary.starts_with("arXiv:") => summary[idx + "Abstract:".len()..].trim(),
        _ => summary,
    }
}

/// Collapse runs of whitespace, arXiv wraps titles and abstracts
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn read_link(e: &BytesStart<'_>, entry: &mut FeedEntry) -> Result<()> {
    let mut href = None;
    let mut is_pdf = false;

    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let value = attr.unescape_value()?;
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value.into_owned()),
            b"title" if value == "pdf" => is_pdf = true,
            b"type" if value == "application/pdf" => is_pdf = true,
            _ => {}
        }
    }

    if is_pdf {
        entry.pdf_url = href;
    }
    Ok(())
}

/// Parse an Atom document
pub fn parse_feed(xml: &str) -> Result<Feed> {
    let mut reader = Reader::from_str(xml);
    let mut feed = Feed::default();
    let mut stack: Vec<String> = Vec::new();
    let mut entry: Option<FeedEntry> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                match name.as_str() {
                    "entry" => entry = Some(FeedEntry::default()),
                    "link" => {
                        if let Some(entry) = entry.as_mut() {
                            read_link(&e, entry)?;
                        }
                    }
                    _ => {}
                }
                stack.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                if local_name(&e) == "link" {
                    if let Some(entry) = entry.as_mut() {
                        read_link(&e, entry)?;
                    }
                }
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                let value = collapse_whitespace(&text);
                text.clear();

                if name == "entry" {
                    if let Some(done) = entry.take() {
                        feed.entries.push(done);
                    }
                    continue;
                }

                match (entry.as_mut(), name.as_str()) {
                    (Some(entry), "id") => entry.id = value,
                    (Some(entry), "title") => entry.title = value,
                    (Some(entry), "summary") => entry.summary = value,
                    (Some(entry), "published") => entry.published = Some(value),
                    (Some(entry), "updated") => entry.updated = Some(value),
                    (Some(entry), "announce_type") => entry.announce_type = Some(value),
                    // <author><name>..</name></author> in the export API
                    (Some(entry), "name") if stack.last().map(String::as_str) == Some("author") => {
                        entry.authors.push(value)
                    }
                    // <dc:creator>A, B</dc:creator> in announcement feeds
                    (Some(entry), "creator") if entry.authors.is_empty() => {
                        entry.authors = value
                            .split(',')
                            .map(str::trim)
                            .filter(|a| !a.is_empty())
                            .map(String::from)
                            .collect();
                    }
                    (None, "title") if stack.last().map(String::as_str) == Some("feed") => {
                        feed.title = value
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(feed)
}
