//! Digest rendering
//!
//! One HTML document and a plain-text alternative with the same content.
//! Every interpolated value is escaped.

use arxiv_digest_common::ScoredCandidate;
use chrono::NaiveDate;
use std::fmt::Write;

const EMPTY_MESSAGE: &str = "No Papers Today. Take a Rest!";

const CARD_STYLE: &str = "font-family: Arial, sans-serif; border: 1px solid #ddd; \
    border-radius: 8px; padding: 16px; background-color: #f9f9f9;";

const PDF_BUTTON_STYLE: &str = "display: inline-block; text-decoration: none; font-size: 14px; \
    font-weight: bold; color: #fff; background-color: #d9534f; padding: 8px 16px; \
    border-radius: 4px;";

const TEXT_CELL_STYLE: &str = "font-size: 14px; color: #333; padding: 8px 0;";

/// A rendered digest, ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    pub subject: String,
    pub html: String,
    pub text: String,
    pub entry_count: usize,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// Render ranked candidates, already capped to the wanted count
pub fn render_digest(ranked: &[ScoredCandidate], date: NaiveDate, excerpt_chars: usize) -> Digest {
    let subject = format!("Daily arXiv {}", date.format("%Y/%m/%d"));

    let (body, text) = if ranked.is_empty() {
        (empty_block(), format!("{}\n\n{}\n", subject, EMPTY_MESSAGE))
    } else {
        let body = ranked
            .iter()
            .map(|entry| entry_block(entry, excerpt_chars))
            .collect::<Vec<_>>()
            .join("\n<br>\n");

        let mut text = format!("{}\n", subject);
        for entry in ranked {
            text.push('\n');
            entry_text(&mut text, entry, excerpt_chars);
        }
        (body, text)
    };

    Digest {
        html: document(&escape_html(&subject), &body),
        subject,
        text,
        entry_count: ranked.len(),
    }
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// At most `max_chars` characters, cut on a char boundary with an ellipsis
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) if max_chars > 0 => format!("{}…", text[..cut].trim_end()),
        _ => text.to_string(),
    }
}

fn document(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
</head>
<body>
<div>
{body}
</div>
<br><br>
<div style="font-family: Arial, sans-serif; font-size: 12px; color: #999;">
To unsubscribe, remove your address from the digest configuration.
</div>
</body>
</html>
"#
    )
}

fn empty_block() -> String {
    format!(
        r#"<table border="0" cellpadding="0" cellspacing="0" width="100%" style="{CARD_STYLE}">
<tr><td style="font-size: 20px; font-weight: bold; color: #333;">{EMPTY_MESSAGE}</td></tr>
</table>"#
    )
}

fn entry_block(entry: &ScoredCandidate, excerpt_chars: usize) -> String {
    let paper = &entry.paper;
    let abs_url = escape_html(&paper.abs_url());

    format!(
        r#"<table border="0" cellpadding="0" cellspacing="0" width="100%" style="{CARD_STYLE}">
<tr><td style="font-size: 20px; font-weight: bold; color: #333;">{rank}. {title}</td></tr>
<tr><td style="font-size: 14px; color: #666; padding: 8px 0;">{authors}</td></tr>
<tr><td style="{TEXT_CELL_STYLE}">
<strong>arXiv ID:</strong> <a href="{abs_url}">{id}</a> &middot;
<strong>Relevance:</strong> {score:.3}
</td></tr>
<tr><td style="{TEXT_CELL_STYLE}">{abstract_text}</td></tr>
<tr><td style="padding: 8px 0;"><a href="{pdf_url}" style="{PDF_BUTTON_STYLE}">PDF</a></td></tr>
</table>"#,
        rank = entry.rank,
        title = escape_html(&paper.title),
        authors = escape_html(&paper.authors.join(", ")),
        id = escape_html(&paper.arxiv_id),
        score = entry.score,
        abstract_text = escape_html(&excerpt(&paper.abstract_text, excerpt_chars)),
        pdf_url = escape_html(&paper.pdf_url),
    )
}

fn entry_text(out: &mut String, entry: &ScoredCandidate, excerpt_chars: usize) {
    let paper = &entry.paper;
    // Writing to a String cannot fail
    let _ = writeln!(out, "{}. {}", entry.rank, paper.title);
    if !paper.authors.is_empty() {
        let _ = writeln!(out, "   {}", paper.authors.join(", "));
    }
    let _ = writeln!(
        out,
        "   arXiv:{} ({}) relevance {:.3}",
        paper.arxiv_id,
        paper.abs_url(),
        entry.score
    );
    let _ = writeln!(out, "   {}", excerpt(&paper.abstract_text, excerpt_chars));
    let _ = writeln!(out, "   PDF: {}", paper.pdf_url);
}
