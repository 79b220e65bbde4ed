//! Reference extraction
//!
//! Scans free-form model output for trailing pipe-delimited citation
//! lines and produces structured source records with resolved URLs.
//! This is a best-effort heuristic, not a parser with a defined grammar:
//! lines that do not match are silently dropped, and accidental matches
//! on unrelated pipe-delimited text are accepted behavior.

use crate::arxiv::clean_arxiv_id;
use crate::chat::SourceRecord;
use regex_lite::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

/// Citation line shape: three pipe-separated fields plus an optional
/// fourth identifier hint. Fields are runs of non-pipe, non-newline text.
const CITATION_PATTERN: &str =
    r"([^|\n]+)\s*\|\s*([^|\n]+)\s*\|\s*([^|\n]+)(?:\s*\|\s*([^|\n]+))?";

static CITATION: OnceLock<Regex> = OnceLock::new();
static ID_SHAPE: OnceLock<Regex> = OnceLock::new();
static AFTER_MARKER: OnceLock<Regex> = OnceLock::new();

/// Extract source records from response text. Never fails; a text with
/// no recognizable citation lines yields an empty list.
pub fn extract_sources(text: &str) -> Vec<SourceRecord> {
    let pattern = CITATION.get_or_init(|| Regex::new(CITATION_PATTERN).unwrap());

    let mut sources = Vec::new();
    for captures in pattern.captures_iter(text) {
        let title = captures[1].trim().to_string();
        let authors: Vec<String> = captures[2]
            .split(',')
            .map(|author| author.trim().to_string())
            .collect();
        let year = captures[3].trim().to_string();

        let id_hint = captures
            .get(4)
            .map(|m| m.as_str().trim())
            .filter(|hint| !hint.is_empty())
            .map(resolve_id_hint);

        let url = resolve_url(id_hint.as_deref(), &title, &authors, &year);

        sources.push(SourceRecord {
            id: Uuid::new_v4().to_string(),
            title,
            authors,
            url,
            year,
        });
    }

    sources
}

/// Resolve the fourth field into an identifier: prefer a digits-dot-digits
/// pattern after an "arxiv" marker, then anywhere in the text, then the
/// raw text as-is.
fn resolve_id_hint(hint: &str) -> String {
    let lowered = hint.to_lowercase();
    let id_shape = ID_SHAPE.get_or_init(|| Regex::new(r"(\d+\.\d+)").unwrap());

    if lowered.contains("arxiv") {
        let after_marker =
            AFTER_MARKER.get_or_init(|| Regex::new(r"arxiv:?\s*(\d+\.\d+)").unwrap());
        if let Some(captures) = after_marker.captures(&lowered) {
            return captures[1].to_string();
        }
        return hint.to_string();
    }

    if let Some(captures) = id_shape.captures(hint) {
        return captures[1].to_string();
    }
    hint.to_string()
}

/// Build the source URL. A resolved identifier that still looks id-shaped
/// after cleaning maps to the canonical abstract page; a non-id-shaped one
/// to an arXiv search; no identifier at all to a scholar search built from
/// title, first two authors, and year.
fn resolve_url(id_hint: Option<&str>, title: &str, authors: &[String], year: &str) -> String {
    if let Some(raw_id) = id_hint {
        let clean = clean_arxiv_id(raw_id);
        if clean.contains('.') || clean.contains('/') {
            return format!("https://arxiv.org/abs/{}", clean);
        }
        return format!("https://arxiv.org/search/?query={}&searchtype=all", clean);
    }

    let author_part = authors
        .iter()
        .take(2)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let search_query = format!("{} {} {}", title, author_part, year).replace(' ', "+");
    format!("https://scholar.google.com/scholar?q={}", search_query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_full_citation_line() {
        let text = "Here is an explanation.\n\n\
                    Attention Is All You Need | Vaswani, Shazeer | 2017 | arXiv:1706.03762\n";
        let sources = extract_sources(text);

        assert_eq!(sources.len(), 1);
        let source = &sources[0];
        assert_eq!(source.title, "Attention Is All You Need");
        assert_eq!(source.authors, vec!["Vaswani", "Shazeer"]);
        assert_eq!(source.year, "2017");
        assert_eq!(source.url, "https://arxiv.org/abs/1706.03762");
    }

    #[test]
    fn test_three_field_line_gets_scholar_url() {
        let sources = extract_sources("Some Classic Paper | A. Author | 1999");

        assert_eq!(sources.len(), 1);
        let url = &sources[0].url;
        assert!(url.starts_with("https://scholar.google.com/scholar?q="));
        assert!(url.contains("Some+Classic+Paper"));
        assert!(url.contains("A.+Author"));
        assert!(!url.contains("arxiv.org"));
    }

    #[test]
    fn test_malformed_line_is_dropped() {
        let sources = extract_sources("Just a Title | One Author\nand some prose.");
        assert!(sources.is_empty());
    }

    #[test]
    fn test_version_suffix_stripped_from_url() {
        let sources = extract_sources("Attention Is All You Need | Vaswani | 2017 | arXiv:1706.03762v2");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://arxiv.org/abs/1706.03762");
    }

    #[test]
    fn test_bare_id_hint_without_marker() {
        let sources = extract_sources("Paper Title | Author | 2020 | 2004.05150");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://arxiv.org/abs/2004.05150");
    }

    #[test]
    fn test_non_id_shaped_hint_gets_search_url() {
        let sources = extract_sources("Paper Title | Author | 2020 | techreport42");
        assert_eq!(sources.len(), 1);
        assert_eq!(
            sources[0].url,
            "https://arxiv.org/search/?query=techreport42&searchtype=all"
        );
    }

    #[test]
    fn test_multiple_lines_each_yield_a_record() {
        let text = "First Paper | A, B | 2019 | arXiv:1901.00001\n\
                    Second Paper | C | 2020\n";
        let sources = extract_sources(text);
        assert_eq!(sources.len(), 2);
        // Ids are freshly generated and unique
        assert_ne!(sources[0].id, sources[1].id);
    }

    #[test]
    fn test_fresh_ids_are_generated() {
        let sources = extract_sources("T | A | 2000\nT | A | 2000");
        assert_eq!(sources.len(), 2);
        assert_ne!(sources[0].id, sources[1].id);
    }
}
