// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{CandidateItem, CandidateSource, Category};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use metrics::counter;

/// Normalize scraped display text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 300 chars (titles only)
    if out.chars().count() > 300 {
        out = out.chars().take(300).collect();
    }

    out
}

/// Parse the timestamp shapes scrapers tend to emit. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(n.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

/// Titles scrapers emit when they failed to find the real one.
const PLACEHOLDER_TITLES: &[&str] = &["no title found", "most popular", "untitled"];

pub fn is_placeholder_title(title: &str) -> bool {
    let t = title.trim().to_lowercase();
    PLACEHOLDER_TITLES.contains(&t.as_str())
}

/// Clean up raw source output for one category: normalized titles, trimmed URLs,
/// category stamped, entries without a real title or a URL dropped. Order is
/// preserved.
pub fn prepare_candidates(category: Category, raw: Vec<CandidateItem>) -> Vec<CandidateItem> {
    raw.into_iter()
        .filter_map(|mut it| {
            it.title = normalize_text(&it.title);
            it.url = it.url.trim().to_string();
            it.summary = it
                .summary
                .as_deref()
                .map(normalize_text)
                .filter(|s| !s.is_empty());
            it.category = category;
            let usable =
                !it.title.is_empty() && !is_placeholder_title(&it.title) && !it.url.is_empty();
            usable.then_some(it)
        })
        .collect()
}

/// Pull candidates from every source of a category, in source order.
///
/// A failing source is logged and skipped. Only when every source fails is the
/// whole category reported as failed.
pub async fn collect_candidates(
    category: Category,
    sources: &[Box<dyn CandidateSource>],
) -> Result<Vec<CandidateItem>> {
    let mut raw = Vec::new();
    let mut failures = 0usize;
    for s in sources {
        match s.fetch_candidates().await {
            Ok(mut v) => {
                tracing::info!(
                    target: "ingest",
                    source = s.name(),
                    %category,
                    count = v.len(),
                    "source fetched"
                );
                raw.append(&mut v);
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(
                    target: "ingest",
                    error = ?e,
                    source = s.name(),
                    %category,
                    "source error"
                );
                counter!("digest_source_errors_total", "category" => category.as_str())
                    .increment(1);
            }
        }
    }

    if !sources.is_empty() && failures == sources.len() {
        return Err(anyhow!("all {failures} sources failed for {category}"));
    }

    Ok(prepare_candidates(category, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  <b>Rust&nbsp;&nbsp;1.80</b>   released ";
        assert_eq!(normalize_text(s), "Rust 1.80 released");
    }

    #[test]
    fn normalize_text_keeps_question_marks() {
        assert_eq!(normalize_text("What is WASI?"), "What is WASI?");
    }

    #[test]
    fn parse_timestamp_accepts_common_shapes() {
        let a = parse_timestamp("2025-01-25T10:00:00Z").unwrap();
        let b = parse_timestamp("2025-01-25T10:00:00.000123").unwrap();
        let c = parse_timestamp("Sat, 25 Jan 2025 10:00:00 +0000").unwrap();
        assert_eq!(a.timestamp(), c.timestamp());
        assert_eq!(a.timestamp(), b.timestamp());
        assert!(parse_timestamp("2025-01-25").is_some());
        assert!(parse_timestamp("yesterday-ish").is_none());
        assert!(parse_timestamp("  ").is_none());
    }

    #[test]
    fn prepare_drops_blank_and_placeholder_titles() {
        let raw = vec![
            CandidateItem::new(Category::Job, "  ", "https://x.test/1"),
            CandidateItem::new(Category::Job, "Backend Engineer", " https://x.test/2 "),
            CandidateItem::new(Category::Job, "No url", ""),
            CandidateItem::new(Category::Job, " Most  Popular ", "https://x.test/3"),
            CandidateItem::new(Category::Job, "<b>Untitled</b>", "https://x.test/4"),
        ];
        let out = prepare_candidates(Category::Internship, raw);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://x.test/2");
        assert_eq!(out[0].category, Category::Internship);
    }
}
