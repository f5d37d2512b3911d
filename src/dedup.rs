// src/dedup.rs
//! Two-pass dedup: first within the batch (by normalized URL), then against history.

use std::collections::HashSet;

use crate::history::History;
use crate::ingest::types::CandidateItem;

/// Case- and scheme-insensitive URL form used for in-batch dedup only.
pub fn normalize_url(url: &str) -> String {
    let u = url.trim().to_lowercase();
    let u = u
        .strip_prefix("https://")
        .or_else(|| u.strip_prefix("http://"))
        .unwrap_or(&u);
    u.to_string()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    pub eligible: Vec<CandidateItem>,
    pub session_duplicates: usize,
    pub history_duplicates: usize,
}

/// Keep the first item per normalized URL. Returns (unique, dropped).
pub fn session_dedup(items: Vec<CandidateItem>) -> (Vec<CandidateItem>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for it in items {
        if seen.insert(normalize_url(&it.url)) {
            keep.push(it);
        } else {
            dropped += 1;
        }
    }
    (keep, dropped)
}

/// Drop items already recorded in `history`. Returns (fresh, dropped).
pub fn historical_dedup(
    items: Vec<CandidateItem>,
    history: &History,
) -> (Vec<CandidateItem>, usize) {
    let before = items.len();
    let fresh: Vec<CandidateItem> = items.into_iter().filter(|it| !history.contains(it)).collect();
    let dropped = before - fresh.len();
    (fresh, dropped)
}

/// Session pass, then history pass.
pub fn dedup(items: Vec<CandidateItem>, history: &History) -> DedupOutcome {
    let (unique, session_duplicates) = session_dedup(items);
    let (eligible, history_duplicates) = historical_dedup(unique, history);
    if history_duplicates > 0 {
        tracing::info!(
            target: "dedup",
            history_duplicates,
            remaining = eligible.len(),
            "previously selected items filtered"
        );
    }
    DedupOutcome {
        eligible,
        session_duplicates,
        history_duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Category;
    use chrono::Utc;

    fn item(title: &str, url: &str) -> CandidateItem {
        CandidateItem::new(Category::UpskillArticle, title, url)
    }

    #[test]
    fn normalize_url_ignores_scheme_and_case() {
        assert_eq!(normalize_url(" HTTPS://Dev.to/Post "), "dev.to/post");
        assert_eq!(normalize_url("http://dev.to/post"), "dev.to/post");
    }

    #[test]
    fn session_keeps_first_occurrence() {
        let (keep, dropped) = session_dedup(vec![
            item("first", "https://a.test/x"),
            item("second", "http://A.test/x"),
            item("third", "https://a.test/y"),
        ]);
        assert_eq!(dropped, 1);
        assert_eq!(keep.len(), 2);
        assert_eq!(keep[0].title, "first");
    }

    #[test]
    fn history_pass_runs_after_session_pass() {
        let h = History::new().record(&item("Seen", "https://a.test/seen"), Utc::now());
        let out = dedup(
            vec![
                item("Seen", "https://a.test/other"),
                item("New", "https://a.test/new"),
                item("New again", "https://a.test/new"),
            ],
            &h,
        );
        assert_eq!(out.session_duplicates, 1);
        assert_eq!(out.history_duplicates, 1);
        assert_eq!(out.eligible.len(), 1);
        assert_eq!(out.eligible[0].title, "New");
    }
}
